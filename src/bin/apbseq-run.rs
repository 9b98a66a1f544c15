use apbseq::{load_script, BranchMode, RunStatus, Sequencer, SequencerConfig, SramPeer};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

/// Replays a write/read/branch/goto script as bus transactions against a
/// built-in scratch-memory peer.
#[derive(Parser)]
#[command(name = "apbseq-run")]
struct Args {
    /// Script file to load and execute.
    script: PathBuf,
    /// Peer wait-states per transaction.
    #[arg(long, default_value_t = 0)]
    waits: u32,
    /// Tick watchdog: abort if the run has not halted by then.
    #[arg(long, default_value_t = 1_000_000)]
    max_ticks: u64,
    /// Take branches on any nonzero last read value instead of on equality.
    #[arg(long)]
    nonzero_branch: bool,
    /// Halt with a fault on unparseable lines instead of skipping them.
    #[arg(long)]
    strict_invalid: bool,
    /// Emit a machine-readable run summary on stdout.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Summary {
    status: RunStatus,
    ticks: u64,
    pc: usize,
    last_read: u32,
    memory: Vec<(u32, u32)>,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let report = load_script(&args.script)?;
    for diagnostic in &report.diagnostics {
        eprintln!("{}: {diagnostic}", args.script.display());
    }

    let config = SequencerConfig {
        branch_mode: if args.nonzero_branch {
            BranchMode::NonZero
        } else {
            BranchMode::CompareEqual
        },
        strict_invalid: args.strict_invalid,
    };
    let mut seq = Sequencer::with_config(report.program, report.symbols, config);
    let mut peer = SramPeer::new(args.waits);
    let ticks = seq.run_to_halt(&mut peer, args.max_ticks)?;

    let summary = Summary {
        status: seq.status().clone(),
        ticks,
        pc: seq.pc(),
        last_read: seq.last_read(),
        memory: peer.dump(),
    };
    if args.json {
        serde_json::to_writer_pretty(std::io::stdout(), &summary)?;
        println!();
    } else {
        match &summary.status {
            RunStatus::Done => println!("done in {ticks} ticks"),
            RunStatus::Error(fault) => println!("halted after {ticks} ticks: {fault}"),
            RunStatus::Running => unreachable!("run_to_halt only returns at halt"),
        }
        println!(
            "pc={pc} last_read={lr:#x}",
            pc = summary.pc,
            lr = summary.last_read
        );
        for (addr, value) in &summary.memory {
            println!("  mem[{addr:#06x}] = {value:#x}");
        }
    }

    Ok(if matches!(summary.status, RunStatus::Done) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
