use crate::bus::{BusPeer, BusRequest};
use crate::instr::Instruction;
use crate::program::{Program, SymbolTable};
use crate::status::{Fault, RunStatus};
use crate::{Result, SeqError};
use serde::{Deserialize, Serialize};
use std::env;

/// Handshake phase of the transaction in flight. `Access` is the only phase
/// that may persist across ticks (peer backpressure); `Halted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Setup,
    Access,
    Halted,
}

/// Branch condition policy. `CompareEqual` takes the branch when the last
/// read value equals the instruction's literal; `NonZero` ignores the
/// literal and takes the branch on any nonzero last read value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchMode {
    #[default]
    CompareEqual,
    NonZero,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SequencerConfig {
    pub branch_mode: BranchMode,
    /// Halt with a fault on `Invalid` slots instead of skipping them.
    pub strict_invalid: bool,
}

/// The synchronous execution engine. Owns the loaded program for the run;
/// the harness drives it by calling [`tick`] once per clock edge.
///
/// Counter-advance policy: the program counter moves only on control
/// transfer out of `Idle` or on retirement out of `Access`, never while a
/// transaction is still in flight.
///
/// [`tick`]: Sequencer::tick
pub struct Sequencer {
    program: Program,
    symbols: SymbolTable,
    config: SequencerConfig,
    pc: usize,
    last_read: u32,
    phase: Phase,
    status: RunStatus,
    request: BusRequest,
    ticks: u64,
}

impl Sequencer {
    pub fn new(program: Program, symbols: SymbolTable) -> Self {
        Self::with_config(program, symbols, SequencerConfig::default())
    }

    pub fn with_config(program: Program, symbols: SymbolTable, config: SequencerConfig) -> Self {
        Self {
            program,
            symbols,
            config,
            pc: 0,
            last_read: 0,
            phase: Phase::Idle,
            status: RunStatus::Running,
            request: BusRequest::default(),
            ticks: 0,
        }
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn last_read(&self) -> u32 {
        self.last_read
    }

    /// Pins currently driven toward the peer (all-low while idle).
    pub fn request(&self) -> &BusRequest {
        &self.request
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn is_halted(&self) -> bool {
        self.status.is_halted()
    }

    /// Advances the machine by one step. Must be called at most once per
    /// logical clock edge and never reentrantly. Ticks after halt are no-ops.
    pub fn tick(&mut self, peer: &mut dyn BusPeer) {
        if matches!(self.phase, Phase::Halted) {
            return;
        }
        self.ticks = self.ticks.wrapping_add(1);
        match self.phase {
            Phase::Idle => self.dispatch(),
            Phase::Setup => {
                peer.setup(&self.request);
                self.request.enable = true;
                self.phase = Phase::Access;
            }
            Phase::Access => {
                let reply = peer.access(&self.request);
                if reply.ready {
                    if reply.slverr {
                        self.fail(Fault::SlaveError(self.request.address));
                    } else {
                        if !self.request.write {
                            self.last_read = reply.rdata;
                        }
                        self.pc += 1;
                        self.request = BusRequest::default();
                        self.phase = Phase::Idle;
                    }
                }
            }
            Phase::Halted => {}
        }
        if env::var("RUST_SEQ_TRACE").is_ok() {
            let next = self
                .program
                .fetch(self.pc)
                .map(Instruction::mnemonic)
                .unwrap_or("-");
            eprintln!(
                "[seq-trace] tick={tick} phase={phase:?} pc={pc} next={next} last_read={lr:#x} status={status:?}",
                tick = self.ticks,
                phase = self.phase,
                pc = self.pc,
                lr = self.last_read,
                status = self.status,
            );
        }
    }

    /// Ticks until halt or until `max_ticks` additional ticks have elapsed.
    /// Returns the number of ticks consumed. The budget is the harness-side
    /// watchdog; the engine itself never times out on backpressure.
    pub fn run_to_halt(&mut self, peer: &mut dyn BusPeer, max_ticks: u64) -> Result<u64> {
        let start = self.ticks;
        while !self.status.is_halted() {
            if self.ticks - start >= max_ticks {
                return Err(SeqError::TickBudget(max_ticks));
            }
            self.tick(peer);
        }
        Ok(self.ticks - start)
    }

    fn dispatch(&mut self) {
        if self.status.is_halted() {
            self.phase = Phase::Halted;
            return;
        }
        let Some(instr) = self.program.fetch(self.pc).cloned() else {
            // Past-end counter value: the program ran to completion.
            self.status = RunStatus::Done;
            self.phase = Phase::Halted;
            return;
        };
        match instr {
            Instruction::Write { address, value } => {
                self.request = BusRequest {
                    select: true,
                    enable: false,
                    address,
                    write: true,
                    wdata: value,
                };
                self.phase = Phase::Setup;
            }
            Instruction::Read { address } => {
                self.request = BusRequest {
                    select: true,
                    enable: false,
                    address,
                    write: false,
                    wdata: 0,
                };
                self.phase = Phase::Setup;
            }
            Instruction::Goto { target } => self.transfer(&target),
            Instruction::Branch { target, compare } => {
                if self.branch_taken(compare) {
                    self.transfer(&target);
                } else {
                    self.pc += 1;
                }
            }
            Instruction::Label { .. } => self.pc += 1,
            Instruction::Invalid { raw } => {
                if self.config.strict_invalid {
                    self.fail(Fault::InvalidInstruction(raw));
                } else {
                    self.pc += 1;
                }
            }
        }
    }

    /// Control transfer consumes no bus cycle: resolve-or-fault within the
    /// same idle tick.
    fn transfer(&mut self, target: &str) {
        match self.symbols.resolve(target) {
            Some(index) => self.pc = index,
            None => self.fail(Fault::UnresolvedLabel(target.to_string())),
        }
    }

    fn branch_taken(&self, compare: u32) -> bool {
        match self.config.branch_mode {
            BranchMode::CompareEqual => self.last_read == compare,
            BranchMode::NonZero => self.last_read != 0,
        }
    }

    fn fail(&mut self, fault: Fault) {
        self.status = RunStatus::Error(fault);
        self.request = BusRequest::default();
        self.phase = Phase::Halted;
    }
}
