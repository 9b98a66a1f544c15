use apbseq::{load_lines, RunStatus, Sequencer, SramPeer};
use proptest::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum Op {
    Write(u32, u32),
    Read(u32),
    Marker,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u32..0x1000, any::<u32>()).prop_map(|(addr, value)| Op::Write(addr, value)),
        (0u32..0x1000).prop_map(Op::Read),
        Just(Op::Marker),
    ]
}

fn render(ops: &[Op]) -> Vec<String> {
    ops.iter()
        .enumerate()
        .map(|(i, op)| match op {
            Op::Write(addr, value) => format!("write {addr:X} {value:X}"),
            Op::Read(addr) => format!("read {addr:X}"),
            Op::Marker => format!("m{i}:"),
        })
        .collect()
}

proptest! {
    // Straight-line programs always finish, in a tick count fixed by their
    // shape: three ticks per bus transaction, one per marker slot, one for
    // the final past-end check.
    #[test]
    fn straight_line_programs_reach_done(ops in prop::collection::vec(op_strategy(), 0..32)) {
        let report = load_lines(render(&ops));
        prop_assert!(report.diagnostics.is_empty());
        let mut seq = Sequencer::new(report.program, report.symbols);
        let mut peer = SramPeer::new(0);
        let ticks = seq.run_to_halt(&mut peer, 10_000).unwrap();
        prop_assert_eq!(seq.status(), &RunStatus::Done);

        let bus_ops = ops.iter().filter(|op| !matches!(op, Op::Marker)).count() as u64;
        let markers = ops.len() as u64 - bus_ops;
        prop_assert_eq!(ticks, 3 * bus_ops + markers + 1);
    }

    // The peer's memory ends up holding the last value written to each
    // address, regardless of wait-states.
    #[test]
    fn writes_land_in_peer_memory(
        writes in prop::collection::vec((0u32..0x100, any::<u32>()), 0..24),
        waits in 0u32..4,
    ) {
        let lines: Vec<String> = writes
            .iter()
            .map(|(addr, value)| format!("write {addr:X} {value:X}"))
            .collect();
        let report = load_lines(&lines);
        prop_assert!(report.diagnostics.is_empty());
        let mut seq = Sequencer::new(report.program, report.symbols);
        let mut peer = SramPeer::new(waits);
        seq.run_to_halt(&mut peer, 100_000).unwrap();
        prop_assert_eq!(seq.status(), &RunStatus::Done);

        let mut expected: HashMap<u32, u32> = HashMap::new();
        for (addr, value) in &writes {
            expected.insert(*addr, *value);
        }
        let mut expected: Vec<(u32, u32)> = expected.into_iter().collect();
        expected.sort_unstable();
        prop_assert_eq!(peer.dump(), expected);
    }
}
