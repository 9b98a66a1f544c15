//! Scriptable bus-transaction sequencer.
//!
//! Loads a small write/read/branch/goto program from text and replays it as a
//! sequence of two-phase bus transactions against a peer, honoring the peer's
//! wait-states and error signaling. The harness owns the clock: it calls
//! [`Sequencer::tick`] once per edge and polls [`Sequencer::status`] between
//! ticks.

use thiserror::Error;

pub mod bus;
pub mod engine;
pub mod instr;
pub mod program;
pub mod status;

pub use bus::{BusPeer, BusReply, BusRequest, SramPeer};
pub use engine::{BranchMode, Phase, Sequencer, SequencerConfig};
pub use instr::Instruction;
pub use program::{load_lines, load_script, LoadDiagnostic, LoadReport, Program, SymbolTable};
pub use status::{Fault, RunStatus};

pub type Result<T> = std::result::Result<T, SeqError>;

#[derive(Debug, Error)]
pub enum SeqError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tick budget of {0} exhausted before halt")]
    TickBudget(u64),
}
