use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a run halts before reaching the end of the program.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    #[error("unresolved label `{0}`")]
    UnresolvedLabel(String),
    #[error("slave error at address {0:#x}")]
    SlaveError(u32),
    /// Only raised when the engine is configured with `strict_invalid`.
    #[error("invalid instruction `{0}`")]
    InvalidInstruction(String),
}

/// Harness-visible run state. `Done` and `Error` are absorbing: once set,
/// further ticks are no-ops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Running,
    Done,
    Error(Fault),
}

impl RunStatus {
    pub fn is_halted(&self) -> bool {
        !matches!(self, Self::Running)
    }

    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Error(fault) => Some(fault),
            _ => None,
        }
    }
}
