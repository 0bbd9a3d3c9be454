//! Control-plane errors.

use agora_core::ConfigError;
use agora_env::RunId;
use thiserror::Error;

use crate::state::SimMode;

/// Errors returned by the control interface and by run completion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    /// Bad parameters, rejected before any turn runs
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Setup failed; the controller went back to idle
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// A run is already active
    #[error("Simulation run {0} is already active")]
    AlreadyRunning(RunId),

    /// A turn could not be carried out; the run was ended
    #[error("Turn {turn} failed: {reason}")]
    TurnExecution { turn: u64, reason: String },

    /// The requested operation is not defined for the current mode
    #[error("Cannot {action} while {mode}: {reason}")]
    Transition {
        action: &'static str,
        mode: SimMode,
        reason: &'static str,
    },
}

impl ControlError {
    pub(crate) fn transition(action: &'static str, mode: SimMode, reason: &'static str) -> Self {
        Self::Transition {
            action,
            mode,
            reason,
        }
    }
}
