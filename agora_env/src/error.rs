//! Error types for the Agora environment abstraction.

use crate::types::AgentId;
use thiserror::Error;

/// Errors raised by external collaborators.
#[derive(Debug, Clone, Error)]
pub enum EnvError {
    /// The agent-action interface failed for one agent
    #[error("Agent {agent} failed: {reason}")]
    AgentFailed { agent: AgentId, reason: String },

    /// A persisted-store query failed
    #[error("Store error: {0}")]
    StoreError(String),

    /// The simulated population could not be built
    #[error("Setup error: {0}")]
    SetupError(String),
}

impl EnvError {
    /// Creates an agent failure.
    pub fn agent(agent: AgentId, reason: impl Into<String>) -> Self {
        Self::AgentFailed {
            agent,
            reason: reason.into(),
        }
    }

    /// Creates a store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    /// Creates a setup error.
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::SetupError(msg.into())
    }
}
