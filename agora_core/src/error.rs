//! Configuration errors for the core engines.

use thiserror::Error;

/// Rejected parameters. Raised before any turn runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be >= 0 (got {value})")]
    Negative { name: &'static str, value: i64 },

    #[error("{name} is out of range (got {value})")]
    OutOfRange { name: &'static str, value: i64 },

    #[error("Invalid graph parameters: {0}")]
    InvalidGraph(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
