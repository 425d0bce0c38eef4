//! Arcade Runtime — startup error types.

use arcade_core::error::DomainError;
use arcade_state_machine::StateMachineError;
use thiserror::Error;

use crate::config::ConfigError;

/// Startup and runtime errors for the composition root.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// An environment variable is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The lobby lifecycle definition failed validation.
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] StateMachineError),

    /// A domain operation failed.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
}
