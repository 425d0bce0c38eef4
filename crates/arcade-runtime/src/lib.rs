//! Arcade Runtime — wires the stores, the bus and the lobby context together.

pub mod config;
pub mod error;
pub mod runtime;
pub mod telemetry;

pub use config::{ConfigError, LogFormat, RuntimeConfig};
pub use error::RuntimeError;
pub use runtime::Runtime;
