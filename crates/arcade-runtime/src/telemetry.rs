//! Tracing subscriber initialisation.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, RuntimeConfig};

/// Builds the filter: `RUST_LOG` when set and valid, the configured level
/// otherwise.
#[must_use]
pub fn env_filter(config: &RuntimeConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global tracing subscriber.
///
/// Returns `false` if a subscriber was already installed, in which case the
/// existing one stays in place.
pub fn init_tracing(config: &RuntimeConfig) -> bool {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(config));
    let installed = match config.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    installed.is_ok()
}
