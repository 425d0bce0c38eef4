//! Runtime configuration read from the environment.

use std::str::FromStr;

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is present but cannot be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue {
        /// The environment variable.
        key: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            _ => Err(()),
        }
    }
}

/// Default filter directive when `RUST_LOG` is unset.
pub const LOG_LEVEL_VAR: &str = "ARCADE_LOG_LEVEL";
/// `json` or `pretty`.
pub const LOG_FORMAT_VAR: &str = "ARCADE_LOG_FORMAT";
/// Snapshot interval in events; `0` disables snapshots.
pub const SNAPSHOT_EVERY_VAR: &str = "ARCADE_SNAPSHOT_EVERY";
/// Seat count for lobbies created without one.
pub const DEFAULT_MAX_PLAYERS_VAR: &str = "ARCADE_DEFAULT_MAX_PLAYERS";

/// Settings for a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Default tracing filter.
    pub log_level: String,
    /// Tracing output format.
    pub log_format: LogFormat,
    /// Snapshot interval; `0` disables snapshots.
    pub snapshot_every: u64,
    /// Seat count for lobbies created without one.
    pub default_max_players: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: LogFormat::Json,
            snapshot_every: 50,
            default_max_players: 4,
        }
    }
}

impl RuntimeConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, falling back to defaults for
    /// variables it does not return.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            log_level: lookup(LOG_LEVEL_VAR)
                .filter(|level| !level.trim().is_empty())
                .unwrap_or(defaults.log_level),
            log_format: parse(&lookup, LOG_FORMAT_VAR)?.unwrap_or(defaults.log_format),
            snapshot_every: parse(&lookup, SNAPSHOT_EVERY_VAR)?.unwrap_or(defaults.snapshot_every),
            default_max_players: parse(&lookup, DEFAULT_MAX_PLAYERS_VAR)?
                .unwrap_or(defaults.default_max_players),
        })
    }
}

fn parse<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_missing_variables_use_defaults() {
        let config = RuntimeConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.snapshot_every, 50);
        assert_eq!(config.default_max_players, 4);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_variables_override_defaults() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("ARCADE_LOG_LEVEL", "debug,arcade_event_bus=trace"),
            ("ARCADE_LOG_FORMAT", "Pretty"),
            ("ARCADE_SNAPSHOT_EVERY", "0"),
            ("ARCADE_DEFAULT_MAX_PLAYERS", " 6 "),
        ]))
        .unwrap();

        assert_eq!(config.log_level, "debug,arcade_event_bus=trace");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.snapshot_every, 0);
        assert_eq!(config.default_max_players, 6);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = RuntimeConfig::from_lookup(lookup(&[("ARCADE_SNAPSHOT_EVERY", "often")]))
            .unwrap_err();

        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "ARCADE_SNAPSHOT_EVERY",
                value: "often".to_owned(),
            }
        );
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        let err =
            RuntimeConfig::from_lookup(lookup(&[("ARCADE_LOG_FORMAT", "xml")])).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "ARCADE_LOG_FORMAT",
                ..
            }
        ));
    }
}
