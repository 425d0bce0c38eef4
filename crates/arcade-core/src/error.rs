//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
///
/// Expected outcomes of store and aggregate operations (concurrency
/// conflicts, business-rule rejections) surface through this type. Store
/// reads never report "not found" as an error: they return `None` or an empty
/// collection instead.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("aggregate not found: {aggregate_type}/{aggregate_id}")]
    AggregateNotFound {
        /// The aggregate type that was looked up.
        aggregate_type: String,
        /// The aggregate identifier that was looked up.
        aggregate_id: String,
    },

    /// Optimistic concurrency conflict.
    #[error(
        "concurrency conflict on {aggregate_type}/{aggregate_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        /// The aggregate type of the conflicting stream.
        aggregate_type: String,
        /// The aggregate that had the conflict.
        aggregate_id: String,
        /// The expected version.
        expected: u64,
        /// The actual version found.
        actual: u64,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An event payload or snapshot state could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Returns `true` if this error is an optimistic concurrency conflict.
    #[must_use]
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }

    /// Returns `true` if retrying the whole load-execute-append cycle may
    /// succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyConflict { .. } | Self::Infrastructure(_)
        )
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_conflict_display_names_stream_and_versions() {
        let err = DomainError::ConcurrencyConflict {
            aggregate_type: "Lobby".to_owned(),
            aggregate_id: "lobby-1".to_owned(),
            expected: 2,
            actual: 3,
        };

        let display = err.to_string();
        assert!(display.contains("Lobby/lobby-1"));
        assert!(display.contains("expected version 2"));
        assert!(display.contains("found 3"));
    }

    #[test]
    fn test_only_conflicts_and_infrastructure_are_retryable() {
        let conflict = DomainError::ConcurrencyConflict {
            aggregate_type: "Lobby".to_owned(),
            aggregate_id: "lobby-1".to_owned(),
            expected: 0,
            actual: 1,
        };
        assert!(conflict.is_concurrency_conflict());
        assert!(conflict.is_retryable());
        assert!(DomainError::Infrastructure("down".into()).is_retryable());
        assert!(!DomainError::Validation("lobby is full".into()).is_retryable());
        assert!(!DomainError::Serialization("bad".into()).is_concurrency_conflict());
    }

    #[test]
    fn test_serde_json_error_converts_to_serialization() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err = DomainError::from(json_err);
        assert!(matches!(err, DomainError::Serialization(_)));
    }
}
