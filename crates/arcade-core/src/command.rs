//! Command abstractions.

use uuid::Uuid;

use crate::event::EventMetadata;

/// A request to change one aggregate.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Stable command name used in logs, e.g. `lobby.join`.
    fn command_type(&self) -> &'static str;

    /// Correlation ID carried into every event the command produces.
    fn correlation_id(&self) -> Uuid;

    /// The player or system acting, if the command names one.
    fn actor_id(&self) -> Option<&str> {
        None
    }

    /// Metadata for the events this command produces.
    fn event_metadata(&self) -> EventMetadata {
        let metadata = EventMetadata::for_command(self.correlation_id());
        match self.actor_id() {
            Some(actor) => metadata.with_actor(actor),
            None => metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Kick {
        correlation_id: Uuid,
        by: Option<String>,
    }

    impl Command for Kick {
        fn command_type(&self) -> &'static str {
            "lobby.kick"
        }

        fn correlation_id(&self) -> Uuid {
            self.correlation_id
        }

        fn actor_id(&self) -> Option<&str> {
            self.by.as_deref()
        }
    }

    #[test]
    fn test_event_metadata_carries_correlation_and_actor() {
        let command = Kick {
            correlation_id: Uuid::new_v4(),
            by: Some("ana".to_owned()),
        };

        let metadata = command.event_metadata();

        assert_eq!(metadata.correlation_id, Some(command.correlation_id));
        assert_eq!(metadata.causation_id, Some(command.correlation_id));
        assert_eq!(metadata.actor_id.as_deref(), Some("ana"));
    }

    #[test]
    fn test_event_metadata_without_actor() {
        let command = Kick {
            correlation_id: Uuid::new_v4(),
            by: None,
        };

        assert_eq!(command.event_metadata().actor_id, None);
    }
}
