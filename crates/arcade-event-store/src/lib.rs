//! Arcade Event Store — in-memory reference implementations of the
//! [`EventStore`](arcade_core::repository::EventStore) and
//! [`SnapshotStore`](arcade_core::snapshot::SnapshotStore) traits, plus the
//! snapshot policy aggregate repositories consult after appending.

pub mod policy;
pub mod snapshot;
pub mod store;

pub use policy::SnapshotPolicy;
pub use snapshot::InMemorySnapshotStore;
pub use store::InMemoryEventStore;
