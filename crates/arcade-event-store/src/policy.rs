//! When aggregate repositories take snapshots.

/// Snapshot frequency for an aggregate kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotPolicy {
    /// Never snapshot; always replay the full stream.
    #[default]
    Never,
    /// Snapshot whenever an append crosses a multiple of `n` events.
    EveryNEvents(u64),
}

impl SnapshotPolicy {
    /// Builds a policy from an interval, where `0` disables snapshots.
    #[must_use]
    pub fn every(n: u64) -> Self {
        if n == 0 {
            Self::Never
        } else {
            Self::EveryNEvents(n)
        }
    }

    /// Returns `true` if an append moving the stream from
    /// `previous_version` to `new_version` should be followed by a snapshot.
    #[must_use]
    pub fn should_snapshot(self, previous_version: u64, new_version: u64) -> bool {
        match self {
            Self::Never | Self::EveryNEvents(0) => false,
            Self::EveryNEvents(n) => new_version / n > previous_version / n,
        }
    }
}
