//! Classification of configuration changes.

use mdqconfig::ConfigDocument;

/// How much of the daemon a configuration change invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartSignal {
    /// Connection parameters changed: tear everything down and reconnect.
    Global,
    /// Only the partition table changed: respawn the partition monitors on
    /// the existing connection.
    PartitionsOnly,
}

/// Compares two normalized snapshots. Both documents have their defaults
/// merged in, so a key appearing with its default value is not a change.
pub fn classify(previous: &ConfigDocument, next: &ConfigDocument) -> Option<RestartSignal> {
    if previous == next {
        return None;
    }
    if previous.host == next.host && previous.port == next.port {
        Some(RestartSignal::PartitionsOnly)
    } else {
        Some(RestartSignal::Global)
    }
}
