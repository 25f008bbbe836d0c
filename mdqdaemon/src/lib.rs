//! Dynamic-queue engine for MPD partitions.
//!
//! The [`orchestrator::Orchestrator`] owns the configuration lifecycle and a
//! restartable group of per-partition monitors. Each monitor keeps its
//! partition's queue trimmed and topped up from the configured stored
//! playlists, waking on server change notifications instead of polling.
//! Configuration changes restart only as much of the daemon as they
//! invalidate: partition-table edits respawn the monitors, host/port edits
//! force a full reconnect.

pub mod cache;
pub mod classify;
pub mod errors;
pub mod orchestrator;
pub mod partition;
pub mod picker;
pub mod reconcile;
pub mod status;
pub mod watch;

pub use errors::DaemonError;
pub use orchestrator::Orchestrator;
