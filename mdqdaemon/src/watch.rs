//! Live reload of the configuration file.

use std::path::PathBuf;

use mdqconfig::ConfigDocument;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::errors::Result;
use crate::orchestrator::TaskOutcome;

/// Watches the config file and resolves with a restart request for the
/// first modification that actually changes the normalized document.
///
/// The load inside the handler re-normalizes the file, so this also absorbs
/// the write-back echo of its own normalization pass. When no watcher can
/// be installed the daemon degrades to reload-via-manual-restart: a
/// warning, then the task parks forever so the supervision scope stays up.
pub async fn watch_config(path: PathBuf, mut snapshot: ConfigDocument) -> Result<TaskOutcome> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = match notify::recommended_watcher(
        move |event: std::result::Result<Event, notify::Error>| {
            if let Ok(event) = event {
                let _ = tx.send(event);
            }
        },
    ) {
        Ok(watcher) => watcher,
        Err(err) => {
            warn!(error = %err, "Cannot create a file watcher, live config reload disabled");
            return std::future::pending().await;
        }
    };
    if let Err(err) = watcher.watch(&path, RecursiveMode::NonRecursive) {
        warn!(config_file = %path.display(), error = %err, "Cannot watch the config file, live config reload disabled");
        return std::future::pending().await;
    }

    while let Some(event) = rx.recv().await {
        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
            continue;
        }
        debug!(config_file = %path.display(), kind = ?event.kind, "Config file event");
        let next = ConfigDocument::load(&path)?;
        if let Some(signal) = classify(&snapshot, &next) {
            info!(config_file = %path.display(), ?signal, "Config file was changed");
            return Ok(TaskOutcome::Restart {
                signal,
                config: next,
            });
        }
        snapshot = next;
    }

    // The watcher dropped its channel; same degradation as above.
    warn!("Config watch stream ended, live config reload disabled");
    std::future::pending().await
}
