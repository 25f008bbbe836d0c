//! Top-level supervision: connection lifecycle and the restartable group of
//! monitoring tasks.

use std::path::PathBuf;
use std::sync::Arc;

use mdqconfig::ConfigDocument;
use mdqmpd::MpdClient;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::cache::PlaylistCache;
use crate::classify::RestartSignal;
use crate::errors::{DaemonError, Result};
use crate::partition::PartitionSupervisor;
use crate::watch;

/// How a task in the supervision scope finished on its own.
pub enum TaskOutcome {
    /// The task has nothing to do (disabled partition); the scope keeps
    /// running without it.
    Completed,
    /// The config watcher requests a restart, handing over the freshly
    /// loaded document.
    Restart {
        signal: RestartSignal,
        config: ConfigDocument,
    },
}

/// How far a finished supervision scope unwinds.
enum ScopeExit {
    /// Respawn the partition monitors on the existing connection.
    PartitionsOnly,
    /// Tear down the connection and start over.
    Global,
}

/// Owns the config lifecycle, the shared playlist cache and the restartable
/// group of partition monitors plus the two background tasks (playlist
/// refresher, config watcher).
pub struct Orchestrator {
    config_path: PathBuf,
    config: ConfigDocument,
    cache: Arc<PlaylistCache>,
}

impl Orchestrator {
    /// Loads the configuration (normalizing it on disk) and prepares an
    /// empty cache. No connection is made yet.
    pub fn new(config_path: PathBuf) -> Result<Self> {
        let config = ConfigDocument::load(&config_path)?;
        Ok(Self {
            config_path,
            config,
            cache: Arc::new(PlaylistCache::new()),
        })
    }

    /// Runs the daemon. Only returns on a fatal fault (the connection to
    /// the server, or a monitoring task giving up); restart policy for
    /// those belongs to the process supervisor, not to us.
    pub async fn run(mut self) -> Result<()> {
        loop {
            let session = Arc::new(Mutex::new(
                MpdClient::connect(&self.config.host, self.config.port).await?,
            ));
            info!(host = %self.config.host, port = self.config.port, "Connected");
            self.cache.refresh(&mut *session.lock().await).await?;

            loop {
                match self.supervise(Arc::clone(&session)).await? {
                    ScopeExit::PartitionsOnly => {
                        // The aborted refresher usually leaves the session
                        // in idle mode; clear that before reusing it.
                        let mut shared = session.lock().await;
                        match shared.cancel_idle().await {
                            Ok(()) => continue,
                            Err(err) => {
                                warn!(error = %err, "Session unusable after restart, reconnecting");
                                break;
                            }
                        }
                    }
                    ScopeExit::Global => break,
                }
            }
            // Orderly shutdown of the session when we hold the last handle;
            // the drop would close the socket either way. The outer loop
            // reconnects with the current config snapshot.
            if let Some(session) = Arc::into_inner(session) {
                let _ = session.into_inner().close().await;
            }
        }
    }

    /// Spawns one supervision scope and waits for the event that ends it.
    /// All remaining tasks are cancelled before returning. A failing task
    /// is fatal: retrying it would fail the same way until the config or
    /// the server changes.
    async fn supervise(&mut self, session: Arc<Mutex<MpdClient>>) -> Result<ScopeExit> {
        let mut scope: JoinSet<Result<TaskOutcome>> = JoinSet::new();

        for (name, partition_config) in &self.config.partitions {
            let supervisor = PartitionSupervisor::new(
                self.config.host.clone(),
                self.config.port,
                name.clone(),
                partition_config.clone(),
                Arc::clone(&self.cache),
            );
            scope.spawn(async move { supervisor.run().await.map(|()| TaskOutcome::Completed) });
        }
        scope.spawn(refresh_stored_playlists(
            Arc::clone(&self.cache),
            session,
        ));
        scope.spawn(watch::watch_config(
            self.config_path.clone(),
            self.config.clone(),
        ));

        let exit = loop {
            match scope.join_next().await {
                Some(Ok(Ok(TaskOutcome::Completed))) => continue,
                Some(Ok(Ok(TaskOutcome::Restart { signal, config }))) => {
                    self.config = config;
                    break Ok(match signal {
                        RestartSignal::PartitionsOnly => ScopeExit::PartitionsOnly,
                        RestartSignal::Global => ScopeExit::Global,
                    });
                }
                Some(Ok(Err(err))) => {
                    error!(error = %err, "Monitoring task failed, shutting down");
                    break Err(err);
                }
                Some(Err(join_err)) => {
                    error!(error = %join_err, "Monitoring task panicked, forcing a reconnect");
                    break Ok(ScopeExit::Global);
                }
                None => {
                    // Unreachable in practice: the refresher and the watcher
                    // only end by cancellation or error.
                    warn!("Supervision scope drained, forcing a reconnect");
                    break Ok(ScopeExit::Global);
                }
            }
        };
        scope.shutdown().await;
        exit
    }
}

/// Reloads the playlist cache whenever the server reports a stored-playlist
/// change. Runs until cancelled.
async fn refresh_stored_playlists(
    cache: Arc<PlaylistCache>,
    session: Arc<Mutex<MpdClient>>,
) -> std::result::Result<TaskOutcome, DaemonError> {
    loop {
        let changed = session.lock().await.idle(&["stored_playlist"]).await?;
        debug!(?changed, "Stored playlists changed on the server");
        cache.refresh(&mut *session.lock().await).await?;
    }
}
