//! Per-partition monitoring task.

use std::sync::Arc;

use mdqconfig::PartitionConfig;
use mdqmpd::MpdClient;
use tracing::{debug, info};

use crate::cache::PlaylistCache;
use crate::errors::{DaemonError, Result};
use crate::picker::TrackPicker;
use crate::reconcile::QueueReconciler;
use crate::status::PlayerStatus;

/// Total budget for the select/create alternation when joining a partition.
const JOIN_ATTEMPTS: usize = 3;

/// Subsystems whose changes trigger a reconciliation pass.
const IDLE_SUBSYSTEMS: &[&str] = &["player", "playlist", "options"];

/// Owns one partition's monitoring lifetime: a dedicated protocol session
/// (partition selection is session-scoped), the join handshake, and the
/// notification-driven reconciliation loop.
pub struct PartitionSupervisor {
    host: String,
    port: u16,
    name: String,
    config: PartitionConfig,
    cache: Arc<PlaylistCache>,
}

impl PartitionSupervisor {
    pub fn new(
        host: String,
        port: u16,
        name: String,
        config: PartitionConfig,
        cache: Arc<PlaylistCache>,
    ) -> Self {
        Self {
            host,
            port,
            name,
            config,
            cache,
        }
    }

    /// Runs the partition monitor. Returns immediately (and lets the rest
    /// of the supervision scope keep running) when the partition is
    /// disabled or has no usable track source. Otherwise this only returns
    /// on a fatal error; orderly shutdown happens via cancellation.
    pub async fn run(self) -> Result<()> {
        if !self.config.enabled {
            debug!(partition = %self.name, "Partition is disabled, not monitoring");
            return Ok(());
        }
        let Some(picker) = TrackPicker::from_spec(&self.config.source_playlists)? else {
            debug!(partition = %self.name, "No source playlists configured, not monitoring");
            return Ok(());
        };

        let mut client = MpdClient::connect(&self.host, self.port).await?;
        enter_partition(&mut client, &self.name).await?;

        let mut current = PlayerStatus::from_map(&client.status().await?);
        let mut previous = current.clone();
        info!(partition = %self.name, "Connected");

        let reconciler = QueueReconciler::new(
            self.name.clone(),
            self.config.clone(),
            picker,
            Arc::clone(&self.cache),
        );
        reconciler.pass(&mut client, &previous, &current).await?;

        loop {
            client.idle(IDLE_SUBSYSTEMS).await?;
            previous = current;
            current = PlayerStatus::from_map(&client.status().await?);
            reconciler.pass(&mut client, &previous, &current).await?;
        }
    }
}

/// Switches the session to the named partition, creating it when the server
/// does not know it yet.
///
/// The alternation handles both races: the partition appearing between our
/// failed select and the create (`AlreadyExists` -> retry the select), and
/// it disappearing again before the retry. Any server error other than
/// those two is fatal immediately.
pub async fn enter_partition(client: &mut MpdClient, name: &str) -> Result<()> {
    for _ in 0..JOIN_ATTEMPTS {
        match client.partition(name).await {
            Ok(()) => return Ok(()),
            Err(err) if err.is_not_found() => {
                debug!(partition = name, "Partition does not exist yet, creating it");
            }
            Err(err) => return Err(err.into()),
        }
        match client.new_partition(name).await {
            Ok(()) => {}
            Err(err) if err.is_exists() => {
                debug!(partition = name, "Partition appeared concurrently, retrying select");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Err(DaemonError::PartitionJoin {
        partition: name.to_string(),
        attempts: JOIN_ATTEMPTS,
    })
}
