//! Trim-then-fill logic for one partition queue.

use std::sync::Arc;
use std::time::Duration;

use mdqconfig::PartitionConfig;
use mdqmpd::MpdClient;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::cache::{PlaylistCache, TrackLookup};
use crate::errors::Result;
use crate::picker::TrackPicker;
use crate::status::{PlayState, PlayerStatus};

/// Wait between attempts when a pick does not resolve to a playable track
/// (unknown or empty source playlist).
const PICK_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Runs one reconciliation pass per status change: gate on the playback
/// mode, drop played history, then top the queue up to `min-len`.
pub struct QueueReconciler {
    partition: String,
    config: PartitionConfig,
    picker: TrackPicker,
    cache: Arc<PlaylistCache>,
}

impl QueueReconciler {
    pub fn new(
        partition: String,
        config: PartitionConfig,
        picker: TrackPicker,
        cache: Arc<PlaylistCache>,
    ) -> Self {
        Self {
            partition,
            config,
            picker,
            cache,
        }
    }

    pub async fn pass(
        &self,
        client: &mut MpdClient,
        previous: &PlayerStatus,
        current: &PlayerStatus,
    ) -> Result<()> {
        if !current.dynamic_queueing_enabled(&self.partition) {
            return Ok(());
        }
        self.trim(client, previous, current).await?;
        self.fill(client).await
    }

    async fn trim(
        &self,
        client: &mut MpdClient,
        previous: &PlayerStatus,
        current: &PlayerStatus,
    ) -> Result<()> {
        if self.config.clear_when_stopped
            && current.state == Some(PlayState::Stop)
            && previous.state.is_some_and(|state| state != PlayState::Stop)
        {
            info!(partition = %self.partition, "Clearing the queue because playback was stopped");
            client.clear().await?;
            return Ok(());
        }
        let Some(song) = current.song else {
            return Ok(());
        };
        if let Some(excess) = history_excess(song, self.config.max_hist_len) {
            info!(partition = %self.partition, tracks = excess, "Removing played history from the queue");
            client.delete_range(0, excess).await?;
        }
        Ok(())
    }

    async fn fill(&self, client: &mut MpdClient) -> Result<()> {
        loop {
            let status = PlayerStatus::from_map(&client.status().await?);
            let Some(length) = status.playlist_length else {
                warn!(partition = %self.partition, "status has no `playlistlength`, skipping fill");
                return Ok(());
            };
            if length >= self.config.min_len {
                return Ok(());
            }
            let track = self.choose_track().await;
            info!(partition = %self.partition, track = %track, "Adding track to the queue");
            client.add(&track).await?;
        }
    }

    /// Two-stage pick: resolve a playlist name, then a random track from it.
    /// A miss (unknown or empty playlist) waits and starts over from the
    /// name resolution, so a cache refresh can heal the situation.
    async fn choose_track(&self) -> String {
        loop {
            let name = {
                let mut rng = rand::rng();
                self.picker.pick_playlist(&mut rng).to_string()
            };
            match self.cache.random_track(&name).await {
                TrackLookup::Track(track) => return track,
                TrackLookup::UnknownPlaylist => {
                    warn!(partition = %self.partition, playlist = %name, "source playlist does not exist");
                }
                TrackLookup::EmptyPlaylist => {
                    warn!(partition = %self.partition, playlist = %name, "source playlist is empty");
                }
            }
            sleep(PICK_RETRY_DELAY).await;
        }
    }
}

/// Number of played queue entries beyond the allowed history length.
/// `max_hist_len` is a float so the config can say `.inf`, which disables
/// trimming entirely.
fn history_excess(song: usize, max_hist_len: f64) -> Option<usize> {
    let excess = song as f64 - max_hist_len;
    if excess > 0.0 { Some(excess as usize) } else { None }
}
