//! Shared cache of the server's stored playlists.

use std::collections::HashMap;

use mdqmpd::MpdClient;
use rand::Rng;
use tokio::sync::RwLock;
use tracing::info;

/// A stored playlist at a known version. Replaced wholesale on refresh,
/// never patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPlaylist {
    pub last_modified: String,
    pub tracks: Vec<String>,
}

/// Outcome of a track lookup against the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackLookup {
    Track(String),
    UnknownPlaylist,
    EmptyPlaylist,
}

/// Last-known contents of each stored playlist, keyed by name.
///
/// Written by the orchestrator's loader/refresher, read by every partition
/// monitor. The only mutation is whole-entry replacement under the write
/// lock, so readers never observe a half-updated playlist.
#[derive(Debug, Default)]
pub struct PlaylistCache {
    playlists: RwLock<HashMap<String, StoredPlaylist>>,
}

impl PlaylistCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reloads every playlist whose `last_modified` token changed since the
    /// last refresh. Playlists deleted on the server keep their last-known
    /// contents, matching the server's own retention of queue history.
    pub async fn refresh(&self, client: &mut MpdClient) -> mdqmpd::Result<()> {
        for summary in client.list_playlists().await? {
            let up_to_date = {
                let playlists = self.playlists.read().await;
                playlists
                    .get(&summary.name)
                    .is_some_and(|known| known.last_modified == summary.last_modified)
            };
            if up_to_date {
                continue;
            }
            info!(playlist = %summary.name, "Loading contents of stored playlist");
            let tracks = client.list_playlist(&summary.name).await?;
            let mut playlists = self.playlists.write().await;
            playlists.insert(
                summary.name,
                StoredPlaylist {
                    last_modified: summary.last_modified,
                    tracks,
                },
            );
        }
        Ok(())
    }

    /// Picks a uniformly random track from the named playlist.
    pub async fn random_track(&self, name: &str) -> TrackLookup {
        let playlists = self.playlists.read().await;
        match playlists.get(name) {
            None => TrackLookup::UnknownPlaylist,
            Some(playlist) if playlist.tracks.is_empty() => TrackLookup::EmptyPlaylist,
            Some(playlist) => {
                let mut rng = rand::rng();
                let index = rng.random_range(0..playlist.tracks.len());
                TrackLookup::Track(playlist.tracks[index].clone())
            }
        }
    }

    pub async fn get(&self, name: &str) -> Option<StoredPlaylist> {
        self.playlists.read().await.get(name).cloned()
    }
}
