//! Tolerant view of an MPD status response.

use std::collections::HashMap;

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Play,
    Pause,
    Stop,
}

/// One status snapshot. Every field may be absent: MPD omits keys depending
/// on the player state, and a missing field must degrade behavior, never
/// fail it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerStatus {
    pub state: Option<PlayState>,
    /// Queue position of the currently playing track.
    pub song: Option<usize>,
    pub playlist_length: Option<usize>,
    pub random: Option<bool>,
    pub repeat: Option<bool>,
    pub single: Option<bool>,
}

impl PlayerStatus {
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        Self {
            state: map.get("state").and_then(|raw| match raw.as_str() {
                "play" => Some(PlayState::Play),
                "pause" => Some(PlayState::Pause),
                "stop" => Some(PlayState::Stop),
                _ => None,
            }),
            song: parse_field(map, "song"),
            playlist_length: parse_field(map, "playlistlength"),
            random: parse_flag(map, "random"),
            repeat: parse_flag(map, "repeat"),
            single: parse_flag(map, "single"),
        }
    }

    /// Whether the playback mode is compatible with linear auto-fill.
    ///
    /// Random playback, and repeat without single, both make trimming and
    /// filling meaningless. The fields are checked in sequence and the
    /// first missing one suspends dynamic queueing for this pass.
    pub fn dynamic_queueing_enabled(&self, partition: &str) -> bool {
        let Some(random) = self.random else {
            warn!(partition, "status has no `random` flag, suspending dynamic queueing");
            return false;
        };
        if random {
            return false;
        }
        let Some(repeat) = self.repeat else {
            warn!(partition, "status has no `repeat` flag, suspending dynamic queueing");
            return false;
        };
        if !repeat {
            return true;
        }
        let Some(single) = self.single else {
            warn!(partition, "status has no `single` flag, suspending dynamic queueing");
            return false;
        };
        single
    }
}

fn parse_field<T: std::str::FromStr>(map: &HashMap<String, String>, key: &str) -> Option<T> {
    map.get(key).and_then(|raw| raw.parse().ok())
}

fn parse_flag(map: &HashMap<String, String>, key: &str) -> Option<bool> {
    match map.get(key).map(String::as_str) {
        Some("0") => Some(false),
        Some("1") => Some(true),
        _ => None,
    }
}
