//! Source-playlist selection.

use mdqconfig::SourcePlaylists;
use rand::Rng;

use crate::errors::DaemonError;

/// Resolves which stored playlist the next track comes from.
///
/// Mirrors the three shapes of the `source-playlists` key. Weights are
/// validated at construction: a weighted spec that cannot select anything
/// is a configuration error, not something to guess around.
#[derive(Debug, Clone)]
pub enum TrackPicker {
    Single(String),
    List(Vec<String>),
    Weighted { names: Vec<String>, weights: Vec<f64> },
}

impl TrackPicker {
    /// Builds a picker from the partition's spec. `Ok(None)` means the
    /// partition has no usable track source and stays out of dynamic
    /// queueing entirely.
    pub fn from_spec(spec: &SourcePlaylists) -> Result<Option<Self>, DaemonError> {
        if spec.is_empty() {
            return Ok(None);
        }
        match spec {
            SourcePlaylists::Single(name) => Ok(Some(TrackPicker::Single(name.clone()))),
            SourcePlaylists::List(names) => Ok(Some(TrackPicker::List(names.clone()))),
            SourcePlaylists::Weighted(weighted) => {
                if let Some((name, weight)) = weighted
                    .iter()
                    .find(|(_, weight)| !weight.is_finite() || **weight < 0.0)
                {
                    return Err(DaemonError::InvalidWeights(format!(
                        "playlist {name:?} has weight {weight}"
                    )));
                }
                let total: f64 = weighted.values().sum();
                if total <= 0.0 {
                    return Err(DaemonError::InvalidWeights(
                        "all weights are zero".to_string(),
                    ));
                }
                Ok(Some(TrackPicker::Weighted {
                    names: weighted.keys().cloned().collect(),
                    weights: weighted.values().copied().collect(),
                }))
            }
        }
    }

    /// Resolves one playlist name.
    pub fn pick_playlist<R: Rng>(&self, rng: &mut R) -> &str {
        match self {
            TrackPicker::Single(name) => name,
            TrackPicker::List(names) => &names[rng.random_range(0..names.len())],
            TrackPicker::Weighted { names, weights } => {
                let total: f64 = weights.iter().sum();
                let mut roll = rng.random_range(0.0..total);
                for (name, weight) in names.iter().zip(weights) {
                    if roll < *weight {
                        return name;
                    }
                    roll -= weight;
                }
                // Floating-point edge: the roll landed exactly on the total.
                &names[names.len() - 1]
            }
        }
    }
}
