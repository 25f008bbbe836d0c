use mdqconfig::ConfigError;
use mdqmpd::MpdError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DaemonError {
    /// The select/create alternation ran out of attempts.
    #[error("failed to enter partition {partition} after {attempts} attempts")]
    PartitionJoin { partition: String, attempts: usize },
    /// Weighted source-playlists that cannot select anything (all weights
    /// zero, or a negative/non-finite weight).
    #[error("invalid source-playlists weights: {0}")]
    InvalidWeights(String),
    #[error(transparent)]
    Mpd(#[from] MpdError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, DaemonError>;
