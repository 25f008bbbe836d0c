//! Configuration document for the MDQueue daemon.
//!
//! The configuration lives in a single YAML file. Loading merges the file
//! with the built-in defaults so that omitted keys never appear as absent,
//! and writes the normalized result back whenever it differs from what was
//! on disk. Consumers treat a loaded [`ConfigDocument`] as an immutable
//! snapshot: a reload produces a new document, nothing is mutated in place.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 6600;
pub const DEFAULT_MIN_LEN: usize = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("cannot write config file {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Top-level configuration snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDocument {
    pub host: String,
    pub port: u16,
    pub partitions: BTreeMap<String, PartitionConfig>,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        let mut partitions = BTreeMap::new();
        partitions.insert("default".to_string(), PartitionConfig::default());
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            partitions,
        }
    }
}

/// Per-partition settings, all optional in the file.
///
/// `max-hist-len: .inf` (the default) disables history trimming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PartitionConfig {
    pub enabled: bool,
    pub min_len: usize,
    pub max_hist_len: f64,
    pub clear_when_stopped: bool,
    pub source_playlists: SourcePlaylists,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_len: DEFAULT_MIN_LEN,
            max_hist_len: f64::INFINITY,
            clear_when_stopped: false,
            source_playlists: SourcePlaylists::default(),
        }
    }
}

/// The `source-playlists` key accepts a single name, a list of names, or a
/// name-to-weight mapping. An empty list or mapping means "no source".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourcePlaylists {
    Single(String),
    List(Vec<String>),
    Weighted(BTreeMap<String, f64>),
}

impl Default for SourcePlaylists {
    fn default() -> Self {
        SourcePlaylists::Weighted(BTreeMap::new())
    }
}

impl SourcePlaylists {
    pub fn is_empty(&self) -> bool {
        match self {
            SourcePlaylists::Single(name) => name.is_empty(),
            SourcePlaylists::List(names) => names.is_empty(),
            SourcePlaylists::Weighted(weights) => weights.is_empty(),
        }
    }
}

impl ConfigDocument {
    /// Loads the configuration from `path`, merging it with the defaults.
    ///
    /// A missing file is treated as an empty document. When the normalized
    /// document differs from the raw file contents the normalized form is
    /// written back, so the persisted file always reflects the effective
    /// values. That write-back is the only side effect of a load.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw: Value = match fs::read_to_string(path) {
            Ok(text) => serde_yaml::from_str(&text)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(config_file = %path.display(), "Config file not found, using defaults");
                Value::Null
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        let (document, dirty) = Self::normalize(&raw)?;
        if dirty {
            document.store(path)?;
        }
        Ok(document)
    }

    /// Merges `raw` with the defaults. The returned flag is true when the
    /// normalized document no longer matches `raw` byte-for-byte, i.e. when
    /// a load would write the file back.
    fn normalize(raw: &Value) -> Result<(Self, bool), ConfigError> {
        let source = match raw {
            Value::Null => Value::Mapping(serde_yaml::Mapping::new()),
            other => other.clone(),
        };
        let document: ConfigDocument = serde_yaml::from_value(source)?;
        let normalized = serde_yaml::to_value(&document)?;
        Ok((document, normalized != *raw))
    }

    /// Persists the document as YAML.
    pub fn store(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })?;
        info!(config_file = %path.display(), "Stored normalized configuration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> (ConfigDocument, bool) {
        let raw: Value = serde_yaml::from_str(yaml).unwrap();
        ConfigDocument::normalize(&raw).unwrap()
    }

    #[test]
    fn empty_document_yields_full_defaults() {
        let (doc, dirty) = ConfigDocument::normalize(&Value::Null).unwrap();
        assert!(dirty);
        assert_eq!(doc.host, "localhost");
        assert_eq!(doc.port, 6600);
        let default = &doc.partitions["default"];
        assert!(default.enabled);
        assert_eq!(default.min_len, 10);
        assert!(default.max_hist_len.is_infinite());
        assert!(!default.clear_when_stopped);
        assert!(default.source_playlists.is_empty());
    }

    #[test]
    fn partial_document_keeps_given_values_and_fills_the_rest() {
        let (doc, dirty) = parse(
            "host: jukebox\npartitions:\n  jazz:\n    min-len: 5\n  ambient: {}\n",
        );
        assert!(dirty);
        assert_eq!(doc.host, "jukebox");
        assert_eq!(doc.port, 6600);
        assert_eq!(doc.partitions.len(), 2);
        assert_eq!(doc.partitions["jazz"].min_len, 5);
        assert!(doc.partitions["jazz"].enabled);
        assert_eq!(doc.partitions["ambient"].min_len, 10);
    }

    #[test]
    fn normalization_is_idempotent() {
        let (doc, _) = parse("port: 6601\n");
        let normalized = serde_yaml::to_value(&doc).unwrap();
        let (again, dirty) = ConfigDocument::normalize(&normalized).unwrap();
        assert!(!dirty, "re-normalizing a normalized document must be a no-op");
        assert_eq!(again, doc);
    }

    #[test]
    fn source_playlists_accepts_all_three_shapes() {
        let single = "partitions:\n  p:\n    source-playlists: jazz\n";
        let list = "partitions:\n  p:\n    source-playlists: [jazz, blues]\n";
        let weighted = "partitions:\n  p:\n    source-playlists:\n      jazz: 1\n      blues: 3\n";

        let (doc, _) = parse(single);
        assert_eq!(
            doc.partitions["p"].source_playlists,
            SourcePlaylists::Single("jazz".into())
        );

        let (doc, _) = parse(list);
        assert_eq!(
            doc.partitions["p"].source_playlists,
            SourcePlaylists::List(vec!["jazz".into(), "blues".into()])
        );

        let (doc, _) = parse(weighted);
        let SourcePlaylists::Weighted(weights) = &doc.partitions["p"].source_playlists else {
            panic!("expected a weighted mapping");
        };
        assert_eq!(weights["jazz"], 1.0);
        assert_eq!(weights["blues"], 3.0);
    }

    #[test]
    fn load_writes_back_a_superset_of_a_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdqueue.yaml");
        fs::write(&path, "host: jukebox\n").unwrap();

        let doc = ConfigDocument::load(&path).unwrap();
        assert_eq!(doc.host, "jukebox");

        let persisted = fs::read_to_string(&path).unwrap();
        assert!(persisted.contains("port: 6600"));
        assert!(persisted.contains("partitions:"));
        assert!(persisted.contains("max-hist-len: .inf"));

        // A second load sees an already-normalized file and leaves it alone.
        let again = ConfigDocument::load(&path).unwrap();
        assert_eq!(again, doc);
        assert_eq!(fs::read_to_string(&path).unwrap(), persisted);
    }

    #[test]
    fn load_of_missing_file_creates_it_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdqueue.yaml");

        let doc = ConfigDocument::load(&path).unwrap();
        assert_eq!(doc, ConfigDocument::default());
        assert!(path.exists());
    }
}
