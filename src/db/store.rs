//! JSON configuration store.

use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::models::*;
use super::names::{find_clash, NameClash};

/// Configuration store error types.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed configuration {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path}: {} and {} both map to {}", .clash.first, .clash.second, .clash.name)]
    NameClash { path: PathBuf, clash: NameClash },
}

/// Reads and writes the configuration file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, writing defaults first if the file is absent.
    ///
    /// A file with an empty graph set gets the default intervals and is
    /// rewritten as well. Target ids that would share a data-source, page or
    /// graph name are rejected.
    pub fn load(&self, now: DateTime<Utc>) -> Result<ConfigFile, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => Some(c),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let Some(content) = content else {
            tracing::info!("Config {} not found, creating default", self.path.display());
            let defaults = ConfigFile::with_defaults(now);
            self.save(&defaults)?;
            return Ok(defaults);
        };

        let mut config: ConfigFile =
            serde_json::from_str(&content).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                source,
            })?;

        let filled = config.graphs.is_empty();
        if filled {
            tracing::info!("No graph intervals in {}, adding defaults", self.path.display());
            config.graphs = default_graphs();
        }

        if let Some(clash) = find_clash(&config.targets, &config.graphs) {
            return Err(StoreError::NameClash {
                path: self.path.clone(),
                clash,
            });
        }

        if filled {
            self.save(&config)?;
        }

        tracing::debug!(
            "Loaded {} targets and {} graph intervals from {}",
            config.targets.len(),
            config.graphs.len(),
            self.path.display()
        );
        Ok(config)
    }

    /// Write the configuration as pretty JSON.
    pub fn save(&self, config: &ConfigFile) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(config).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, content + "\n").map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
