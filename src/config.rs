//! Tracker configuration.
//!
//! Loaded from a TOML file. Missing or invalid files fall back to defaults;
//! command-line flags override individual values afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Configuration file name.
pub const CONFIG_FILE: &str = "craft-tracker.toml";

/// Log filter used when neither RUST_LOG nor the config file provides a valid one.
pub const DEFAULT_LOG_FILTER: &str = "craft_tracker=info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// How `plan` presents requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// One tree per selected recipe
    #[default]
    Tree,
    /// Merged totals per resource
    List,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Catalog JSON file or directory of JSON files
    pub catalog: PathBuf,
    /// SQLite database holding selections and collected amounts
    pub database: PathBuf,
    /// Default view for `plan`
    pub view: View,
    /// Log filter used when RUST_LOG is not set
    pub log_filter: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from("catalog.json"),
            database: PathBuf::from("craft_tracker.db"),
            view: View::Tree,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from a specific path.
    /// Returns defaults if the file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        match Self::try_load(path) {
            Ok(Some(config)) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Ok(None) => {
                info!("Config file {} not found, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("{e}, using defaults");
                Self::default()
            }
        }
    }

    /// Read and parse a config file. `Ok(None)` when the file doesn't exist.
    pub fn try_load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(config))
    }

    /// Log filter from the config, or the built-in default if it doesn't parse
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.log_filter).unwrap_or_else(|e| {
            warn!("Invalid log_filter '{}': {e}, using '{DEFAULT_LOG_FILTER}'", self.log_filter);
            EnvFilter::new(DEFAULT_LOG_FILTER)
        })
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, catalog: Option<PathBuf>, database: Option<PathBuf>) -> Self {
        if let Some(catalog) = catalog {
            self.catalog = catalog;
        }
        if let Some(database) = database {
            self.database = database;
        }
        self
    }
}
