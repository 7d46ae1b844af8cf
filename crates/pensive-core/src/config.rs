//! Configuration types for PensiveDB.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::PensiveError;

/// Vector index backend selection.
///
/// `Flat` is the exact brute-force index. An unrecognized mode string is
/// a fatal configuration error surfaced before any store handle opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    Flat,
}

impl Default for IndexMode {
    fn default() -> Self {
        Self::Flat
    }
}

impl FromStr for IndexMode {
    type Err = PensiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(Self::Flat),
            other => Err(PensiveError::config(format!(
                "unknown index mode: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for IndexMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
        }
    }
}

/// Main configuration for pensive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PensiveConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Search configuration.
    #[serde(default)]
    pub search: SearchConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,

    /// How many logical writes accumulate before the pending transaction
    /// commits. 1 commits every write (strict durability); larger values
    /// trade durability for throughput.
    #[serde(default = "default_flush_every")]
    pub flush_every: u32,

    /// Vector index backend.
    #[serde(default)]
    pub index_mode: IndexMode,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            flush_every: default_flush_every(),
            index_mode: IndexMode::default(),
        }
    }
}

/// Search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default number of results.
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
        }
    }
}

fn default_flush_every() -> u32 {
    1
}

fn default_top_k() -> usize {
    5
}

fn default_database_path() -> PathBuf {
    PathBuf::from("pensive.db")
}

impl PensiveConfig {
    /// Load configuration from a file.
    pub fn load(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            PensiveError::config(format!("Failed to parse config: {e}"))
        })?;
        Ok(config)
    }

    /// Load configuration from default paths, falling back to defaults.
    pub fn load_default() -> crate::error::Result<Self> {
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("pensive").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        let local_config = PathBuf::from("pensive.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Self::default())
    }
}
