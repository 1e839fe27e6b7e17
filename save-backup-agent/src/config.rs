//! Configuration management for the save backup agent.
//!
//! Loads configuration from a TOML file; every field has a default so a
//! missing file or section falls back to the stock Project Zomboid layout.

use crate::models::BackupSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub saves: SavesConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Backup metadata file (the persisted Backup Set)
    #[serde(default = "default_metadata_file")]
    pub metadata_file: PathBuf,

    /// Lock file guarding against a second running instance
    #[serde(default = "default_lock_file")]
    pub lock_file: PathBuf,

    /// Seconds between two scans for changed saves
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Seconds to wait before retrying a failed backup attempt
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

/// Seeds a new Backup Set. Ignored once the metadata file exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavesConfig {
    /// Folder holding one sub-folder per location
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,

    /// Location folders scanned for saves
    #[serde(default = "default_location_folders")]
    pub location_folders: Vec<String>,

    /// Backups kept per save
    #[serde(default = "default_max_slots_per_save")]
    pub max_slots_per_save: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Optional log file, truncated on start (an empty path disables it)
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
}

// Default values
fn default_metadata_file() -> PathBuf {
    PathBuf::from("SavesBackupingData.json")
}

fn default_lock_file() -> PathBuf {
    PathBuf::from("save-backup-agent.lock")
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_source_root() -> PathBuf {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_default();
    home.join("Zomboid").join("Saves")
}

fn default_location_folders() -> Vec<String> {
    vec![
        "Survivor".to_string(),
        "Builder".to_string(),
        "Sandbox".to_string(),
    ]
}

fn default_max_slots_per_save() -> usize {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("log.txt"))
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            metadata_file: default_metadata_file(),
            lock_file: default_lock_file(),
            poll_interval_secs: default_poll_interval_secs(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl Default for SavesConfig {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            location_folders: default_location_folders(),
            max_slots_per_save: default_max_slots_per_save(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.agent.poll_interval_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.agent.retry_delay_secs)
    }
}

impl SavesConfig {
    /// The Backup Set written when no metadata exists yet.
    pub fn seed(&self) -> crate::Result<BackupSet> {
        BackupSet::new(
            self.source_root.clone(),
            self.location_folders.iter().cloned(),
            self.max_slots_per_save,
        )
    }
}
