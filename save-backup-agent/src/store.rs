//! Persistence of the Backup Set as a single JSON document.
//!
//! The whole set is rewritten after every state change. Writes go to a
//! sibling temp file that is then renamed over the target, so readers only
//! ever see a complete document.

use crate::models::BackupSet;
use crate::utils::errors::{AgentError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted set, or write `seed` as the initial one when no
    /// metadata file exists yet.
    pub fn load_or_create(&self, seed: BackupSet) -> Result<BackupSet> {
        if !self.path.exists() {
            seed.validate()?;
            self.save(&seed)?;
            info!("Created backup metadata at {}", self.path.display());
            return Ok(seed);
        }
        self.load()
    }

    pub fn load(&self) -> Result<BackupSet> {
        let content = fs::read_to_string(&self.path)?;
        let mut set: BackupSet = serde_json::from_str(&content).map_err(|e| {
            AgentError::Metadata(format!("{} is not valid backup metadata: {}", self.path.display(), e))
        })?;
        set.validate()?;
        set.normalize();
        Ok(set)
    }

    pub fn save(&self, set: &BackupSet) -> Result<()> {
        let json = serde_json::to_string_pretty(set)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
