//! The Backup Set: where saves live, how many backups each keeps, and the
//! history of every tracked save.

use super::record::SaveRecord;
use crate::utils::errors::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Identity of a save: its location folder and its own folder name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SaveKey {
    pub location: String,
    pub save: String,
}

impl SaveKey {
    pub fn new(location: impl Into<String>, save: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            save: save.into(),
        }
    }
}

impl fmt::Display for SaveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.location, self.save)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSet {
    pub source_root: PathBuf,
    pub location_folders: Vec<String>,
    pub max_slots_per_save: usize,

    #[serde(default, with = "record_list")]
    records: BTreeMap<SaveKey, SaveRecord>,
}

impl BackupSet {
    pub fn new(
        source_root: impl Into<PathBuf>,
        location_folders: impl IntoIterator<Item = impl Into<String>>,
        max_slots_per_save: usize,
    ) -> Result<Self> {
        let mut set = Self {
            source_root: source_root.into(),
            location_folders: Vec::new(),
            max_slots_per_save,
            records: BTreeMap::new(),
        };
        for location in location_folders {
            let location = location.into();
            if !set.location_folders.contains(&location) {
                set.location_folders.push(location);
            }
        }
        set.validate()?;
        Ok(set)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_slots_per_save == 0 {
            return Err(AgentError::Config(
                "max_slots_per_save must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn location_path(&self, location: &str) -> PathBuf {
        self.source_root.join(location)
    }

    pub fn save_path(&self, key: &SaveKey) -> PathBuf {
        self.location_path(&key.location).join(&key.save)
    }

    /// Path of a backup folder belonging to `key`'s location.
    pub fn backup_path(&self, key: &SaveKey, folder_name: &str) -> PathBuf {
        self.location_path(&key.location).join(folder_name)
    }

    pub fn record(&self, key: &SaveKey) -> Option<&SaveRecord> {
        self.records.get(key)
    }

    pub fn record_mut(&mut self, key: &SaveKey) -> Option<&mut SaveRecord> {
        self.records.get_mut(key)
    }

    pub fn get_or_insert(&mut self, key: &SaveKey) -> &mut SaveRecord {
        self.records
            .entry(key.clone())
            .or_insert_with(|| SaveRecord::new(key))
    }

    /// Forgets a save. Its backup folders are left on disk.
    pub fn remove(&mut self, key: &SaveKey) -> Option<SaveRecord> {
        self.records.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &SaveKey> {
        self.records.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether `folder_name` is a slot folder recorded for any save of
    /// `location`.
    pub fn contains_backup_folder(&self, location: &str, folder_name: &str) -> bool {
        self.records
            .values()
            .filter(|record| record.location_folder == location)
            .any(|record| record.slots().iter().any(|slot| slot.folder_name == folder_name))
    }

    pub fn normalize(&mut self) {
        let records = std::mem::take(&mut self.records);
        self.records = records
            .into_values()
            .map(|mut record| {
                record.normalize();
                (record.key(), record)
            })
            .collect();
    }
}

/// Records are persisted as a flat list; each one carries its own key.
mod record_list {
    use super::{SaveKey, SaveRecord};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(records: &BTreeMap<SaveKey, SaveRecord>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(records.values())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<SaveKey, SaveRecord>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let records = Vec::<SaveRecord>::deserialize(deserializer)?;
        Ok(records
            .into_iter()
            .map(|record| (record.key(), record))
            .collect())
    }
}
