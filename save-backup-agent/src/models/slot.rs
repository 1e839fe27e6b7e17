use super::folder_name;
use super::snapshot::FileSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One backup generation of a save: a folder next to the save plus the
/// snapshots of every file copied into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSlot {
    pub folder_name: String,

    /// Source folder modification time the slot was taken against.
    /// `None` until the first attempt into this slot has captured one.
    pub source_modified_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub snapshots: Vec<FileSnapshot>,
}

impl BackupSlot {
    /// A freshly claimed slot for `save_folder`, seeded with the snapshots of
    /// the slot it reuses.
    pub fn in_progress(save_folder: &str, snapshots: Vec<FileSnapshot>) -> Self {
        Self {
            folder_name: folder_name::in_progress(save_folder),
            source_modified_at: None,
            snapshots,
        }
    }

    pub fn completed(
        save_folder: &str,
        source_modified_at: DateTime<Utc>,
        snapshots: Vec<FileSnapshot>,
    ) -> Self {
        Self {
            folder_name: folder_name::completed(save_folder, source_modified_at),
            source_modified_at: Some(source_modified_at),
            snapshots,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        folder_name::is_in_progress(&self.folder_name)
    }

    /// Lookup from relative path to snapshot, used while copying.
    pub fn snapshot_index(&self) -> HashMap<&str, &FileSnapshot> {
        self.snapshots
            .iter()
            .map(|snapshot| (snapshot.relative_path.as_str(), snapshot))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_slot_state_follows_folder_name() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let running = BackupSlot::in_progress("world", Vec::new());
        assert!(running.is_in_progress());
        assert_eq!(running.source_modified_at, None);

        let done = BackupSlot::completed("world", at, Vec::new());
        assert!(!done.is_in_progress());
        assert_eq!(done.source_modified_at, Some(at));
    }

    #[test]
    fn test_snapshot_index() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let slot = BackupSlot::completed(
            "world",
            at,
            vec![
                FileSnapshot::new("map_p.bin", at),
                FileSnapshot::new("chunkdata/0_0.bin", at),
            ],
        );

        let index = slot.snapshot_index();
        assert_eq!(index.len(), 2);
        assert!(index.contains_key("chunkdata/0_0.bin"));
        assert!(index.get("map_p.bin").is_some());
        assert!(index.get("missing.bin").is_none());
    }
}
