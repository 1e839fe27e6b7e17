//! Finding saves that need a backup, and forgetting saves that are gone.

use crate::fs::metadata::dir_modified_at;
use crate::models::{folder_name, BackupSet, SaveKey};
use std::fs;
use tracing::{debug, warn};

/// Saves under the configured locations whose folder changed since their last
/// backup, location by location, folders in name order.
///
/// Backup folders (by name, or because a record points at them) are never
/// candidates.
pub fn find_changed_saves(set: &BackupSet) -> Vec<SaveKey> {
    let mut changed = Vec::new();

    for location in &set.location_folders {
        let location_path = set.location_path(location);
        if !location_path.is_dir() {
            continue;
        }

        let entries = match fs::read_dir(&location_path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot list saves in {}: {}", location_path.display(), e);
                continue;
            }
        };

        let mut save_folders: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        save_folders.sort();

        for save_folder in save_folders {
            if folder_name::is_backup_folder(&save_folder)
                || set.contains_backup_folder(location, &save_folder)
            {
                continue;
            }

            let key = SaveKey::new(location.as_str(), save_folder);
            if is_changed(set, &key) {
                changed.push(key);
            }
        }
    }

    changed
}

/// A save needs a backup when it is untracked, has an unfinished backup, or
/// its folder timestamp differs from the one last backed up.
pub fn is_changed(set: &BackupSet, key: &SaveKey) -> bool {
    let Some(record) = set.record(key) else {
        return true;
    };
    if record.in_progress() {
        return true;
    }

    match dir_modified_at(&set.save_path(key)) {
        Ok(Some(modified)) => record.last_backed_up_source_modified_at != Some(modified),
        Ok(None) => false,
        Err(e) => {
            debug!(save = %key, "Cannot read save timestamp: {}", e);
            false
        }
    }
}

/// Drop records of saves whose folder no longer exists. Their backup folders
/// stay where they are.
pub fn prune_missing_saves(set: &mut BackupSet) -> Vec<SaveKey> {
    let missing: Vec<SaveKey> = set
        .keys()
        .filter(|key| !set.save_path(key).is_dir())
        .cloned()
        .collect();

    for key in &missing {
        set.remove(key);
    }

    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BackupSlot;
    use filetime::FileTime;
    use std::path::Path;
    use tempfile::TempDir;

    fn set_in(root: &Path) -> BackupSet {
        BackupSet::new(root, ["Survivor", "Builder"], 3).unwrap()
    }

    fn mark_backed_up(set: &mut BackupSet, key: &SaveKey) -> std::io::Result<()> {
        let modified = crate::fs::metadata::modified_at(&set.save_path(key))?;
        let record = set.get_or_insert(key);
        record.begin(BackupSlot::in_progress(&key.save, Vec::new()), 3);
        record.complete(BackupSlot::completed(&key.save, modified, Vec::new()));
        Ok(())
    }

    #[test]
    fn test_new_saves_are_changed() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::create_dir_all(temp_dir.path().join("Survivor/b"))?;
        fs::create_dir_all(temp_dir.path().join("Survivor/a"))?;
        fs::create_dir_all(temp_dir.path().join("Sandbox/ignored"))?;
        fs::write(temp_dir.path().join("Survivor/not-a-save.txt"), b"x")?;

        let set = set_in(temp_dir.path());
        let changed = find_changed_saves(&set);

        assert_eq!(
            changed,
            vec![SaveKey::new("Survivor", "a"), SaveKey::new("Survivor", "b")]
        );
        Ok(())
    }

    #[test]
    fn test_backup_folders_are_not_saves() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let location = temp_dir.path().join("Survivor");
        fs::create_dir_all(location.join("world"))?;
        fs::create_dir_all(location.join("world [Do not load - Backup is in progress]"))?;
        fs::create_dir_all(location.join("world [Backup-2024_01_01-10_00_00]"))?;
        fs::create_dir_all(location.join("old [Backup-2020_05_05-05_05_05]"))?;

        let set = set_in(temp_dir.path());
        assert_eq!(find_changed_saves(&set), vec![SaveKey::new("Survivor", "world")]);
        Ok(())
    }

    #[test]
    fn test_up_to_date_save_is_skipped_until_touched() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let save = temp_dir.path().join("Builder/world");
        fs::create_dir_all(&save)?;
        filetime::set_file_mtime(&save, FileTime::from_unix_time(1_600_000_000, 0))?;

        let mut set = set_in(temp_dir.path());
        let key = SaveKey::new("Builder", "world");
        mark_backed_up(&mut set, &key)?;
        assert!(find_changed_saves(&set).is_empty());

        filetime::set_file_mtime(&save, FileTime::from_unix_time(1_600_000_100, 0))?;
        assert_eq!(find_changed_saves(&set), vec![key]);
        Ok(())
    }

    #[test]
    fn test_in_progress_save_is_changed() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::create_dir_all(temp_dir.path().join("Survivor/world"))?;

        let mut set = set_in(temp_dir.path());
        let key = SaveKey::new("Survivor", "world");
        mark_backed_up(&mut set, &key)?;
        set.get_or_insert(&key)
            .begin(BackupSlot::in_progress("world", Vec::new()), 3);

        assert!(is_changed(&set, &key));
        Ok(())
    }

    #[test]
    fn test_deregistration_keeps_backup_folders() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let location = temp_dir.path().join("Survivor");
        fs::create_dir_all(location.join("world"))?;
        fs::create_dir_all(location.join("other"))?;

        let mut set = set_in(temp_dir.path());
        let world = SaveKey::new("Survivor", "world");
        let other = SaveKey::new("Survivor", "other");
        mark_backed_up(&mut set, &world)?;
        mark_backed_up(&mut set, &other)?;
        let backup_folder = set.record(&world).unwrap().slots()[0].folder_name.clone();
        fs::create_dir_all(location.join(&backup_folder))?;
        fs::write(location.join(&backup_folder).join("map.bin"), b"kept")?;

        fs::remove_dir_all(location.join("world"))?;
        fs::remove_dir_all(location.join("other"))?;
        let removed = prune_missing_saves(&mut set);

        assert_eq!(removed, vec![other, world]);
        assert!(set.is_empty());
        assert_eq!(fs::read(location.join(&backup_folder).join("map.bin"))?, b"kept");
        Ok(())
    }
}
