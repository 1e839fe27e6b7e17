//! Incremental copy of one save into a backup folder.
//!
//! Files whose timestamp matches the snapshot carried over from the reused
//! slot are left alone; everything else is copied. After each copied file the
//! save folder's own timestamp is checked again, and the attempt is abandoned
//! if it moved: the game wrote to the save while we were copying it.

use crate::fs::metadata::dir_modified_at;
use crate::fs::walker::{remove_empty_dirs, walk_directory};
use crate::models::{BackupSlot, FileSnapshot};
use crate::transfer::progress::CopyProgress;
use crate::utils::errors::{AgentError, Result};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

pub struct IncrementalCopy<'a> {
    source: &'a Path,
    destination: &'a Path,
    source_modified_at: DateTime<Utc>,
    previous: Option<&'a BackupSlot>,
    snapshots: Vec<FileSnapshot>,
    progress: CopyProgress,
}

impl<'a> IncrementalCopy<'a> {
    /// `source_modified_at` is the save folder timestamp captured when the
    /// attempt started; `previous` is the slot whose folder `destination` was
    /// recycled from.
    pub fn new(
        source: &'a Path,
        destination: &'a Path,
        source_modified_at: DateTime<Utc>,
        previous: Option<&'a BackupSlot>,
    ) -> Self {
        Self {
            source,
            destination,
            source_modified_at,
            previous,
            snapshots: Vec::new(),
            progress: CopyProgress::new(0),
        }
    }

    /// Copy the save. Returns whether any file was actually copied.
    ///
    /// `before_copy` is called with the progress so far and the relative path
    /// of each file about to be copied.
    ///
    /// On error, the snapshots gathered so far stay available through
    /// [`IncrementalCopy::into_snapshots`].
    pub fn run<F>(&mut self, mut before_copy: F) -> Result<bool>
    where
        F: FnMut(&CopyProgress, &str),
    {
        self.ensure_source_unchanged()?;

        let files = walk_directory(self.source)?;
        self.progress = CopyProgress::new(files.len());
        fs::create_dir_all(self.destination)?;

        let previous: HashMap<&str, &FileSnapshot> = self
            .previous
            .map(BackupSlot::snapshot_index)
            .unwrap_or_default();

        for file in &files {
            let destination_path = self.destination.join(&file.relative_path);

            if let Some(snapshot) = previous.get(file.relative_path.as_str()) {
                if snapshot.matches(file.modified) && destination_path.is_file() {
                    self.snapshots.push((*snapshot).clone());
                    self.progress.record_unchanged();
                    continue;
                }
            }

            self.clear_way(&file.relative_path)?;
            if let Some(parent) = destination_path.parent() {
                fs::create_dir_all(parent)?;
            }

            before_copy(&self.progress, &file.relative_path);
            fs::copy(&file.path, &destination_path)?;

            self.ensure_source_unchanged()?;

            self.progress.record_copied(&file.relative_path, file.size);
            self.snapshots
                .push(FileSnapshot::new(file.relative_path.clone(), file.modified));
        }

        let current: HashSet<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
        self.remove_stale_files(&current)?;
        self.ensure_source_unchanged()?;

        Ok(self.progress.files_copied > 0)
    }

    pub fn progress(&self) -> &CopyProgress {
        &self.progress
    }

    pub fn into_snapshots(self) -> Vec<FileSnapshot> {
        self.snapshots
    }

    fn ensure_source_unchanged(&self) -> Result<()> {
        match dir_modified_at(self.source)? {
            None => Err(AgentError::SourceMissing(self.source.to_path_buf())),
            Some(modified) if modified != self.source_modified_at => Err(
                AgentError::SourceModified(self.source.display().to_string()),
            ),
            Some(_) => Ok(()),
        }
    }

    /// Removes what an older generation left where `relative` has to go: a
    /// file standing in for one of its directories, or a directory standing
    /// in for the file itself.
    fn clear_way(&self, relative: &str) -> Result<()> {
        let mut current = self.destination.to_path_buf();
        let mut parts = relative.split('/').peekable();

        while let Some(part) = parts.next() {
            current.push(part);
            let Ok(metadata) = fs::symlink_metadata(&current) else {
                return Ok(());
            };

            if parts.peek().is_some() {
                if !metadata.is_dir() {
                    fs::remove_file(&current)?;
                    return Ok(());
                }
            } else if metadata.is_dir() {
                fs::remove_dir_all(&current)?;
            }
        }

        Ok(())
    }

    /// Files left in a recycled folder that no longer exist in the save.
    fn remove_stale_files(&mut self, current: &HashSet<&str>) -> Result<()> {
        let backed_up = walk_directory(self.destination)?;
        for file in backed_up {
            if !current.contains(file.relative_path.as_str()) {
                fs::remove_file(&file.path)?;
                self.progress.files_removed += 1;
            }
        }
        if self.progress.files_removed > 0 {
            remove_empty_dirs(self.destination)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::metadata::modified_at;
    use filetime::FileTime;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        source: PathBuf,
        destination: PathBuf,
    }

    fn fixture() -> std::io::Result<Fixture> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("world");
        let destination = temp_dir.path().join("world [Do not load - Backup is in progress]");
        fs::create_dir_all(source.join("chunkdata"))?;
        fs::write(source.join("map_p.bin"), b"player")?;
        fs::write(source.join("chunkdata/0_0.bin"), b"chunk")?;
        pin_mtime(&source, 1_650_000_000)?;
        Ok(Fixture {
            _temp_dir: temp_dir,
            source,
            destination,
        })
    }

    fn pin_mtime(path: &Path, seconds: i64) -> std::io::Result<()> {
        filetime::set_file_mtime(path, FileTime::from_unix_time(seconds, 0))
    }

    fn copy_all(fx: &Fixture, previous: Option<&BackupSlot>) -> Result<(bool, Vec<FileSnapshot>)> {
        let captured = modified_at(&fx.source)?;
        let mut copy = IncrementalCopy::new(&fx.source, &fx.destination, captured, previous);
        let copied = copy.run(|_, _| {})?;
        Ok((copied, copy.into_snapshots()))
    }

    #[test]
    fn test_full_copy_of_nested_tree() -> Result<()> {
        let fx = fixture()?;

        let (copied, snapshots) = copy_all(&fx, None)?;

        assert!(copied);
        let keys: Vec<_> = snapshots.iter().map(|s| s.relative_path.as_str()).collect();
        assert_eq!(keys, vec!["chunkdata/0_0.bin", "map_p.bin"]);
        assert_eq!(fs::read(fx.destination.join("chunkdata/0_0.bin"))?, b"chunk");
        assert_eq!(
            snapshots[1].modified_at,
            modified_at(&fx.source.join("map_p.bin"))?
        );
        Ok(())
    }

    #[test]
    fn test_unchanged_files_are_not_rewritten() -> Result<()> {
        let fx = fixture()?;
        let (_, snapshots) = copy_all(&fx, None)?;
        let previous = BackupSlot::completed("world", modified_at(&fx.source)?, snapshots);

        // Tamper with the backup copy: a rewrite would restore the original bytes
        fs::write(fx.destination.join("map_p.bin"), b"untouched")?;

        let (copied, snapshots) = copy_all(&fx, Some(&previous))?;

        assert!(!copied);
        assert_eq!(snapshots, previous.snapshots);
        assert_eq!(fs::read(fx.destination.join("map_p.bin"))?, b"untouched");
        Ok(())
    }

    #[test]
    fn test_changed_file_is_copied_again() -> Result<()> {
        let fx = fixture()?;
        let (_, snapshots) = copy_all(&fx, None)?;
        let previous = BackupSlot::completed("world", modified_at(&fx.source)?, snapshots);

        fs::write(fx.source.join("map_p.bin"), b"player v2")?;
        filetime::set_file_mtime(
            fx.source.join("map_p.bin"),
            FileTime::from_unix_time(1_700_000_000, 0),
        )?;
        pin_mtime(&fx.source, 1_650_000_500)?;

        let (copied, snapshots) = copy_all(&fx, Some(&previous))?;

        assert!(copied);
        assert_eq!(fs::read(fx.destination.join("map_p.bin"))?, b"player v2");
        let map = snapshots.iter().find(|s| s.relative_path == "map_p.bin").unwrap();
        assert_eq!(map.modified_at.timestamp(), 1_700_000_000);
        Ok(())
    }

    #[test]
    fn test_source_mutation_aborts_attempt() -> Result<()> {
        let fx = fixture()?;
        let captured = modified_at(&fx.source)?;
        let source = fx.source.clone();

        let mut copy = IncrementalCopy::new(&fx.source, &fx.destination, captured, None);
        let result = copy.run(|progress, _| {
            if progress.files_processed == 0 {
                fs::write(source.join("autosave.bin"), b"new").unwrap();
                pin_mtime(&source, 1_650_000_900).unwrap();
            }
        });

        assert!(matches!(result, Err(AgentError::SourceModified(_))));
        assert!(copy.into_snapshots().is_empty());
        Ok(())
    }

    #[test]
    fn test_stale_files_removed_from_recycled_folder() -> Result<()> {
        let fx = fixture()?;
        fs::create_dir_all(fx.destination.join("old/nested"))?;
        fs::write(fx.destination.join("old/nested/gone.bin"), b"stale")?;

        let mut copy = IncrementalCopy::new(&fx.source, &fx.destination, modified_at(&fx.source)?, None);
        copy.run(|_, _| {})?;

        assert_eq!(copy.progress().files_removed, 1);
        assert!(!fx.destination.join("old").exists());
        assert!(fx.destination.join("map_p.bin").exists());
        Ok(())
    }

    #[test]
    fn test_file_replaced_by_directory() -> Result<()> {
        let fx = fixture()?;
        fs::create_dir_all(&fx.destination)?;
        fs::write(fx.destination.join("map_p.bin"), b"old")?;
        fs::remove_file(fx.source.join("map_p.bin"))?;
        fs::create_dir(fx.source.join("map_p.bin"))?;
        fs::write(fx.source.join("map_p.bin/0.bin"), b"split")?;
        pin_mtime(&fx.source, 1_650_000_000)?;

        let (copied, snapshots) = copy_all(&fx, None)?;

        assert!(copied);
        assert_eq!(fs::read(fx.destination.join("map_p.bin/0.bin"))?, b"split");
        let keys: Vec<_> = snapshots.iter().map(|s| s.relative_path.as_str()).collect();
        assert_eq!(keys, vec!["chunkdata/0_0.bin", "map_p.bin/0.bin"]);
        Ok(())
    }

    #[test]
    fn test_directory_replaced_by_file() -> Result<()> {
        let fx = fixture()?;
        fs::create_dir_all(fx.destination.join("players/1"))?;
        fs::write(fx.destination.join("players/1/p.bin"), b"old")?;
        fs::write(fx.source.join("players"), b"merged")?;
        pin_mtime(&fx.source, 1_650_000_000)?;

        let (copied, _) = copy_all(&fx, None)?;

        assert!(copied);
        assert!(fx.destination.join("players").is_file());
        assert_eq!(fs::read(fx.destination.join("players"))?, b"merged");
        Ok(())
    }

    #[test]
    fn test_missing_source() -> Result<()> {
        let fx = fixture()?;
        let captured = modified_at(&fx.source)?;
        fs::remove_dir_all(&fx.source)?;

        let mut copy = IncrementalCopy::new(&fx.source, &fx.destination, captured, None);
        assert!(matches!(copy.run(|_, _| {}), Err(AgentError::SourceMissing(_))));
        Ok(())
    }
}
