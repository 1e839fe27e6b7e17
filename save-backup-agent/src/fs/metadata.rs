//! Modification-time probes.
//!
//! Change detection is driven entirely by timestamps: a save folder's own
//! mtime decides whether it needs a backup, and each file's mtime decides
//! whether it needs copying.

use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;

/// Last modification time of a file or directory.
pub fn modified_at(path: &Path) -> std::io::Result<DateTime<Utc>> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(DateTime::<Utc>::from(modified))
}

/// Last modification time of a directory, or `None` when it does not exist
/// (or is not a directory).
pub fn dir_modified_at(path: &Path) -> std::io::Result<Option<DateTime<Utc>>> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(Some(DateTime::<Utc>::from(metadata.modified()?))),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_modified_at_follows_filetime() -> std::io::Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        temp_file.write_all(b"test content")?;
        temp_file.flush()?;

        filetime::set_file_mtime(temp_file.path(), FileTime::from_unix_time(1_700_000_000, 0))?;

        let modified = modified_at(temp_file.path())?;
        assert_eq!(modified.timestamp(), 1_700_000_000);

        Ok(())
    }

    #[test]
    fn test_dir_modified_at() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("file.bin");
        fs::write(&file, b"x")?;

        assert!(dir_modified_at(temp_dir.path())?.is_some());
        assert!(dir_modified_at(&file)?.is_none());
        assert!(dir_modified_at(&temp_dir.path().join("missing"))?.is_none());

        Ok(())
    }
}
