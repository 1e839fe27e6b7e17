//! Directory traversal for save folders.
//!
//! Files are reported with a `/`-separated path relative to the walked root,
//! which is the key snapshots are stored under.

use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Information about a file discovered during walking
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Full path to the file
    pub path: PathBuf,

    /// Relative path from the root, `/`-separated
    pub relative_path: String,

    /// File size in bytes
    pub size: u64,

    /// Last modification time
    pub modified: DateTime<Utc>,
}

impl FileInfo {
    fn from_entry(entry: &DirEntry, root: &Path) -> std::io::Result<Self> {
        let metadata = entry.metadata()?;
        let path = entry.path().to_path_buf();
        let relative_path = relative_key(path.strip_prefix(root).unwrap_or(&path));

        Ok(Self {
            path,
            relative_path,
            size: metadata.len(),
            modified: DateTime::<Utc>::from(metadata.modified()?),
        })
    }
}

/// Walk a directory tree and collect all regular files, in a stable
/// (name-sorted) order. Symbolic links are not followed.
///
/// # Example
/// ```no_run
/// use save_backup_agent::fs::walker::walk_directory;
/// use std::path::Path;
///
/// let files = walk_directory(Path::new("/saves/Survivor/world")).unwrap();
/// println!("Found {} files", files.len());
/// ```
pub fn walk_directory(root: &Path) -> std::io::Result<Vec<FileInfo>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;

        // Directories are recreated from file paths when copying
        if !entry.file_type().is_file() {
            continue;
        }

        files.push(FileInfo::from_entry(&entry, root)?);
    }

    Ok(files)
}

/// Remove every directory below `root` that holds no files. `root` itself is
/// kept.
pub fn remove_empty_dirs(root: &Path) -> std::io::Result<usize> {
    let mut removed = 0;

    for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        if std::fs::read_dir(entry.path())?.next().is_none() {
            std::fs::remove_dir(entry.path())?;
            removed += 1;
        }
    }

    Ok(removed)
}

/// Snapshot key for a path relative to a walked root.
pub fn relative_key(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
