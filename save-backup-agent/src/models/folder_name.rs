//! Naming convention for backup folders living next to the saves they back up.
//!
//! - in progress: `<save> [Do not load - Backup is in progress]`
//! - completed:   `<save> [Backup-yyyy_MM_dd-HH_mm_ss]`
//!
//! Completed names carry the source folder's modification time in the local
//! time zone, second resolution.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

const IN_PROGRESS_SUFFIX: &str = " [Do not load - Backup is in progress]";
const COMPLETED_PREFIX: &str = " [Backup-";
const COMPLETED_SUFFIX: &str = "]";
const TIMESTAMP_FORMAT: &str = "%Y_%m_%d-%H_%M_%S";

/// Folder name used while a backup of `save_folder` is being written.
pub fn in_progress(save_folder: &str) -> String {
    format!("{save_folder}{IN_PROGRESS_SUFFIX}")
}

/// Folder name of a finished backup taken against `source_modified_at`.
pub fn completed(save_folder: &str, source_modified_at: DateTime<Utc>) -> String {
    let stamp = source_modified_at
        .with_timezone(&Local)
        .format(TIMESTAMP_FORMAT);
    format!("{save_folder}{COMPLETED_PREFIX}{stamp}{COMPLETED_SUFFIX}")
}

pub fn is_in_progress(folder_name: &str) -> bool {
    folder_name.ends_with(IN_PROGRESS_SUFFIX) && folder_name.len() > IN_PROGRESS_SUFFIX.len()
}

/// Split a completed folder name into its save folder and timestamp.
pub fn parse_completed(folder_name: &str) -> Option<(&str, DateTime<Utc>)> {
    let inner = folder_name.strip_suffix(COMPLETED_SUFFIX)?;
    let (save_folder, stamp) = inner.rsplit_once(COMPLETED_PREFIX)?;
    if save_folder.is_empty() {
        return None;
    }

    let naive = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
    let local = Local.from_local_datetime(&naive).earliest()?;
    Some((save_folder, local.with_timezone(&Utc)))
}

/// Whether a directory name belongs to a backup rather than to a save,
/// tracked or not.
pub fn is_backup_folder(folder_name: &str) -> bool {
    is_in_progress(folder_name) || parse_completed(folder_name).is_some()
}
