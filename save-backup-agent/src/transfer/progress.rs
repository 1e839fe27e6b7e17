//! File-level progress tracking for one save backup attempt.

use std::time::{Duration, Instant};

/// Progress of copying one save into its backup folder
#[derive(Debug, Clone)]
pub struct CopyProgress {
    /// Total number of files in the save
    pub total_files: usize,

    /// Files looked at so far (copied or not)
    pub files_processed: usize,

    /// Files actually copied
    pub files_copied: usize,

    /// Files skipped because their timestamp matched the reused slot
    pub files_unchanged: usize,

    /// Stale files removed from the backup folder
    pub files_removed: usize,

    /// Bytes copied
    pub bytes_copied: u64,

    /// Current file being processed
    pub current_file: Option<String>,

    started: Instant,
}

impl CopyProgress {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            files_processed: 0,
            files_copied: 0,
            files_unchanged: 0,
            files_removed: 0,
            bytes_copied: 0,
            current_file: None,
            started: Instant::now(),
        }
    }

    pub fn record_copied(&mut self, file_path: &str, bytes: u64) {
        self.current_file = Some(file_path.to_string());
        self.files_processed += 1;
        self.files_copied += 1;
        self.bytes_copied += bytes;
    }

    pub fn record_unchanged(&mut self) {
        self.files_processed += 1;
        self.files_unchanged += 1;
    }

    /// Percentage of files processed (0-100). An empty save counts as done.
    pub fn percent(&self) -> u32 {
        if self.total_files == 0 {
            return 100;
        }
        ((self.files_processed as f64 / self.total_files as f64) * 100.0) as u32
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} copied ({}), {} unchanged, {} removed in {}",
            self.files_copied,
            format_bytes(self.bytes_copied),
            self.files_unchanged,
            self.files_removed,
            format_duration(self.elapsed().as_secs())
        )
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format duration as human-readable string
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}
