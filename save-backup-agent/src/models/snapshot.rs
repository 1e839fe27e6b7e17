use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One source file as it was when copied into a slot.
///
/// `relative_path` always uses `/` separators so the key stays the same no
/// matter where the source root lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSnapshot {
    pub relative_path: String,
    pub modified_at: DateTime<Utc>,
}

impl FileSnapshot {
    pub fn new(relative_path: impl Into<String>, modified_at: DateTime<Utc>) -> Self {
        Self {
            relative_path: relative_path.into(),
            modified_at,
        }
    }

    /// True when the source file still carries the timestamp recorded here,
    /// meaning its content is assumed unchanged.
    pub fn matches(&self, modified_at: DateTime<Utc>) -> bool {
        self.modified_at == modified_at
    }
}
