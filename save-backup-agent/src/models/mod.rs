//! Backup metadata model: the Backup Set, its Save Records, their slots and
//! the per-file snapshots inside each slot.

pub mod folder_name;
pub mod record;
pub mod set;
pub mod slot;
pub mod snapshot;

pub use record::SaveRecord;
pub use set::{BackupSet, SaveKey};
pub use slot::BackupSlot;
pub use snapshot::FileSnapshot;
