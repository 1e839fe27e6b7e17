//! Per-save backup history and the rotation rules applied to it.
//!
//! Slots are kept oldest first. At most one slot is in progress and it is
//! always the last one; the rotation functions below take the current list
//! and return the next one so that this holds after every step.

use super::set::SaveKey;
use super::slot::BackupSlot;
use super::snapshot::FileSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecord {
    pub location_folder: String,
    pub save_folder: String,

    /// Source folder timestamp of the last completed backup.
    #[serde(default)]
    pub last_backed_up_source_modified_at: Option<DateTime<Utc>>,

    #[serde(default)]
    in_progress: bool,

    #[serde(default)]
    slots: Vec<BackupSlot>,
}

impl SaveRecord {
    pub fn new(key: &SaveKey) -> Self {
        Self {
            location_folder: key.location.clone(),
            save_folder: key.save.clone(),
            last_backed_up_source_modified_at: None,
            in_progress: false,
            slots: Vec::new(),
        }
    }

    pub fn key(&self) -> SaveKey {
        SaveKey::new(&self.location_folder, &self.save_folder)
    }

    pub fn slots(&self) -> &[BackupSlot] {
        &self.slots
    }

    pub fn last_slot(&self) -> Option<&BackupSlot> {
        self.slots.last()
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    /// Slot whose folder the next attempt should overwrite, if any.
    ///
    /// An unfinished backup is resumed in place; otherwise history grows until
    /// `max_slots` and then the oldest slot is recycled.
    pub fn select_slot_to_reuse(&self, max_slots: usize) -> Option<&BackupSlot> {
        if self.in_progress {
            return self.slots.last();
        }
        if self.slots.len() < max_slots {
            return None;
        }
        self.slots.first()
    }

    /// Registers `slot` as the in-progress tail.
    pub fn begin(&mut self, slot: BackupSlot, max_slots: usize) {
        let slots = std::mem::take(&mut self.slots);
        self.set_slots(claim(slots, slot, max_slots));
    }

    /// Replaces the in-progress tail with the finished slot.
    pub fn complete(&mut self, slot: BackupSlot) {
        if let Some(at) = slot.source_modified_at {
            self.last_backed_up_source_modified_at = Some(at);
        }
        let slots = std::mem::take(&mut self.slots);
        self.set_slots(finish(slots, slot));
    }

    /// Keeps the in-progress tail after a failed attempt, with whatever was
    /// copied before the failure.
    pub fn fail(&mut self, snapshots: Vec<FileSnapshot>, source_modified_at: DateTime<Utc>) {
        let mut slot = BackupSlot::in_progress(&self.save_folder, snapshots);
        slot.source_modified_at = Some(source_modified_at);
        let slots = std::mem::take(&mut self.slots);
        self.set_slots(replace_tail(slots, slot));
    }

    /// Restores the slot invariants on a record read from disk.
    pub fn normalize(&mut self) {
        let slots = std::mem::take(&mut self.slots);
        self.set_slots(normalize(slots));
    }

    fn set_slots(&mut self, slots: Vec<BackupSlot>) {
        self.in_progress = slots.last().is_some_and(BackupSlot::is_in_progress);
        self.slots = slots;
    }
}

/// Appends an in-progress slot, replacing a previous in-progress tail. The
/// oldest slots are evicted until the new one fits in `max_slots`.
pub fn claim(mut slots: Vec<BackupSlot>, slot: BackupSlot, max_slots: usize) -> Vec<BackupSlot> {
    if slots.last().is_some_and(BackupSlot::is_in_progress) {
        slots.pop();
    }
    let keep = max_slots.saturating_sub(1);
    if slots.len() > keep {
        slots.drain(..slots.len() - keep);
    }
    slots.push(slot);
    slots
}

/// Swaps the in-progress tail for a completed slot. Any older slot pointing at
/// the same folder is dropped, its folder having just been replaced on disk.
pub fn finish(mut slots: Vec<BackupSlot>, slot: BackupSlot) -> Vec<BackupSlot> {
    if slots.last().is_some_and(BackupSlot::is_in_progress) {
        slots.pop();
    }
    slots.retain(|existing| existing.folder_name != slot.folder_name);
    slots.push(slot);
    slots
}

/// Replaces the in-progress tail, or appends when there is none.
pub fn replace_tail(mut slots: Vec<BackupSlot>, slot: BackupSlot) -> Vec<BackupSlot> {
    if slots.last().is_some_and(BackupSlot::is_in_progress) {
        slots.pop();
    }
    slots.push(slot);
    slots
}

/// Drops in-progress slots that are not the tail.
pub fn normalize(slots: Vec<BackupSlot>) -> Vec<BackupSlot> {
    let last = slots.len().saturating_sub(1);
    slots
        .into_iter()
        .enumerate()
        .filter(|(index, slot)| *index == last || !slot.is_in_progress())
        .map(|(_, slot)| slot)
        .collect()
}
