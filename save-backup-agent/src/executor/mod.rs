//! Backup engine - drives discovery, slot rotation and incremental copies.
//!
//! Each changed save goes through attempts until one ends in success or in
//! "skipped" (nothing needed copying). A failed attempt keeps its slot in
//! progress, waits `retry_delay` and tries again; only the save disappearing
//! or a shutdown request ends the loop early.
//!
//! Metadata is persisted right after a slot is claimed and again after every
//! attempt, so a crash at any point leaves an in-progress slot that the next
//! run resumes.

pub mod copier;

use crate::discovery;
use crate::fs::metadata::{dir_modified_at, modified_at};
use crate::models::{folder_name, BackupSet, BackupSlot, SaveKey, SaveRecord};
use crate::store::MetadataStore;
use crate::transfer::progress::CopyProgress;
use crate::utils::errors::{AgentError, Result};
use copier::IncrementalCopy;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Granularity of cancellation checks while waiting between attempts.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Terminal result of one attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// At least one file was copied.
    Success,
    /// Every file already matched the reused slot.
    Skipped,
}

/// How the backup of one save ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    BackedUp,
    Skipped,
    /// The save folder vanished; its record was dropped.
    Deregistered,
    /// Shutdown was requested before an attempt succeeded.
    Cancelled,
}

/// What one discovery + backup pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub backed_up: usize,
    pub skipped: usize,
    pub deregistered: Vec<SaveKey>,
    pub cancelled: bool,
}

impl PassSummary {
    pub fn any_backed_up(&self) -> bool {
        self.backed_up > 0
    }
}

/// Where a pass stands, reported before each file is copied.
pub struct FileProgress<'a> {
    pub key: &'a SaveKey,
    /// Position of the save among the changed saves of this pass.
    pub index: usize,
    pub total: usize,
    pub copy: &'a CopyProgress,
    pub file: &'a str,
}

type ProgressHandler = Box<dyn FnMut(&FileProgress<'_>) + Send>;

fn log_progress(progress: &FileProgress<'_>) {
    info!(
        "Backing up saves {}/{} {}: {}%, {}",
        progress.index + 1,
        progress.total,
        progress.key,
        progress.copy.percent(),
        progress.file
    );
}

/// Owns the Backup Set and keeps it persisted.
pub struct BackupEngine {
    set: BackupSet,
    store: MetadataStore,
    retry_delay: Duration,
    cancel_token: CancellationToken,
    on_progress: ProgressHandler,
}

impl BackupEngine {
    pub fn new(set: BackupSet, store: MetadataStore, retry_delay: Duration) -> Self {
        Self::with_cancel(set, store, retry_delay, CancellationToken::new())
    }

    pub fn with_cancel(
        set: BackupSet,
        store: MetadataStore,
        retry_delay: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            set,
            store,
            retry_delay,
            cancel_token,
            on_progress: Box::new(log_progress),
        }
    }

    /// Replaces the default progress logging.
    pub fn on_progress<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&FileProgress<'_>) + Send + 'static,
    {
        self.on_progress = Box::new(handler);
        self
    }

    pub fn backup_set(&self) -> &BackupSet {
        &self.set
    }

    /// Forget vanished saves, then back up every changed one, one at a time.
    pub fn run_pass(&mut self) -> Result<PassSummary> {
        let mut summary = PassSummary {
            deregistered: discovery::prune_missing_saves(&mut self.set),
            ..PassSummary::default()
        };
        for key in &summary.deregistered {
            warn!(save = %key, "Save no longer exists, dropping its backup history (backup folders are kept)");
        }
        if !summary.deregistered.is_empty() {
            self.persist()?;
        }

        let changed = discovery::find_changed_saves(&self.set);
        let total = changed.len();

        for (index, key) in changed.iter().enumerate() {
            match self.backup_save(key, index, total)? {
                SaveOutcome::BackedUp => summary.backed_up += 1,
                SaveOutcome::Skipped => summary.skipped += 1,
                SaveOutcome::Deregistered => summary.deregistered.push(key.clone()),
                SaveOutcome::Cancelled => {
                    summary.cancelled = true;
                    break;
                }
            }
        }

        Ok(summary)
    }

    /// Back up one save, retrying failed attempts until one completes.
    ///
    /// Only persistence failures are returned as errors; everything that goes
    /// wrong inside an attempt is retried.
    pub fn backup_save(&mut self, key: &SaveKey, index: usize, total: usize) -> Result<SaveOutcome> {
        loop {
            if self.cancel_token.is_cancelled() {
                return Ok(SaveOutcome::Cancelled);
            }

            if matches!(dir_modified_at(&self.set.save_path(key)), Ok(None)) {
                if self.set.remove(key).is_some() {
                    self.persist()?;
                }
                warn!(save = %key, "Save disappeared, dropping its backup history (backup folders are kept)");
                return Ok(SaveOutcome::Deregistered);
            }

            match self.attempt(key, index, total) {
                Ok(AttemptOutcome::Success) => return Ok(SaveOutcome::BackedUp),
                Ok(AttemptOutcome::Skipped) => return Ok(SaveOutcome::Skipped),
                Err(e @ AgentError::Metadata(_)) => return Err(e),
                Err(e) => {
                    warn!(save = %key, "Can't complete backup: {}", e);
                    info!("Retrying in {} seconds...", self.retry_delay.as_secs());
                    if !self.wait_retry_delay() {
                        return Ok(SaveOutcome::Cancelled);
                    }
                }
            }
        }
    }

    /// One attempt: claim a slot, copy into it, then promote it or record the
    /// failure.
    pub fn attempt(&mut self, key: &SaveKey, index: usize, total: usize) -> Result<AttemptOutcome> {
        let source_path = self.set.save_path(key);
        let source_modified_at = modified_at(&source_path)?;
        let max_slots = self.set.max_slots_per_save;

        let in_progress_folder = folder_name::in_progress(&key.save);
        let in_progress_path = self.set.backup_path(key, &in_progress_folder);

        // Metadata and disk can disagree after manual deletions: a slot whose
        // folder is gone is not reused
        let candidate = self
            .set
            .get_or_insert(key)
            .select_slot_to_reuse(max_slots)
            .cloned();
        let reused =
            candidate.filter(|slot| self.set.backup_path(key, &slot.folder_name).is_dir());

        if let Some(slot) = &reused {
            if slot.folder_name != in_progress_folder {
                let reused_path = self.set.backup_path(key, &slot.folder_name);
                debug!(save = %key, "Recycling backup folder {}", slot.folder_name);
                replace_dir(&reused_path, &in_progress_path)?;
            }
        }

        let carried = reused
            .as_ref()
            .map(|slot| slot.snapshots.clone())
            .unwrap_or_default();
        self.record_mut(key)?
            .begin(BackupSlot::in_progress(&key.save, carried), max_slots);
        self.persist()?;

        let mut copy = IncrementalCopy::new(
            &source_path,
            &in_progress_path,
            source_modified_at,
            reused.as_ref(),
        );
        let on_progress = &mut self.on_progress;
        let result = copy.run(|progress, file| {
            (*on_progress)(&FileProgress {
                key,
                index,
                total,
                copy: progress,
                file,
            });
        });
        let summary = copy.progress().summary();
        let snapshots = copy.into_snapshots();

        let outcome = match result {
            Ok(true) => AttemptOutcome::Success,
            Ok(false) => AttemptOutcome::Skipped,
            Err(e) => {
                self.record_mut(key)?.fail(snapshots, source_modified_at);
                self.persist()?;
                return Err(e);
            }
        };

        let completed = BackupSlot::completed(&key.save, source_modified_at, snapshots);
        let completed_path = self.set.backup_path(key, &completed.folder_name);
        if let Err(e) = replace_dir(&in_progress_path, &completed_path) {
            let snapshots = completed.snapshots;
            self.record_mut(key)?.fail(snapshots, source_modified_at);
            self.persist()?;
            return Err(e);
        }

        info!(save = %key, folder = %completed.folder_name, "Backup completed: {}", summary);
        self.record_mut(key)?.complete(completed);
        self.persist()?;

        Ok(outcome)
    }

    fn record_mut(&mut self, key: &SaveKey) -> Result<&mut SaveRecord> {
        self.set
            .record_mut(key)
            .ok_or_else(|| AgentError::Metadata(format!("no record for save {}", key)))
    }

    fn persist(&self) -> Result<()> {
        self.store
            .save(&self.set)
            .map_err(|e| AgentError::Metadata(format!("cannot write {}: {}", self.store.path().display(), e)))
    }

    /// Sleeps for the retry delay. Returns false if shutdown was requested.
    fn wait_retry_delay(&self) -> bool {
        let deadline = Instant::now() + self.retry_delay;
        while Instant::now() < deadline {
            if self.cancel_token.is_cancelled() {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            std::thread::sleep(remaining.min(CANCEL_POLL_INTERVAL));
        }
        !self.cancel_token.is_cancelled()
    }
}

/// Move `from` to `to`, deleting whatever occupies `to` first.
fn replace_dir(from: &Path, to: &Path) -> Result<()> {
    if from == to {
        return Ok(());
    }
    if to.exists() {
        fs::remove_dir_all(to)?;
    }
    fs::rename(from, to)?;
    Ok(())
}
