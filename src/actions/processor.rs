//! Duplicate action processor.
//!
//! [`DuplicateProcessor`] is a [`ScanListener`] that applies an
//! [`ActionPolicy`] to every confirmed duplicate and journals each step.
//!
//! For one duplicate the journal receives, in order:
//! - `scan/start`
//! - `move/start` then `move/end` (or `move/failed`) under [`ActionPolicy::Move`]
//! - `delete/start` then `delete/end` (or `delete/failed`) under [`ActionPolicy::Delete`]
//! - `scan/end`
//!
//! An action only runs when its `start` entry was written.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use super::delete::{delete_to_trash, DeleteOutcome};
use super::journal::{session_token, Journal, JournalEntry};
use super::quarantine::{ensure_dir, move_to};
use super::{ActionPolicy, ROOT_NAME};
use crate::progress::ScanListener;

const MOVE_DIR_PREFIX: &str = "move.dir";

/// Counters of what the processor did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionStats {
    /// Duplicates reported to the processor
    pub duplicates: u64,
    /// Files moved into quarantine
    pub moved: u64,
    /// Files sent to the trash
    pub trashed: u64,
    /// Files that were already gone when deletion was attempted
    pub already_gone: u64,
    /// Moves or deletions that failed
    pub failed: u64,
    /// Bytes moved or trashed
    pub bytes: u64,
}

#[derive(Debug, Default)]
struct Counters {
    duplicates: AtomicU64,
    moved: AtomicU64,
    trashed: AtomicU64,
    already_gone: AtomicU64,
    failed: AtomicU64,
    bytes: AtomicU64,
}

/// Listener that moves, deletes or just records confirmed duplicates.
#[derive(Debug)]
pub struct DuplicateProcessor {
    policy: ActionPolicy,
    root: PathBuf,
    journal: Option<Journal>,
    move_dir: Mutex<Option<PathBuf>>,
    counters: Counters,
}

impl DuplicateProcessor {
    /// Create a processor storing its journal and quarantine under `root`.
    ///
    /// A journal that cannot be opened is reported and replaced by log
    /// output; actions still run.
    #[must_use]
    pub fn new(policy: ActionPolicy, root: &Path) -> Self {
        let journal = match Journal::open(root, &session_token()) {
            Ok(journal) => Some(journal),
            Err(e) => {
                log::warn!("{}; journal entries will only be logged", e);
                None
            }
        };
        Self {
            policy,
            root: root.to_path_buf(),
            journal,
            move_dir: Mutex::new(None),
            counters: Counters::default(),
        }
    }

    /// The configured policy.
    #[must_use]
    pub fn policy(&self) -> ActionPolicy {
        self.policy
    }

    /// Path of the journal file, if one is open.
    #[must_use]
    pub fn journal_path(&self) -> Option<&Path> {
        self.journal.as_ref().map(Journal::path)
    }

    /// Quarantine directory of the current session, once created.
    #[must_use]
    pub fn move_dir(&self) -> Option<PathBuf> {
        self.move_dir
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of the action counters.
    #[must_use]
    pub fn stats(&self) -> ActionStats {
        let c = &self.counters;
        ActionStats {
            duplicates: c.duplicates.load(Ordering::SeqCst),
            moved: c.moved.load(Ordering::SeqCst),
            trashed: c.trashed.load(Ordering::SeqCst),
            already_gone: c.already_gone.load(Ordering::SeqCst),
            failed: c.failed.load(Ordering::SeqCst),
            bytes: c.bytes.load(Ordering::SeqCst),
        }
    }

    fn record(
        &self,
        kind: &str,
        label: &str,
        first: &Path,
        duplicate: &Path,
        other: Option<String>,
    ) -> bool {
        let entry = JournalEntry::now(kind, label, first, duplicate, other);
        match &self.journal {
            Some(journal) => journal.record(&entry),
            None => {
                log::warn!(
                    "journal: {} {} {} -> {}{}",
                    entry.kind,
                    entry.label,
                    entry.first,
                    entry.duplicate,
                    entry.other.map(|o| format!(" ({o})")).unwrap_or_default()
                );
                true
            }
        }
    }

    /// Quarantine directory for this session, created on first use.
    fn ensure_move_dir(&self) -> Result<PathBuf, super::MoveError> {
        let mut slot = self.move_dir.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(dir) = slot.as_ref() {
            return Ok(dir.clone());
        }
        let dir = self
            .root
            .join(ROOT_NAME)
            .join(format!("{MOVE_DIR_PREFIX}.{}", session_token()));
        ensure_dir(&dir)?;
        *slot = Some(dir.clone());
        Ok(dir)
    }

    fn fail(&self, kind: &str, original: &Path, duplicate: &Path, error: &dyn std::fmt::Display) {
        log::warn!("{} of {} failed: {}", kind, duplicate.display(), error);
        self.counters.failed.fetch_add(1, Ordering::SeqCst);
        self.record(kind, "failed", original, duplicate, Some(error.to_string()));
    }

    fn quarantine(&self, original: &Path, duplicate: &Path) {
        let dir = match self.ensure_move_dir() {
            Ok(dir) => dir,
            Err(e) => return self.fail("move", original, duplicate, &e),
        };
        let dir_label = Some(dir.display().to_string());
        if !self.record("move", "start", original, duplicate, dir_label.clone()) {
            return;
        }

        let size = std::fs::metadata(duplicate).map(|m| m.len()).unwrap_or(0);
        match move_to(duplicate, &dir) {
            Ok(_) => {
                self.counters.moved.fetch_add(1, Ordering::SeqCst);
                self.counters.bytes.fetch_add(size, Ordering::SeqCst);
                self.record("move", "end", original, duplicate, dir_label);
            }
            Err(e) => self.fail("move", original, duplicate, &e),
        }
    }

    fn trash(&self, original: &Path, duplicate: &Path) {
        if !self.record("delete", "start", original, duplicate, None) {
            return;
        }
        match delete_to_trash(duplicate) {
            Ok(DeleteOutcome::Trashed { size }) => {
                self.counters.trashed.fetch_add(1, Ordering::SeqCst);
                self.counters.bytes.fetch_add(size, Ordering::SeqCst);
                self.record("delete", "end", original, duplicate, None);
            }
            Ok(DeleteOutcome::AlreadyGone) => {
                self.counters.already_gone.fetch_add(1, Ordering::SeqCst);
                self.record("delete", "end", original, duplicate, Some("absent".to_string()));
            }
            Err(e) => self.fail("delete", original, duplicate, &e),
        }
    }
}

impl ScanListener for DuplicateProcessor {
    fn duplicate(&self, original: &Path, duplicate: &Path) {
        self.counters.duplicates.fetch_add(1, Ordering::SeqCst);
        let started = self.record("scan", "start", original, duplicate, None);

        if started {
            match self.policy {
                ActionPolicy::Scan => {}
                ActionPolicy::Move => self.quarantine(original, duplicate),
                ActionPolicy::Delete => self.trash(original, duplicate),
            }
        }

        self.record("scan", "end", original, duplicate, None);
    }

    fn finish(&self, processed: u64) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.flush() {
                log::warn!("Journal flush failed for {}: {}", journal.path().display(), e);
            }
        }
        self.move_dir
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let stats = self.stats();
        log::info!(
            "Actions ({}): {} duplicate(s) of {} file(s), {} moved, {} trashed, {} failed",
            self.policy,
            stats.duplicates,
            processed,
            stats.moved,
            stats.trashed,
            stats.failed
        );
    }
}
