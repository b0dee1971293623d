//! Scan listener protocol and terminal progress reporting.
//!
//! This module provides:
//! - [`ScanListener`], the observer interface the finder reports through
//! - [`Listeners`], an ordered subscription list with per-listener failure isolation
//! - [`Progress`], an indicatif-based listener used by the CLI
//!
//! # Delivery
//!
//! Callbacks are invoked synchronously, in registration order, on whichever
//! thread produced the event. `process` and `duplicate` may arrive from
//! several worker threads at once; `finish` arrives exactly once per scan,
//! after every worker is done.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Observer of scan progress and results.
///
/// Every method has an empty default body; implement only what you need.
pub trait ScanListener: Send + Sync {
    /// Called once the counting pass knows how many files qualify.
    fn total_count(&self, _total: u64) {}

    /// Called after each file is processed with the running count.
    fn process(&self, _processed: u64) {}

    /// Called when `duplicate` is confirmed byte-identical to `original`.
    fn duplicate(&self, _original: &Path, _duplicate: &Path) {}

    /// Called once when the scan ends, normally or after a stop.
    fn finish(&self, _processed: u64) {}
}

/// Ordered list of listeners.
///
/// A listener that panics is logged and skipped for that one call; the
/// remaining listeners still receive it and the scan carries on.
#[derive(Default)]
pub struct Listeners {
    inner: RwLock<Vec<Arc<dyn ScanListener>>>,
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.len())
            .finish()
    }
}

impl Listeners {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener.
    pub fn add(&self, listener: Arc<dyn ScanListener>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Report the counted total to every listener.
    pub fn total_count(&self, total: u64) {
        self.each("total_count", |l| l.total_count(total));
    }

    /// Report scan progress to every listener.
    pub fn process(&self, processed: u64) {
        self.each("process", |l| l.process(processed));
    }

    /// Report a confirmed duplicate to every listener.
    pub fn duplicate(&self, original: &Path, duplicate: &Path) {
        self.each("duplicate", |l| l.duplicate(original, duplicate));
    }

    /// Report the end of a session to every listener.
    pub fn finish(&self, processed: u64) {
        self.each("finish", |l| l.finish(processed));
    }

    fn each(&self, event: &str, call: impl Fn(&dyn ScanListener)) {
        // Snapshot so a listener may register another listener without deadlocking.
        let listeners = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for (idx, listener) in listeners.iter().enumerate() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| call(listener.as_ref())));
            if let Err(payload) = result {
                log::error!(
                    "Listener #{} panicked during {}: {}",
                    idx,
                    event,
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic>".to_string()
    }
}

/// Progress reporter using indicatif.
///
/// Shows a spinner until the total is known, then a bar that advances
/// with every processed file.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    duplicates: AtomicU64,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, nothing is drawn.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupfinder::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            None
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_style(counting_style());
            pb.set_message("Counting files");
            pb.enable_steady_tick(Duration::from_millis(100));
            Some(pb)
        };
        Self {
            bar: Mutex::new(bar),
            duplicates: AtomicU64::new(0),
            quiet,
        }
    }

    /// Duplicates reported so far.
    #[must_use]
    pub fn duplicates(&self) -> u64 {
        self.duplicates.load(Ordering::Relaxed)
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if self.quiet {
            return;
        }
        if let Some(ref pb) = *self.bar.lock().unwrap_or_else(PoisonError::into_inner) {
            f(pb);
        }
    }
}

fn counting_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
}

fn scanning_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█>-")
}

impl ScanListener for Progress {
    fn total_count(&self, total: u64) {
        self.with_bar(|pb| {
            pb.set_length(total);
            pb.set_position(0);
            pb.set_style(scanning_style());
            pb.set_message("Scanning");
        });
    }

    fn process(&self, processed: u64) {
        // Workers report out of order; never move the bar backwards.
        self.with_bar(|pb| {
            if processed > pb.position() {
                pb.set_position(processed);
            }
        });
    }

    fn duplicate(&self, _original: &Path, duplicate: &Path) {
        let found = self
            .duplicates
            .fetch_add(1, Ordering::Relaxed)
            + 1;
        self.with_bar(|pb| {
            pb.set_message(format!("{} duplicate(s), last: {}", found, truncate_path(duplicate, 30)));
        });
    }

    fn finish(&self, processed: u64) {
        if let Some(pb) = self
            .bar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            pb.finish_with_message(format!("Scanned {processed} file(s)"));
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &Path, max_len: usize) -> String {
    let full = path.to_string_lossy();
    if full.chars().count() <= max_len {
        return full.into_owned();
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let count = file_name.chars().count();
    if count >= max_len {
        let tail: String = file_name.chars().skip(count + 3 - max_len).collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
