//! Scan coordinator.
//!
//! # Overview
//!
//! [`DuplicateFinder`] owns the scan lifecycle:
//! 1. **Count** - walk every root without hashing and report the total
//! 2. **Scan** - one task per root on a bounded worker pool; each task walks
//!    its root in order, offers every file to the session's [`ContentIndex`]
//!    and reports progress and confirmed duplicates to the listeners
//! 3. **Finish** - once the last root task is done, `finish` fires exactly once
//!    and the finder becomes idle again
//!
//! The worker pool is created once per finder and reused by every scan.
//! Roots beyond the pool capacity wait in the pool's queue.
//!
//! # Sessions
//!
//! Each scan gets a fresh session holding its counters, its index
//! and its cancellation flag. The session stays readable after the scan
//! ends and is only replaced when the next scan starts.
//!
//! # Example
//!
//! ```no_run
//! use dupfinder::duplicates::{DuplicateFinder, FinderConfig, ScanMode, ScanRequest};
//!
//! let finder = DuplicateFinder::new(FinderConfig::default()).unwrap();
//! let request = ScanRequest::new(["/home/user/Pictures"], ["jpg", "png"]);
//!
//! finder.scan(&request, ScanMode::Sync);
//!
//! let summary = finder.summary();
//! println!("{} duplicates, {} reclaimable", summary.duplicates, summary.reclaimable_display());
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use super::groups::DuplicateGroup;
use super::index::{ContentIndex, Offer};
use crate::progress::{Listeners, ScanListener};
use crate::scanner::{Hasher, SuffixFilter, Walker, WalkerConfig};

/// Default number of worker threads.
pub const DEFAULT_POOL_SIZE: usize = 20;

/// How [`DuplicateFinder::start`] waits for the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Block the caller until every root is done; `finish` fires on the caller.
    Sync,
    /// Return immediately; `finish` fires on the worker that completes last.
    Async,
}

/// Roots to scan and the suffix allow-list to apply.
///
/// Roots are taken as given: overlapping roots are not merged.
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    /// Root directories, in order
    pub roots: Vec<PathBuf>,
    /// Suffix allow-list (empty accepts everything)
    pub filter: SuffixFilter,
}

impl ScanRequest {
    /// Build a request from roots and raw suffix strings.
    #[must_use]
    pub fn new<R, P, S, T>(roots: R, suffixes: S) -> Self
    where
        R: IntoIterator<Item = P>,
        P: Into<PathBuf>,
        S: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            filter: SuffixFilter::new(suffixes),
        }
    }
}

/// Configuration for the duplicate finder.
#[derive(Debug, Clone)]
pub struct FinderConfig {
    /// Number of worker threads shared by all scans.
    pub pool_size: usize,
    /// Directory walking options.
    pub walker: WalkerConfig,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            walker: WalkerConfig::default(),
        }
    }
}

impl FinderConfig {
    /// Set the worker pool size (at least one).
    #[must_use]
    pub fn with_pool_size(mut self, threads: usize) -> Self {
        self.pool_size = threads.max(1);
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker = config;
        self
    }
}

/// Errors that can occur while setting up the finder.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The worker pool could not be created.
    #[error("Failed to create worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// State of one scan.
#[derive(Debug)]
pub(crate) struct ScanSession {
    filter: SuffixFilter,
    index: ContentIndex,
    cancel: Arc<AtomicBool>,
    processed: AtomicU64,
    duplicates: AtomicU64,
    reclaimable: AtomicU64,
    collisions: AtomicU64,
    unhashable: AtomicU64,
    started: Instant,
    elapsed: Mutex<Option<Duration>>,
}

impl ScanSession {
    fn new(filter: SuffixFilter) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let hasher = Hasher::new().with_shutdown_flag(Arc::clone(&cancel));
        Self {
            filter,
            index: ContentIndex::new(hasher),
            cancel,
            processed: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            reclaimable: AtomicU64::new(0),
            collisions: AtomicU64::new(0),
            unhashable: AtomicU64::new(0),
            started: Instant::now(),
            elapsed: Mutex::new(None),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn elapsed(&self) -> Duration {
        self.elapsed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .unwrap_or_else(|| self.started.elapsed())
    }
}

/// Statistics of the current (or most recent) scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Files reported by the counting pass
    pub total_files: u64,
    /// Files processed by the scan
    pub processed: u64,
    /// Confirmed duplicates reported to listeners
    pub duplicates: u64,
    /// Fingerprint groups holding more than one file
    pub duplicate_groups: usize,
    /// Bytes held by confirmed duplicates
    pub reclaimable_space: u64,
    /// Fingerprint matches whose content differed
    pub collisions: u64,
    /// Files that could not be hashed
    pub unhashable: u64,
    /// Whether the scan was stopped early
    pub interrupted: bool,
    /// Wall-clock duration of the scan
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Human-readable reclaimable space.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        bytesize::ByteSize::b(self.reclaimable_space).to_string()
    }
}

struct Shared {
    config: FinderConfig,
    listeners: Listeners,
    running: AtomicBool,
    total: AtomicU64,
    session: RwLock<Arc<ScanSession>>,
    idle_lock: Mutex<()>,
    idle: Condvar,
}

impl Shared {
    fn current_session(&self) -> Arc<ScanSession> {
        Arc::clone(&self.session.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Walk one root, offering each qualifying file to the session index.
    fn scan_root(&self, session: &ScanSession, root: &Path) {
        log::debug!("Scanning root {}", root.display());
        let walker = Walker::new(root, session.filter.clone(), self.config.walker.clone())
            .with_shutdown_flag(Arc::clone(&session.cancel));

        for record in walker.files() {
            let path = record.path.clone();
            let size = record.size;

            match session.index.offer(record) {
                Offer::Duplicate { original } => {
                    session.duplicates.fetch_add(1, Ordering::SeqCst);
                    session.reclaimable.fetch_add(size, Ordering::SeqCst);
                    log::debug!(
                        "Duplicate: {} == {}",
                        path.display(),
                        original.path.display()
                    );
                    self.listeners.duplicate(&original.path, &path);
                }
                Offer::Collision => {
                    session.collisions.fetch_add(1, Ordering::SeqCst);
                }
                Offer::Unhashable => {
                    if session.is_cancelled() {
                        // Abandoned mid-read by stop(); not processed.
                        break;
                    }
                    session.unhashable.fetch_add(1, Ordering::SeqCst);
                }
                Offer::Unique | Offer::AlreadyIndexed => {}
            }

            let processed = session.processed.fetch_add(1, Ordering::SeqCst) + 1;
            self.listeners.process(processed);
        }
    }

    /// Run a root task, containing any panic to that root.
    fn run_root(&self, session: &ScanSession, root: &Path) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.scan_root(session, root)));
        if result.is_err() {
            log::error!("Worker for {} panicked; root abandoned", root.display());
        }
    }

    /// Fire `finish`, then release the running gate and wake waiters.
    fn complete(&self, session: &ScanSession) {
        *session.elapsed.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(session.started.elapsed());
        let processed = session.processed.load(Ordering::SeqCst);
        log::info!(
            "Scan {}: {} file(s) processed, {} duplicate(s) in {:.2?}",
            if session.is_cancelled() { "stopped" } else { "complete" },
            processed,
            session.duplicates.load(Ordering::SeqCst),
            session.elapsed()
        );

        self.listeners.finish(processed);

        let _guard = self.idle_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.running.store(false, Ordering::SeqCst);
        self.idle.notify_all();
    }
}

/// Duplicate finder that coordinates counting, scanning and notification.
pub struct DuplicateFinder {
    shared: Arc<Shared>,
    pool: rayon::ThreadPool,
}

impl std::fmt::Debug for DuplicateFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateFinder")
            .field("config", &self.shared.config)
            .field("listeners", &self.shared.listeners)
            .field("running", &self.is_running())
            .finish()
    }
}

impl DuplicateFinder {
    /// Create a new duplicate finder and its worker pool.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::ThreadPool`] if the pool cannot be built.
    pub fn new(config: FinderConfig) -> Result<Self, FinderError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.pool_size.max(1))
            .thread_name(|i| format!("dupfinder-worker-{i}"))
            .build()?;

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                listeners: Listeners::new(),
                running: AtomicBool::new(false),
                total: AtomicU64::new(0),
                session: RwLock::new(Arc::new(ScanSession::new(SuffixFilter::all()))),
                idle_lock: Mutex::new(()),
                idle: Condvar::new(),
            }),
            pool,
        })
    }

    /// Create a finder with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::ThreadPool`] if the pool cannot be built.
    pub fn with_defaults() -> Result<Self, FinderError> {
        Self::new(FinderConfig::default())
    }

    /// Register a listener; listeners are notified in registration order.
    pub fn add_listener(&self, listener: Arc<dyn ScanListener>) -> &Self {
        self.shared.listeners.add(listener);
        self
    }

    /// Count qualifying files under every root and report it via `total_count`.
    ///
    /// Does not touch the running state; missing roots count as empty.
    pub fn count(&self, request: &ScanRequest) -> u64 {
        let total: u64 = request
            .roots
            .iter()
            .map(|root| {
                Walker::new(root, request.filter.clone(), self.shared.config.walker.clone())
                    .count()
            })
            .sum();

        log::info!("Counted {} file(s) in {} root(s)", total, request.roots.len());
        self.shared.total.store(total, Ordering::SeqCst);
        self.shared.listeners.total_count(total);
        total
    }

    /// Start a scan.
    ///
    /// Returns `false` without doing anything if a scan is already running.
    pub fn start(&self, request: &ScanRequest, mode: ScanMode) -> bool {
        let session = Arc::new(ScanSession::new(request.filter.clone()));
        {
            // Publishing under the write lock keeps stop() from seeing the
            // running flag paired with the previous session.
            let mut slot = self
                .shared
                .session
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if self
                .shared
                .running
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                log::debug!("Scan already running; start request ignored");
                return false;
            }
            *slot = Arc::clone(&session);
        }

        log::info!(
            "Starting {:?} scan of {} root(s)",
            mode,
            request.roots.len()
        );

        match mode {
            ScanMode::Sync => {
                let shared = &self.shared;
                let session_ref = session.as_ref();
                self.pool.scope(|scope| {
                    for root in &request.roots {
                        scope.spawn(move |_| shared.run_root(session_ref, root));
                    }
                });
                self.shared.complete(&session);
            }
            ScanMode::Async => {
                if request.roots.is_empty() {
                    self.shared.complete(&session);
                    return true;
                }

                let remaining = Arc::new(AtomicUsize::new(request.roots.len()));
                for root in request.roots.iter().cloned() {
                    let shared = Arc::clone(&self.shared);
                    let session = Arc::clone(&session);
                    let remaining = Arc::clone(&remaining);
                    self.pool.spawn(move || {
                        shared.run_root(&session, &root);
                        if remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
                            shared.complete(&session);
                        }
                    });
                }
            }
        }
        true
    }

    /// Count, then start a scan; the sequence a front end normally runs.
    ///
    /// Returns `false` if a scan was already running.
    pub fn scan(&self, request: &ScanRequest, mode: ScanMode) -> bool {
        if self.is_running() {
            log::debug!("Scan already running; scan request ignored");
            return false;
        }
        self.count(request);
        self.start(request, mode)
    }

    /// Ask the running scan to stop.
    ///
    /// Workers halt before their next file; `finish` still fires with the
    /// partial count. Returns `false` if no scan was running.
    pub fn stop(&self) -> bool {
        let session = {
            let slot = self
                .shared
                .session
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if !self.is_running() {
                return false;
            }
            Arc::clone(&slot)
        };
        let was_cancelled = session.cancel.swap(true, Ordering::SeqCst);
        if !was_cancelled {
            log::info!("Stop requested");
        }
        !was_cancelled
    }

    /// Whether a scan is in progress.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Block until no scan is running.
    pub fn wait(&self) {
        let mut guard = self
            .shared
            .idle_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while self.shared.running.load(Ordering::SeqCst) {
            guard = self
                .shared
                .idle
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Files processed by the current session so far.
    #[must_use]
    pub fn processed(&self) -> u64 {
        self.shared.current_session().processed.load(Ordering::SeqCst)
    }

    /// Total reported by the most recent counting pass.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.shared.total.load(Ordering::SeqCst)
    }

    /// Groups of the current session that hold more than one file.
    #[must_use]
    pub fn duplicate_groups(&self) -> Vec<DuplicateGroup> {
        self.shared.current_session().index.duplicate_groups()
    }

    /// Statistics of the current session.
    #[must_use]
    pub fn summary(&self) -> ScanSummary {
        let session = self.shared.current_session();
        ScanSummary {
            total_files: self.total(),
            processed: session.processed.load(Ordering::SeqCst),
            duplicates: session.duplicates.load(Ordering::SeqCst),
            duplicate_groups: session.index.duplicate_groups().len(),
            reclaimable_space: session.reclaimable.load(Ordering::SeqCst),
            collisions: session.collisions.load(Ordering::SeqCst),
            unhashable: session.unhashable.load(Ordering::SeqCst),
            interrupted: session.is_cancelled(),
            scan_duration: session.elapsed(),
        }
    }
}
