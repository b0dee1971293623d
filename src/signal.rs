//! Ctrl+C handling.
//!
//! The process installs one `ctrlc` handler. On interrupt it sets a shared
//! flag and runs the registered interrupt hooks, which the application uses
//! to stop the running scan.
//!
//! ```rust,no_run
//! use dupfinder::signal::install_handler;
//!
//! let handler = install_handler();
//! handler.on_interrupt(|| eprintln!("stopping"));
//! if handler.is_shutdown_requested() {
//!     std::process::exit(dupfinder::signal::EXIT_CODE_INTERRUPTED);
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Exit code for SIGINT (128 + 2).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

type Hook = Box<dyn Fn() + Send + Sync>;

/// Shared interrupt state: a flag plus hooks to run when it is raised.
#[derive(Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
    hooks: Arc<Mutex<Vec<Hook>>>,
}

impl std::fmt::Debug for ShutdownHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownHandler")
            .field("requested", &self.is_shutdown_requested())
            .finish_non_exhaustive()
    }
}

impl ShutdownHandler {
    /// Create a handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an interrupt was received or requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Register a hook to run on interrupt.
    ///
    /// If shutdown was already requested the hook runs immediately.
    pub fn on_interrupt<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut hooks = self.hooks.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_shutdown_requested() {
            hook();
        }
        hooks.push(Box::new(hook));
    }

    /// Raise the flag and run every hook. Only the first request runs hooks.
    pub fn request_shutdown(&self) {
        let hooks = self.hooks.lock().unwrap_or_else(PoisonError::into_inner);
        if self.flag.swap(true, Ordering::SeqCst) {
            return;
        }
        for hook in hooks.iter() {
            hook();
        }
    }

    /// Clone of the shared flag.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Lower the flag and drop every hook.
    pub fn reset(&self) {
        let mut hooks = self.hooks.lock().unwrap_or_else(PoisonError::into_inner);
        hooks.clear();
        self.flag.store(false, Ordering::SeqCst);
    }
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the process-wide Ctrl+C handler, or reuse it if already installed.
///
/// Reuse resets the flag and hooks, so each run starts clean. If `ctrlc`
/// refuses (another handler owns the signal), the returned handler still
/// works for manual [`ShutdownHandler::request_shutdown`] calls.
pub fn install_handler() -> ShutdownHandler {
    let mut fresh = false;
    let handler = GLOBAL_HANDLER.get_or_init(|| {
        fresh = true;
        ShutdownHandler::new()
    });

    if !fresh {
        handler.reset();
        return handler.clone();
    }

    let hooked = handler.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = writeln!(std::io::stderr(), "\nInterrupted. Stopping scan...");
        let _ = std::io::stderr().flush();
        log::info!("Interrupt received");
        hooked.request_shutdown();
    }) {
        log::debug!("Ctrl+C handler not installed: {}", e);
    }
    handler.clone()
}
