//! Directory walker implementation using walkdir for sequential traversal.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for enumerating the regular
//! files under one root directory. Each root is walked by a single worker,
//! depth-first, with directory entries sorted by file name so that two walks
//! of an unchanged tree visit files in the same order.
//!
//! # Features
//!
//! - Suffix allow-list filtering via [`SuffixFilter`]
//! - Unreadable directories are treated as empty
//! - Optional symlink following
//! - Graceful shutdown via atomic flag, polled before every entry
//!
//! The counting pass ([`Walker::count`]) and the scanning pass
//! ([`Walker::files`]) share one iterator, so the total reported up front
//! and the number of files later processed are computed by the same rules.
//!
//! # Example
//!
//! ```no_run
//! use dupfinder::scanner::{SuffixFilter, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(
//!     Path::new("/home/user/Downloads"),
//!     SuffixFilter::new(["mp3"]),
//!     WalkerConfig::default(),
//! );
//! println!("{} mp3 files", walker.count());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::{DirEntry, WalkDir};

use super::{FileRecord, SuffixFilter, WalkerConfig};

/// Directory walker for sequential file discovery.
#[derive(Debug, Clone)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Suffix allow-list
    filter: SuffixFilter,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given root.
    ///
    /// Relative roots are resolved against the current directory so that
    /// every yielded record carries an absolute path.
    #[must_use]
    pub fn new(root: &Path, filter: SuffixFilter, config: WalkerConfig) -> Self {
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        Self {
            root,
            filter,
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, iteration stops before the next entry.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Root directory of this walker.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Count qualifying files without hashing anything.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.files().count() as u64
    }

    /// Walk the tree, yielding every qualifying regular file.
    ///
    /// Errors never stop the walk: a directory that cannot be listed
    /// contributes no files, and entries that vanish mid-walk are skipped.
    pub fn files(&self) -> impl Iterator<Item = FileRecord> + '_ {
        if !self.root.is_dir() {
            log::warn!("Not a readable directory, skipping: {}", self.root.display());
        }

        let mut entries = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter();

        std::iter::from_fn(move || loop {
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping at {}", self.root.display());
                return None;
            }

            match entries.next()? {
                Ok(entry) => {
                    if let Some(record) = self.qualify(&entry) {
                        return Some(record);
                    }
                }
                Err(e) => {
                    let path = e.path().unwrap_or(self.root.as_path());
                    if e.io_error()
                        .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
                    {
                        log::debug!("Entry vanished during walk: {}", path.display());
                    } else {
                        log::warn!("Skipping unreadable entry {}: {}", path.display(), e);
                    }
                }
            }
        })
    }

    /// Turn a directory entry into a record if it is a qualifying regular file.
    fn qualify(&self, entry: &DirEntry) -> Option<FileRecord> {
        if !entry.file_type().is_file() {
            return None;
        }

        let record_suffix = super::file_suffix(&entry.file_name().to_string_lossy());
        if !self.filter.accepts(record_suffix.as_deref()) {
            log::trace!("Skipping file due to suffix filter: {}", entry.path().display());
            return None;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                log::debug!("Cannot stat {}: {}", entry.path().display(), e);
                return None;
            }
        };

        Some(FileRecord::new(entry.path().to_path_buf(), metadata.len()))
    }
}
