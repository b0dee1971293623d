//! Scanner module for directory traversal and file hashing.
//!
//! This module provides functionality for:
//! - Sequential, sorted directory walking per root using walkdir
//! - Streaming content digests with BLAKE3
//! - Exact byte-for-byte comparison of candidate duplicates
//! - Suffix (extension) filtering
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: BLAKE3 file hashing (streaming) and content comparison
//!
//! # Example
//!
//! ```no_run
//! use dupfinder::scanner::{SuffixFilter, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let filter = SuffixFilter::new(["jpg", "png"]);
//! let walker = Walker::new(Path::new("."), filter, WalkerConfig::default());
//! for file in walker.files() {
//!     println!("{}: {} bytes", file.path.display(), file.size);
//! }
//! ```

pub mod hasher;
pub mod walker;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

// Re-export main types
pub use hasher::{hash_to_hex, Hash, Hasher, CHUNK_SIZE};
pub use walker::Walker;

/// A regular file discovered during a walk.
///
/// The content digest is computed on first request and cached, including
/// a failed attempt, so a record is never hashed twice.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Absolute path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Lower-cased suffix after the last `.` of the file name
    pub suffix: Option<String>,
    digest: Arc<OnceLock<Option<Hash>>>,
}

impl FileRecord {
    /// Create a record from already known metadata.
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        let suffix = path
            .file_name()
            .and_then(|name| file_suffix(&name.to_string_lossy()));
        Self {
            path,
            size,
            suffix,
            digest: Arc::new(OnceLock::new()),
        }
    }

    /// Build a record by reading the file's metadata.
    ///
    /// Relative paths are resolved against the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the metadata cannot be read or the path
    /// is not a regular file.
    pub fn from_path(path: &Path) -> Result<Self, ScanError> {
        let path = std::path::absolute(path).map_err(|e| ScanError::from_io(path, e))?;
        let metadata = std::fs::metadata(&path).map_err(|e| ScanError::from_io(&path, e))?;
        if !metadata.is_file() {
            return Err(ScanError::NotAFile(path));
        }
        Ok(Self::new(path, metadata.len()))
    }

    /// Content digest of the file, computed on first call.
    ///
    /// Returns `None` when the file could not be read; the failure is
    /// logged once and remembered.
    pub fn digest(&self, hasher: &Hasher) -> Option<Hash> {
        *self.digest.get_or_init(|| match hasher.digest(&self.path) {
            Ok(hash) => Some(hash),
            Err(e @ HashError::Interrupted(_)) => {
                log::debug!("{}", e);
                None
            }
            Err(e) => {
                log::warn!("Failed to hash {}: {}", self.path.display(), e);
                None
            }
        })
    }

    /// Whether the digest has already been attempted.
    #[must_use]
    pub fn is_hashed(&self) -> bool {
        self.digest.get().is_some()
    }
}

/// Extract the lower-cased suffix of a file name.
///
/// The suffix is everything after the last `.`. A name without a dot has
/// no suffix; a trailing dot yields an empty suffix.
///
/// ```
/// use dupfinder::scanner::file_suffix;
///
/// assert_eq!(file_suffix("Photo.JPG").as_deref(), Some("jpg"));
/// assert_eq!(file_suffix("archive.tar.gz").as_deref(), Some("gz"));
/// assert_eq!(file_suffix("README"), None);
/// ```
#[must_use]
pub fn file_suffix(name: &str) -> Option<String> {
    name.rfind('.').map(|idx| name[idx + 1..].to_lowercase())
}

/// Allow-list of file suffixes.
///
/// An empty filter accepts every file, including files without a suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuffixFilter {
    suffixes: BTreeSet<String>,
}

impl SuffixFilter {
    /// Build a filter from raw user input.
    ///
    /// Entries are trimmed, lower-cased and stripped of a leading `.`;
    /// blank entries are dropped.
    #[must_use]
    pub fn new<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes = raw
            .into_iter()
            .filter_map(|s| {
                let s = s.as_ref().trim();
                let s = s.strip_prefix('.').unwrap_or(s).trim();
                (!s.is_empty()).then(|| s.to_lowercase())
            })
            .collect();
        Self { suffixes }
    }

    /// Filter that accepts everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether this filter accepts every suffix.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.suffixes.is_empty()
    }

    /// Check a (pre-normalized) suffix against the allow-list.
    #[must_use]
    pub fn accepts(&self, suffix: Option<&str>) -> bool {
        if self.suffixes.is_empty() {
            return true;
        }
        suffix.is_some_and(|s| self.suffixes.contains(s))
    }

    /// The normalized suffixes, sorted.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.suffixes.iter().map(String::as_str)
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    /// Warning: May revisit files reachable through several links.
    pub follow_symlinks: bool,
}

impl WalkerConfig {
    /// Enable or disable symlink following.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a regular file.
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Classify an I/O error for the given path.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// Errors that can occur during file hashing or comparison.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Reading was abandoned because a shutdown was requested.
    #[error("Interrupted while reading {0}")]
    Interrupted(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error for the given path.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}
