//! Safe file deletion using trash crate.
//!
//! # Overview
//!
//! Duplicates are never unlinked: they are sent to the platform's
//! recoverable trash (Recycle Bin, Finder Trash, or the freedesktop.org
//! trash on Linux). A file that is already gone counts as done.
//!
//! # Example
//!
//! ```no_run
//! use dupfinder::actions::delete::{delete_to_trash, DeleteOutcome};
//! use std::path::Path;
//!
//! match delete_to_trash(Path::new("/path/to/duplicate.txt")) {
//!     Ok(DeleteOutcome::Trashed { size }) => println!("Trashed {size} bytes"),
//!     Ok(DeleteOutcome::AlreadyGone) => println!("Nothing to do"),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// Permission denied when attempting to delete.
    #[error("permission denied: {0} - try running with elevated privileges")]
    PermissionDenied(PathBuf),

    /// The path exists but is not a regular file.
    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed { path: PathBuf, message: String },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::PermissionDenied(p)
            | Self::NotAFile(p)
            | Self::TrashFailed { path: p, .. }
            | Self::Io { path: p, .. } => p,
        }
    }
}

/// What a successful deletion did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The file was moved to the trash.
    Trashed {
        /// Size of the trashed file in bytes
        size: u64,
    },
    /// The file no longer existed.
    AlreadyGone,
}

/// Move a single file to the system trash.
///
/// # Errors
///
/// - `PermissionDenied` if the file cannot be inspected
/// - `NotAFile` if the path is a directory or other non-file
/// - `TrashFailed` if the trash operation fails
pub fn delete_to_trash(path: &Path) -> Result<DeleteOutcome, DeleteError> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("Already gone, nothing to trash: {}", path.display());
            return Ok(DeleteOutcome::AlreadyGone);
        }
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            return Err(DeleteError::PermissionDenied(path.to_path_buf()));
        }
        Err(e) => {
            return Err(DeleteError::Io {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    if !metadata.is_file() {
        return Err(DeleteError::NotAFile(path.to_path_buf()));
    }
    let size = metadata.len();

    trash::delete(path).map_err(|e| {
        log::error!("Trash operation failed for {}: {}", path.display(), e);
        DeleteError::TrashFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    log::info!("Moved to trash: {} ({} bytes)", path.display(), size);
    Ok(DeleteOutcome::Trashed { size })
}
