//! Quarantine moves.
//!
//! A quarantined duplicate keeps its file name and lands in a session
//! directory. An existing file of the same name is never overwritten: the
//! move is refused and both files stay where they are.
//!
//! The destination is claimed with a hard link, which fails atomically when
//! the name is taken, so concurrent moves of same-named files cannot replace
//! each other. The source is unlinked only after the claim succeeded.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type for quarantine moves.
#[derive(Debug, Error)]
pub enum MoveError {
    /// The source file does not exist.
    #[error("source not found: {0}")]
    NotFound(PathBuf),

    /// The source path has no file name component.
    #[error("no file name in {0}")]
    NoFileName(PathBuf),

    /// A file with the same name already sits in the quarantine directory.
    #[error("destination already exists: {0}")]
    DestinationExists(PathBuf),

    /// The quarantine directory could not be created.
    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Renaming (or copying across filesystems) failed.
    #[error("cannot move {from} to {to}: {source}")]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Create `dir` and any missing parents.
///
/// # Errors
///
/// Returns [`MoveError::CreateDir`] when creation fails.
pub fn ensure_dir(dir: &Path) -> Result<(), MoveError> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|source| MoveError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    log::info!("Created directory {}", dir.display());
    Ok(())
}

/// Move `src` into `dir`, keeping its file name.
///
/// Returns the new location.
///
/// # Errors
///
/// Fails without touching either file when the destination name is taken.
pub fn move_to(src: &Path, dir: &Path) -> Result<PathBuf, MoveError> {
    let file_name = src
        .file_name()
        .ok_or_else(|| MoveError::NoFileName(src.to_path_buf()))?;
    if fs::symlink_metadata(src).is_err() {
        return Err(MoveError::NotFound(src.to_path_buf()));
    }

    ensure_dir(dir)?;
    let dest = dir.join(file_name);
    if fs::symlink_metadata(&dest).is_ok() {
        log::warn!(
            "Not moving {}: {} already exists",
            src.display(),
            dest.display()
        );
        return Err(MoveError::DestinationExists(dest));
    }

    match fs::hard_link(src, &dest) {
        Ok(()) => unlink_source(src, &dest)?,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            log::warn!(
                "Not moving {}: {} was taken concurrently",
                src.display(),
                dest.display()
            );
            return Err(MoveError::DestinationExists(dest));
        }
        Err(e) if needs_copy(&e) => copy_then_remove(src, &dest)?,
        Err(source) => {
            return Err(MoveError::Io {
                from: src.to_path_buf(),
                to: dest,
                source,
            })
        }
    }

    log::info!("Moved {} to {}", src.display(), dest.display());
    Ok(dest)
}

/// Link failures that the copy fallback can still handle without overwriting.
fn needs_copy(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::CrossesDevices | io::ErrorKind::Unsupported | io::ErrorKind::PermissionDenied
    )
}

/// Drop the source name once `dest` links to the same file. On failure the
/// new link is removed again so the file stays only at its source.
fn unlink_source(src: &Path, dest: &Path) -> Result<(), MoveError> {
    fs::remove_file(src).map_err(|source| {
        let _ = fs::remove_file(dest);
        MoveError::Io {
            from: src.to_path_buf(),
            to: dest.to_path_buf(),
            source,
        }
    })
}

/// Fallback when linking is impossible. `create_new` keeps the no-overwrite
/// rule even if the destination appears between the check and the copy.
fn copy_then_remove(src: &Path, dest: &Path) -> Result<(), MoveError> {
    let io_err = |source| MoveError::Io {
        from: src.to_path_buf(),
        to: dest.to_path_buf(),
        source,
    };

    let mut reader = fs::File::open(src).map_err(io_err)?;
    let mut writer = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                MoveError::DestinationExists(dest.to_path_buf())
            } else {
                io_err(e)
            }
        })?;

    if let Err(e) = io::copy(&mut reader, &mut writer).and_then(|_| writer.sync_all()) {
        drop(writer);
        let _ = fs::remove_file(dest);
        return Err(io_err(e));
    }
    fs::remove_file(src).map_err(io_err)
}
