//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//!
//! This module provides the [`Hasher`] struct for computing BLAKE3 hashes
//! of file contents using memory-efficient streaming, plus the exact
//! byte-for-byte comparison that confirms a duplicate after two digests match.
//!
//! Files are read in [`CHUNK_SIZE`] pieces; a file is never loaded into
//! memory as a whole.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::HashError;

/// A BLAKE3 digest.
pub type Hash = [u8; 32];

/// Size of each read when streaming a file.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Streaming content hasher and comparator.
#[derive(Debug, Clone, Default)]
pub struct Hasher {
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Hasher {
    /// Create a new hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shutdown flag.
    ///
    /// While the flag is raised, reads are abandoned between chunks with
    /// [`HashError::Interrupted`].
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn check_shutdown(&self, path: &Path) -> Result<(), HashError> {
        if self
            .shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
        {
            return Err(HashError::Interrupted(path.to_path_buf()));
        }
        Ok(())
    }

    /// Compute the digest of a file's full content.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn digest(&self, path: &Path) -> Result<Hash, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut hasher = blake3::Hasher::new();
        let mut buffer = [0u8; CHUNK_SIZE];

        loop {
            self.check_shutdown(path)?;
            let read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };
            hasher.update(&buffer[..read]);
        }

        Ok(*hasher.finalize().as_bytes())
    }

    /// Compare two files byte for byte.
    ///
    /// Returns `false` immediately when the lengths differ.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if either file cannot be opened or read.
    pub fn content_equals(&self, a: &Path, b: &Path) -> Result<bool, HashError> {
        let mut file_a = File::open(a).map_err(|e| HashError::from_io(a, e))?;
        let mut file_b = File::open(b).map_err(|e| HashError::from_io(b, e))?;

        let len_a = file_a.metadata().map_err(|e| HashError::from_io(a, e))?.len();
        let len_b = file_b.metadata().map_err(|e| HashError::from_io(b, e))?.len();
        if len_a != len_b {
            return Ok(false);
        }

        let mut buf_a = [0u8; CHUNK_SIZE];
        let mut buf_b = [0u8; CHUNK_SIZE];
        loop {
            self.check_shutdown(a)?;
            let read_a = fill(&mut file_a, &mut buf_a).map_err(|e| HashError::from_io(a, e))?;
            let read_b = fill(&mut file_b, &mut buf_b).map_err(|e| HashError::from_io(b, e))?;
            if read_a != read_b || buf_a[..read_a] != buf_b[..read_b] {
                return Ok(false);
            }
            if read_a == 0 {
                return Ok(true);
            }
        }
    }
}

/// Read until `buf` is full or the stream ends; returns the bytes read.
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

/// Render a hash as lowercase hex.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}
