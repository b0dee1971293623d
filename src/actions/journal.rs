//! Append-only action journal.
//!
//! One file per processor, named `scan.log.<token>` under
//! `<root>/finder/`, where the token is the local time the processor was
//! created (`yyyyMMddHHmmss`). A journal never reuses an existing file: a
//! second processor in the same second gets `scan.log.<token>.1`, and so on.
//! Each line is one JSON object:
//!
//! ```text
//! {"time":"2024-05-01 10:00:00","type":"move","label":"start","first":"/a/x.txt","duplicate":"/a/y.txt","other":"/root/finder/move.dir.20240501100000"}
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ROOT_NAME;

const LOG_PREFIX: &str = "scan.log";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TOKEN_FORMAT: &str = "%Y%m%d%H%M%S";
const MAX_ATTEMPTS: u32 = 1000;

/// Timestamp token used in journal and quarantine directory names.
#[must_use]
pub fn session_token() -> String {
    chrono::Local::now().format(TOKEN_FORMAT).to_string()
}

/// Error opening the journal.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("cannot open journal {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Local time, `yyyy-MM-dd HH:mm:ss`
    pub time: String,
    /// `scan`, `move` or `delete`
    #[serde(rename = "type")]
    pub kind: String,
    /// `start`, `end` or `failed`
    pub label: String,
    /// Kept file (lossy UTF-8)
    pub first: String,
    /// Duplicate file (lossy UTF-8)
    pub duplicate: String,
    /// Extra context such as the quarantine directory or an error message
    pub other: Option<String>,
}

impl JournalEntry {
    /// Build an entry stamped with the current local time.
    #[must_use]
    pub fn now(kind: &str, label: &str, first: &Path, duplicate: &Path, other: Option<String>) -> Self {
        Self {
            time: chrono::Local::now().format(TIME_FORMAT).to_string(),
            kind: kind.to_string(),
            label: label.to_string(),
            first: first.to_string_lossy().into_owned(),
            duplicate: duplicate.to_string_lossy().into_owned(),
            other,
        }
    }
}

/// Journal writer, safe to share between scan workers.
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl Journal {
    /// Create a fresh `<root>/finder/scan.log.<token>`.
    ///
    /// When that name is taken a numeric suffix is appended, so two
    /// journals never share a file.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Open`] when the directory or file cannot be created.
    pub fn open(root: &Path, token: &str) -> Result<Self, JournalError> {
        let dir = root.join(ROOT_NAME);
        fs::create_dir_all(&dir).map_err(|source| JournalError::Open {
            path: dir.clone(),
            source,
        })?;

        let mut attempt = 0u32;
        loop {
            let name = match attempt {
                0 => format!("{LOG_PREFIX}.{token}"),
                n => format!("{LOG_PREFIX}.{token}.{n}"),
            };
            let path = dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    log::debug!("Journal opened at {}", path.display());
                    return Ok(Self {
                        path,
                        writer: Mutex::new(BufWriter::new(file)),
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempt < MAX_ATTEMPTS => {
                    attempt += 1;
                }
                Err(source) => return Err(JournalError::Open { path, source }),
            }
        }
    }

    /// Location of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry. Returns `false` when the write failed.
    pub fn record(&self, entry: &JournalEntry) -> bool {
        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => {
                log::warn!("Cannot serialize journal entry: {}", e);
                return false;
            }
        };

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        match writeln!(writer, "{line}") {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Journal write to {} failed: {}", self.path.display(), e);
                false
            }
        }
    }

    /// Flush buffered entries to disk.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from flushing or syncing.
    pub fn flush(&self) -> io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.flush()?;
        writer.get_ref().sync_data()
    }
}

impl Drop for Journal {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::warn!("Journal flush on close failed: {}", e);
        }
    }
}

/// Read every entry of a journal file.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read or a line is not a valid entry.
pub fn read_entries(path: &Path) -> io::Result<Vec<JournalEntry>> {
    fs::read_to_string(path)?
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(io::Error::from))
        .collect()
}
