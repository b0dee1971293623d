//! Fingerprints and duplicate groups.
//!
//! # Overview
//!
//! A [`Fingerprint`] buckets files that *may* be identical: same suffix,
//! same size, same content digest. Files sharing a fingerprint form a
//! [`DuplicateGroup`] in discovery order; the first member is the one that
//! is kept, later members are candidates for action.
//!
//! # Example
//!
//! ```
//! use dupfinder::duplicates::Fingerprint;
//!
//! let fp = Fingerprint::new(Some("txt".to_string()), 12, [0u8; 32]);
//! assert!(fp.to_string().starts_with("txt_12_0000"));
//! ```

use std::fmt;

use crate::scanner::{hash_to_hex, FileRecord, Hash};

/// Composite key identifying digest-collision candidates.
///
/// Two files with equal fingerprints are not yet known to be identical;
/// a full content comparison decides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint {
    /// Lower-cased file suffix, if any
    pub suffix: Option<String>,
    /// File size in bytes
    pub size: u64,
    /// Content digest
    pub digest: Hash,
}

impl Fingerprint {
    /// Create a new fingerprint.
    #[must_use]
    pub fn new(suffix: Option<String>, size: u64, digest: Hash) -> Self {
        Self {
            suffix,
            size,
            digest,
        }
    }

    /// Build the fingerprint of a record whose digest is known.
    #[must_use]
    pub fn of(record: &FileRecord, digest: Hash) -> Self {
        Self::new(record.suffix.clone(), record.size, digest)
    }
}

impl fmt::Display for Fingerprint {
    /// Renders as `suffix_size_hexdigest`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.suffix.as_deref().unwrap_or(""),
            self.size,
            hash_to_hex(&self.digest)
        )
    }
}

/// Files sharing one fingerprint, in the order they were offered.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    /// Shared fingerprint
    pub fingerprint: Fingerprint,
    /// Members in insertion order; the first is the kept original
    pub files: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Create a group from its members.
    #[must_use]
    pub fn new(fingerprint: Fingerprint, files: Vec<FileRecord>) -> Self {
        Self { fingerprint, files }
    }

    /// The first file seen with this fingerprint.
    #[must_use]
    pub fn original(&self) -> Option<&FileRecord> {
        self.files.first()
    }

    /// Every member after the original.
    #[must_use]
    pub fn duplicates(&self) -> &[FileRecord] {
        self.files.get(1..).unwrap_or(&[])
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Bytes held by every member after the original.
    ///
    /// Digest collisions share a group without being copies, so this is an
    /// upper bound; the finder's session counters track confirmed bytes.
    #[must_use]
    pub fn wasted_bytes(&self) -> u64 {
        self.fingerprint.size * self.duplicates().len() as u64
    }
}
