//! Concurrent content index.
//!
//! # Overview
//!
//! The [`ContentIndex`] buckets every offered file under its [`Fingerprint`]
//! and decides, at insertion time, whether the file duplicates a member
//! already in its bucket. Matching digests only nominate candidates; the
//! decision is made by [`Hasher::content_equals`].
//!
//! # Locking
//!
//! The map itself is a [`DashMap`], so installing a brand-new group is a
//! single atomic entry operation. Each group sits behind its own mutex,
//! and comparisons and appends happen under that lock only: workers
//! touching different fingerprints never wait on each other, while two
//! workers offering into the same group are serialized. A newcomer is
//! therefore compared against every member that was in the group before it.
//!
//! # Example
//!
//! ```no_run
//! use dupfinder::duplicates::{ContentIndex, Offer};
//! use dupfinder::scanner::{FileRecord, Hasher};
//! use std::path::Path;
//!
//! let index = ContentIndex::new(Hasher::new());
//! let a = FileRecord::from_path(Path::new("a.txt")).unwrap();
//! let b = FileRecord::from_path(Path::new("b.txt")).unwrap();
//!
//! assert!(matches!(index.offer(a), Offer::Unique));
//! if let Offer::Duplicate { original } = index.offer(b) {
//!     println!("duplicate of {}", original.path.display());
//! }
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::groups::{DuplicateGroup, Fingerprint};
use crate::scanner::{FileRecord, Hash, Hasher};

type Members = Arc<Mutex<Vec<FileRecord>>>;

/// Outcome of offering a file to the index.
#[derive(Debug, Clone)]
pub enum Offer {
    /// First file with this fingerprint.
    Unique,
    /// Byte-identical to an earlier member, which is returned.
    Duplicate {
        /// The earliest member with identical content
        original: FileRecord,
    },
    /// Fingerprint matched but no member has identical content.
    Collision,
    /// The file could not be hashed and was not indexed.
    Unhashable,
    /// The same path is already a member (overlapping roots).
    AlreadyIndexed,
}

impl Offer {
    /// Whether this outcome confirmed a duplicate.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// Thread-safe fingerprint index with collision-safe duplicate confirmation.
#[derive(Debug)]
pub struct ContentIndex {
    groups: DashMap<Fingerprint, Members>,
    hasher: Hasher,
}

impl ContentIndex {
    /// Create an empty index using the given hasher.
    #[must_use]
    pub fn new(hasher: Hasher) -> Self {
        Self {
            groups: DashMap::new(),
            hasher,
        }
    }

    /// Hash a record and offer it to its group.
    ///
    /// A record whose digest cannot be computed is reported as
    /// [`Offer::Unhashable`] and left out of the index.
    pub fn offer(&self, record: FileRecord) -> Offer {
        match record.digest(&self.hasher) {
            Some(digest) => self.offer_with_digest(record, digest),
            None => Offer::Unhashable,
        }
    }

    /// Offer a record under an already computed digest.
    pub fn offer_with_digest(&self, record: FileRecord, digest: Hash) -> Offer {
        let fingerprint = Fingerprint::of(&record, digest);

        let members = match self.groups.entry(fingerprint) {
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(Mutex::new(vec![record])));
                return Offer::Unique;
            }
            Entry::Occupied(occupied) => Arc::clone(occupied.get()),
        };
        // The shard guard is released here; only the group lock is held below.

        let mut members = members.lock().unwrap_or_else(PoisonError::into_inner);
        if members.iter().any(|member| member.path == record.path) {
            log::debug!("Already indexed: {}", record.path.display());
            return Offer::AlreadyIndexed;
        }
        let original = members
            .iter()
            .find(|member| self.confirm(member, &record))
            .cloned();
        let offer = match original {
            Some(original) => Offer::Duplicate { original },
            None => {
                log::warn!(
                    "Digest collision between different files: {} vs {}",
                    members
                        .first()
                        .map_or_else(String::new, |m| m.path.display().to_string()),
                    record.path.display()
                );
                Offer::Collision
            }
        };
        members.push(record);
        offer
    }

    /// Full content comparison; I/O failures count as "not identical".
    fn confirm(&self, member: &FileRecord, candidate: &FileRecord) -> bool {
        match self.hasher.content_equals(&member.path, &candidate.path) {
            Ok(equal) => equal,
            Err(e) => {
                log::warn!(
                    "Could not compare {} with {}: {}",
                    member.path.display(),
                    candidate.path.display(),
                    e
                );
                false
            }
        }
    }

    /// Snapshot of every group, including single-member ones.
    #[must_use]
    pub fn groups(&self) -> Vec<DuplicateGroup> {
        self.groups
            .iter()
            .map(|entry| {
                let files = entry
                    .value()
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                DuplicateGroup::new(entry.key().clone(), files)
            })
            .collect()
    }

    /// Groups with at least two members, ordered by original path.
    #[must_use]
    pub fn duplicate_groups(&self) -> Vec<DuplicateGroup> {
        let mut groups: Vec<_> = self
            .groups()
            .into_iter()
            .filter(|g| g.len() > 1)
            .collect();
        groups.sort_by(|a, b| {
            let a = a.original().map(|f| &f.path);
            let b = b.original().map(|f| &f.path);
            a.cmp(&b)
        });
        groups
    }

    /// Number of distinct fingerprints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no file has been indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Drop every group.
    pub fn clear(&self) {
        self.groups.clear();
    }

    /// Total number of indexed files.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.groups
            .iter()
            .map(|entry| {
                entry
                    .value()
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .len()
            })
            .sum()
    }
}
