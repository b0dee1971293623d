//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Fingerprinting files by suffix, size and content digest
//! - Collision-safe duplicate confirmation in a concurrent index
//! - Coordinating multi-root scans on a bounded worker pool

pub mod finder;
pub mod groups;
pub mod index;

pub use finder::{
    DuplicateFinder, FinderConfig, FinderError, ScanMode, ScanRequest, ScanSummary,
    DEFAULT_POOL_SIZE,
};
pub use groups::{DuplicateGroup, Fingerprint};
pub use index::{ContentIndex, Offer};
