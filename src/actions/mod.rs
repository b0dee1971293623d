//! File actions module.
//!
//! This module provides functionality for:
//! - Recoverable deletion via the trash crate
//! - Quarantine moves that never overwrite
//! - An append-only journal of every decision
//! - [`DuplicateProcessor`], the scan listener that ties them together
//!
//! ```no_run
//! use dupfinder::actions::{ActionPolicy, DuplicateProcessor};
//! use dupfinder::duplicates::{DuplicateFinder, FinderConfig, ScanMode, ScanRequest};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default()).unwrap();
//! let processor = Arc::new(DuplicateProcessor::new(ActionPolicy::Move, Path::new("/tmp")));
//! finder.add_listener(processor.clone());
//! finder.scan(&ScanRequest::new(["/data"], ["jpg"]), ScanMode::Sync);
//! println!("{:?}", processor.stats());
//! ```

pub mod delete;
pub mod journal;
pub mod processor;
pub mod quarantine;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use delete::{delete_to_trash, DeleteError, DeleteOutcome};
pub use journal::{session_token, Journal, JournalEntry, JournalError};
pub use processor::{ActionStats, DuplicateProcessor};
pub use quarantine::{move_to, MoveError};

/// Name of the directory under the journal root that holds logs and quarantine.
pub const ROOT_NAME: &str = "finder";

/// What to do with a confirmed duplicate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ActionPolicy {
    /// Only journal the duplicate
    #[default]
    Scan,
    /// Move the duplicate into the session's quarantine directory
    Move,
    /// Send the duplicate to the system trash
    Delete,
}

impl std::fmt::Display for ActionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionPolicy::Scan => write!(f, "scan"),
            ActionPolicy::Move => write!(f, "move"),
            ActionPolicy::Delete => write!(f, "delete"),
        }
    }
}
