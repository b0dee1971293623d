//! Command-line interface definitions.
//!
//! # Example
//!
//! ```bash
//! # Scan two folders, every file type, only record duplicates
//! dupfinder scan ~/Pictures /mnt/backup
//!
//! # Only photos and videos, quarantine duplicates
//! dupfinder scan ~/Pictures --ext jpg,jpeg,mp4 --action move
//!
//! # Use the folders saved in settings.toml
//! dupfinder -v scan
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::actions::ActionPolicy;

/// Find duplicate files by content across directory trees.
///
/// Files are grouped by suffix, size and BLAKE3 digest, then confirmed
/// byte for byte. Duplicates can be recorded, quarantined or trashed.
#[derive(Debug, Parser)]
#[command(name = "dupfinder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan directories for duplicate files
    Scan(ScanArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directories to scan (defaults to the configured scan folders)
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Only scan files with these suffixes (repeatable or comma-separated)
    #[arg(short, long = "ext", value_name = "EXT", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Scan every file type, ignoring configured suffixes
    #[arg(long, conflicts_with = "extensions")]
    pub all_types: bool,

    /// What to do with duplicates
    #[arg(short, long, value_enum, value_name = "POLICY")]
    pub action: Option<ActionPolicy>,

    /// Directory under which `finder/` holds the journal and quarantine
    #[arg(long, value_name = "DIR")]
    pub journal_root: Option<PathBuf>,

    /// Follow symbolic links during scan
    ///
    /// Warning: symlink cycles are not detected.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Worker threads (one root per thread at a time)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub threads: Option<u16>,

    /// Settings file to use instead of the platform default
    #[arg(long, value_name = "FILE", env = "DUPFINDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    pub save_config: bool,
}
