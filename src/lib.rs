//! dupfinder - duplicate file finder
//!
//! Walks one or more directory trees in parallel (one worker per root),
//! groups files by suffix, size and BLAKE3 digest, confirms duplicates byte
//! for byte, and optionally quarantines or trashes them while journaling
//! every decision.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::actions::DuplicateProcessor;
use crate::cli::{Cli, Commands, ScanArgs};
use crate::config::{Config, FileTypeMode};
use crate::duplicates::{DuplicateFinder, FinderConfig, ScanMode, ScanSummary};
use crate::error::ExitCode;
use crate::progress::Progress;
use crate::scanner::WalkerConfig;

/// Run the application for parsed arguments.
///
/// # Errors
///
/// Returns an error for invalid configuration, no directories to scan, or
/// a worker pool that cannot be created.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Scan(args) => run_scan(args, cli.quiet),
    }
}

fn run_scan(args: ScanArgs, quiet: bool) -> Result<ExitCode> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    apply_overrides(&mut config, &args);

    if args.save_config {
        match &args.config {
            Some(path) => config.save_to(path)?,
            None => {
                config.save()?;
            }
        }
    }

    let request = config.scan_request();
    if request.roots.is_empty() {
        bail!("No directories to scan: pass PATH arguments or set scan_folders in the settings file");
    }
    for root in &request.roots {
        if !root.is_dir() {
            log::warn!("Not a directory, nothing to scan: {}", root.display());
        }
    }

    let finder_config = FinderConfig::default()
        .with_pool_size(config.threads)
        .with_walker_config(WalkerConfig::default().with_follow_symlinks(config.follow_symlinks));
    let finder = Arc::new(DuplicateFinder::new(finder_config).context("Failed to set up scan")?);

    let handler = signal::install_handler();
    let weak = Arc::downgrade(&finder);
    handler.on_interrupt(move || {
        if let Some(finder) = weak.upgrade() {
            finder.stop();
        }
    });

    let progress = Arc::new(Progress::new(quiet));
    let processor = Arc::new(DuplicateProcessor::new(config.action, &config.journal_root()));
    finder.add_listener(progress);
    finder.add_listener(processor.clone());

    finder.count(&request);
    if handler.is_shutdown_requested() {
        log::info!("Interrupted before scanning");
        return Ok(ExitCode::Interrupted);
    }
    finder.start(&request, ScanMode::Sync);

    let summary = finder.summary();
    let interrupted = summary.interrupted || handler.is_shutdown_requested();
    if !quiet {
        print_summary(&summary, &processor);
    }

    Ok(if interrupted {
        ExitCode::Interrupted
    } else if summary.duplicates > 0 {
        ExitCode::Success
    } else {
        ExitCode::NoDuplicates
    })
}

fn apply_overrides(config: &mut Config, args: &ScanArgs) {
    if !args.paths.is_empty() {
        config.scan_folders.clone_from(&args.paths);
    }
    if args.all_types {
        config.file_types = FileTypeMode::All;
    } else if !args.extensions.is_empty() {
        config.file_types = FileTypeMode::Normal;
        config.normal_suffixes.clone_from(&args.extensions);
    }
    if let Some(action) = args.action {
        config.action = action;
    }
    if let Some(root) = &args.journal_root {
        config.journal_root = Some(root.clone());
    }
    if args.follow_symlinks {
        config.follow_symlinks = true;
    }
    if let Some(threads) = args.threads {
        config.threads = usize::from(threads);
    }
}

fn print_summary(summary: &ScanSummary, processor: &DuplicateProcessor) {
    let stats = processor.stats();
    println!(
        "{} of {} file(s) scanned in {:.2?}{}",
        summary.processed,
        summary.total_files,
        summary.scan_duration,
        if summary.interrupted { " (interrupted)" } else { "" }
    );
    println!(
        "{} duplicate(s) in {} group(s), {} reclaimable",
        summary.duplicates,
        summary.duplicate_groups,
        summary.reclaimable_display()
    );
    if summary.collisions > 0 || summary.unhashable > 0 {
        println!(
            "{} digest collision(s), {} unreadable file(s)",
            summary.collisions, summary.unhashable
        );
    }
    match processor.policy() {
        actions::ActionPolicy::Scan => {}
        actions::ActionPolicy::Move => {
            println!("{} moved, {} failed", stats.moved, stats.failed);
        }
        actions::ActionPolicy::Delete => println!(
            "{} trashed, {} already gone, {} failed",
            stats.trashed, stats.already_gone, stats.failed
        ),
    }
    if let Some(path) = processor.journal_path() {
        println!("Journal: {}", path.display());
    }
}
