//! Command-line interface definitions for DelDup.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options (verbosity, error format, config file) apply to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Ask before deleting each file of ~/incoming already present in ~/photos
//! deldup dedupe ~/photos ~/incoming
//!
//! # Also match against files stored inside ZIP archives of ~/photos
//! deldup dedupe -z ~/photos ~/incoming
//!
//! # Delete every confirmed duplicate without asking
//! deldup dedupe -y ~/photos ~/incoming
//!
//! # List the content index of ~/photos as CSV
//! deldup dump -z --header ~/photos > photos.csv
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Remove files that already exist in a trusted reference tree.
///
/// DelDup indexes an official tree by CRC-32 fingerprints, optionally looking
/// inside ZIP archives, and finds the files of a new tree whose content is
/// already there.
#[derive(Debug, Parser)]
#[command(name = "deldup")]
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

    /// Configuration file to use instead of the platform default
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for DelDup.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Delete files of NEW whose content already exists under OFFICIAL
    Dedupe(DedupeArgs),
    /// Export the content index of a tree as CSV
    Dump(DumpArgs),
}

/// Indexing options shared by every subcommand.
#[derive(Debug, Args, Clone, Default)]
pub struct IndexArgs {
    /// Index the entries of ZIP archives of the official tree
    #[arg(short = 'z', long, overrides_with = "no_enter_archives")]
    pub enter_archives: bool,

    /// Do not look inside ZIP archives, even if the configuration says so
    #[arg(long, overrides_with = "enter_archives")]
    pub no_enter_archives: bool,

    /// Follow symbolic links during traversal
    #[arg(short = 'l', long, overrides_with = "no_follow_symlinks")]
    pub follow_symlinks: bool,

    /// Do not follow symbolic links, even if the configuration says so
    #[arg(long, overrides_with = "follow_symlinks")]
    pub no_follow_symlinks: bool,

    /// Number of I/O threads for fingerprinting (default: 4)
    ///
    /// Lower values reduce disk thrashing on HDDs.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub io_threads: Option<u16>,
}

/// Arguments for the dedupe subcommand.
#[derive(Debug, Args)]
pub struct DedupeArgs {
    /// Trusted reference tree; never modified
    #[arg(value_name = "OFFICIAL")]
    pub official: PathBuf,

    /// Tree to clean up
    #[arg(value_name = "NEW")]
    pub new: PathBuf,

    #[command(flatten)]
    pub index: IndexArgs,

    /// Delete every confirmed duplicate without asking
    #[arg(short = 'y', long, conflicts_with = "dry_run")]
    pub yes: bool,

    /// Report decisions without deleting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Use permanent deletion instead of moving to trash
    ///
    /// Warning: Files cannot be recovered after permanent deletion.
    #[arg(long, overrides_with = "no_permanent")]
    pub permanent: bool,

    /// Move to trash, even if the configuration asks for permanent deletion
    #[arg(long, overrides_with = "permanent")]
    pub no_permanent: bool,
}

impl DedupeArgs {
    /// Deletion mode requested on the command line, if any.
    #[must_use]
    pub fn permanent_override(&self) -> Option<bool> {
        toggle(self.permanent, self.no_permanent)
    }
}

/// Arguments for the dump subcommand.
#[derive(Debug, Args)]
pub struct DumpArgs {
    /// Tree to index
    #[arg(value_name = "OFFICIAL")]
    pub official: PathBuf,

    #[command(flatten)]
    pub index: IndexArgs,

    /// Write a header row first
    #[arg(long, overrides_with = "no_header")]
    pub header: bool,

    /// Omit the header row, even if the configuration asks for one
    #[arg(long, overrides_with = "header")]
    pub no_header: bool,

    /// Write to a file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

impl DumpArgs {
    /// Header choice made on the command line, if any.
    #[must_use]
    pub fn header_override(&self) -> Option<bool> {
        toggle(self.header, self.no_header)
    }
}

impl IndexArgs {
    /// Archive choice made on the command line, if any.
    #[must_use]
    pub fn enter_archives_override(&self) -> Option<bool> {
        toggle(self.enter_archives, self.no_enter_archives)
    }

    /// Symlink choice made on the command line, if any.
    #[must_use]
    pub fn follow_symlinks_override(&self) -> Option<bool> {
        toggle(self.follow_symlinks, self.no_follow_symlinks)
    }
}

/// `Some(true)` for `--flag`, `Some(false)` for `--no-flag`, `None` for neither.
///
/// `overrides_with` guarantees at most one of the two is set.
fn toggle(on: bool, off: bool) -> Option<bool> {
    if on {
        Some(true)
    } else if off {
        Some(false)
    } else {
        None
    }
}
