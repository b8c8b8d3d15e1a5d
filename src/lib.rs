//! DelDup - delete files that already exist in a trusted reference tree
//!
//! DelDup indexes an "official" directory tree by CRC-32 fingerprints and
//! finds the files of a "new" tree whose exact content is already there, so
//! they can be removed. ZIP archives of the official tree can be treated as
//! virtual directories, so a loose file matches an archived copy.
//!
//! # Pipeline
//!
//! 1. [`scanner::TreeWalker`] walks a tree iteratively
//! 2. [`duplicates::Indexer`] turns files and archive entries into
//!    [`scanner::FileIdentity`] values keyed by `partial:size`
//! 3. [`duplicates::DuplicateMatcher`] confirms candidates by full CRC-32
//! 4. [`actions::DeletePolicy`] asks, deletes or reports

pub mod actions;
pub mod app;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

pub use app::run_app;
