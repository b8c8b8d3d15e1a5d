//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Content indexing by composite key (partial fingerprint and size)
//! - Building an index from a directory tree, optionally entering archives
//! - Confirming duplicates by full fingerprint against an official index
//!
//! # Pipeline
//!
//! ```text
//! TreeWalker -> Indexer -> ContentIndex (official)
//! TreeWalker -> Indexer -> ContentIndex (new) -> DuplicateMatcher -> decisions
//! ```

pub mod index;
pub mod indexer;
pub mod matcher;

use std::path::PathBuf;

pub use index::ContentIndex;
pub use indexer::{IndexStats, Indexer, IndexerConfig};
pub use matcher::{DuplicateMatcher, MatchDecision, MatchOutcome, MatchStats};

/// Errors that end an indexing pass.
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// Indexing was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Indexing interrupted by user")]
    Interrupted,

    /// The root to index does not exist.
    #[error("Path not found: {0}")]
    RootNotFound(PathBuf),
}
