//! File actions module.
//!
//! This module provides functionality for:
//! - Safe deletion via the trash crate, or permanent deletion
//! - Modification checks before a file is removed
//! - The deletion policy applied to matcher decisions
//!
//! ```no_run
//! use deldup::actions::{DeleteMode, DeletePolicy};
//! use deldup::duplicates::{ContentIndex, DuplicateMatcher};
//! use std::io;
//!
//! let official = ContentIndex::new();
//! let new = ContentIndex::new();
//! let matcher = DuplicateMatcher::new(&official);
//!
//! let mut policy = DeletePolicy::new(DeleteMode::Ask);
//! let report = policy
//!     .apply(matcher.decisions(new.entries()), &mut io::stdin().lock(), &mut io::stdout())
//!     .unwrap();
//! println!("{}", report.summary());
//! ```

pub mod delete;
pub mod policy;

// Re-export commonly used types
pub use delete::{
    delete_file, delete_to_trash, permanent_delete, DeleteError, DeleteResult, FileSnapshot,
};
pub use policy::{DedupeReport, DeleteMode, DeletePolicy, StopReason, PROMPT};
