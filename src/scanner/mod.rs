//! Scanner module for tree traversal and content identification.
//!
//! This module provides functionality for:
//! - Iterative directory walking with an explicit cursor stack
//! - Lazily fingerprinted file identities (plain files and ZIP entries)
//! - CRC-32 partial and full fingerprints
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and node discovery
//! - [`identity`]: [`FileIdentity`] and its [`CompositeKey`]
//! - [`archive`]: ZIP container access
//! - [`fingerprint`]: CRC-32 streaming
//!
//! # Example
//!
//! ```no_run
//! use deldup::scanner::{FileIdentity, NodeKind, TreeWalker};
//! use std::path::Path;
//!
//! let walker = TreeWalker::new(Path::new("."), false);
//! for node in walker.filter(|n| n.kind == NodeKind::File) {
//!     let identity = FileIdentity::plain(node.path);
//!     match identity.composite_key() {
//!         Ok(key) => println!("{identity}: {key}"),
//!         Err(e) => eprintln!("Warning: {e}"),
//!     }
//! }
//! ```

pub mod archive;
pub mod fingerprint;
pub mod identity;
pub mod walker;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Re-export main types
pub use archive::{is_archive, ArchiveEntry, ArchiveHandle};
pub use fingerprint::{full_checksum, partial_checksum, BLOCK_SIZE, PARTIAL_SIZE};
pub use identity::{CompositeKey, FileIdentity, ParseKeyError, Source};
pub use walker::{Node, NodeKind, TreeWalker};

/// Errors raised when a file or archive entry cannot be read.
///
/// Non-fatal: the affected entry has no usable fingerprint and is left out
/// of the index, or reported as unreadable during matching.
#[derive(thiserror::Error, Debug, Clone)]
pub enum ReadError {
    /// The file disappeared between traversal and hashing.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: Arc<io::Error>,
    },

    /// An entry inside an archive could not be opened or decompressed.
    #[error("Cannot read {entry} in {path}: {message}")]
    Archive {
        /// Path of the archive container
        path: PathBuf,
        /// Name of the entry inside the container
        entry: String,
        /// Description of the failure
        message: String,
    },
}

impl ReadError {
    /// Classify an I/O error raised while reading `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: Arc::new(error),
            },
        }
    }

    /// Path of the file (or archive container) that failed.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) => p,
            Self::Io { path, .. } | Self::Archive { path, .. } => path,
        }
    }
}

/// Errors raised when an archive container itself cannot be used.
///
/// Non-fatal: the container is still indexed as a plain file, only its
/// virtual entries are skipped.
#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    /// The container could not be opened or its central directory is corrupt.
    #[error("Cannot open archive {path}: {source}")]
    Open {
        /// Path of the archive
        path: PathBuf,
        /// The underlying ZIP error
        #[source]
        source: zip::result::ZipError,
    },

    /// An entry record in the central directory could not be read.
    #[error("Cannot read entry #{index} of {path}: {source}")]
    Entry {
        /// Path of the archive
        path: PathBuf,
        /// Position of the entry in the central directory
        index: usize,
        /// The underlying ZIP error
        #[source]
        source: zip::result::ZipError,
    },
}

impl ArchiveError {
    /// Path of the archive that failed.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Open { path, .. } | Self::Entry { path, .. } => path,
        }
    }
}
