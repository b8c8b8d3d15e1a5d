//! File removal: move to trash or delete permanently.
//!
//! # Overview
//!
//! Only plain files are ever removed; archive entries have no deletion
//! target. Before a file is removed, a [`FileSnapshot`] taken when the
//! duplicate was confirmed is compared with the file's current metadata, so a
//! file edited in the meantime is left alone.
//!
//! # Example
//!
//! ```no_run
//! use deldup::actions::delete::{delete_file, FileSnapshot};
//! use std::path::Path;
//!
//! let snapshot = FileSnapshot::capture(Path::new("/incoming/img.jpg")).unwrap();
//! match delete_file(&snapshot, false) {
//!     Ok(result) => println!("Moved to trash: {}", result.path.display()),
//!     Err(e) => eprintln!("Failed: {e}"),
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// File was modified after its duplicate was confirmed.
    #[error("file modified since it was matched: {0}")]
    Modified(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed {
        /// File that could not be trashed
        path: PathBuf,
        /// Message from the trash backend
        message: String,
    },

    /// Permanent delete operation failed.
    #[error("permanent delete failed for {path}: {source}")]
    PermanentDeleteFailed {
        /// File that could not be removed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    /// Path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::Modified(p) => p,
            Self::TrashFailed { path, .. }
            | Self::PermanentDeleteFailed { path, .. }
            | Self::Io { path, .. } => path,
        }
    }

    fn from_metadata(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// A file that was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResult {
    /// Path that was deleted.
    pub path: PathBuf,
    /// Size of the deleted file in bytes.
    pub size: u64,
    /// Whether deletion was permanent (true) or to trash (false).
    pub permanent: bool,
}

/// File metadata recorded when a duplicate is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    /// Path to the file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time.
    pub mtime: Option<SystemTime>,
}

impl FileSnapshot {
    /// Record the current size and modification time of `path`.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or can't be accessed.
    pub fn capture(path: &Path) -> Result<Self, DeleteError> {
        let metadata = fs::metadata(path).map_err(|e| DeleteError::from_metadata(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            mtime: metadata.modified().ok(),
        })
    }

    /// Check that the file still has the recorded size and modification time.
    ///
    /// # Errors
    ///
    /// Returns [`DeleteError::Modified`] if either changed, or the error from
    /// reading the current metadata.
    pub fn verify(&self) -> Result<(), DeleteError> {
        let current = Self::capture(&self.path)?;

        let mtime_changed = matches!(
            (self.mtime, current.mtime),
            (Some(before), Some(now)) if before != now
        );
        if mtime_changed || self.size != current.size {
            log::warn!(
                "File modified since it was matched: {} ({} -> {} bytes)",
                self.path.display(),
                self.size,
                current.size
            );
            return Err(DeleteError::Modified(self.path.clone()));
        }
        Ok(())
    }
}

/// Move a file to the system trash.
///
/// # Errors
///
/// - `NotFound` / `PermissionDenied` if the file cannot be inspected
/// - `TrashFailed` if the trash backend refuses the file
pub fn delete_to_trash(path: &Path) -> Result<DeleteResult, DeleteError> {
    let size = file_size(path)?;

    trash::delete(path).map_err(|e| {
        log::error!("Trash operation failed for {}: {}", path.display(), e);
        DeleteError::TrashFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    log::info!("Moved to trash: {} ({} bytes)", path.display(), size);
    Ok(DeleteResult {
        path: path.to_path_buf(),
        size,
        permanent: false,
    })
}

/// Permanently delete a file.
///
/// # Errors
///
/// - `NotFound` / `PermissionDenied` if the file cannot be inspected
/// - `PermanentDeleteFailed` if removal fails
pub fn permanent_delete(path: &Path) -> Result<DeleteResult, DeleteError> {
    let size = file_size(path)?;

    fs::remove_file(path).map_err(|source| {
        log::error!("Permanent delete failed for {}: {}", path.display(), source);
        DeleteError::PermanentDeleteFailed {
            path: path.to_path_buf(),
            source,
        }
    })?;

    log::info!("Permanently deleted: {} ({} bytes)", path.display(), size);
    Ok(DeleteResult {
        path: path.to_path_buf(),
        size,
        permanent: true,
    })
}

/// Verify `snapshot`, then remove its file.
///
/// # Errors
///
/// - `Modified` if the file changed since the snapshot
/// - any error from [`delete_to_trash`] or [`permanent_delete`]
pub fn delete_file(snapshot: &FileSnapshot, permanent: bool) -> Result<DeleteResult, DeleteError> {
    snapshot.verify()?;
    if permanent {
        permanent_delete(&snapshot.path)
    } else {
        delete_to_trash(&snapshot.path)
    }
}

fn file_size(path: &Path) -> Result<u64, DeleteError> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| DeleteError::from_metadata(path, e))
}
