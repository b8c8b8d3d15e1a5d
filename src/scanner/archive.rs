//! ZIP container access.
//!
//! # Overview
//!
//! An [`ArchiveHandle`] wraps one ZIP file on disk. Listing its entries only
//! reads the central directory: every [`ArchiveEntry`] carries the stored
//! CRC-32 and uncompressed size, so full fingerprints of archived content
//! never require decompression. Only the partial fingerprint has to stream
//! the first bytes of an entry, through [`ArchiveHandle::with_entry`].
//!
//! The handle keeps the container open while it is in use and can be
//! [released](ArchiveHandle::release) once indexing is done with it; later
//! reads reopen the file transparently. This bounds the number of open file
//! descriptors to the archives currently being expanded.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{NaiveDate, NaiveDateTime};
use zip::ZipArchive;

use super::{ArchiveError, ReadError};

/// File extension (case-insensitive) that marks an archive container.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Check whether a path names an archive container (`*.zip`, any case).
#[must_use]
pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}

/// Metadata of one non-directory entry, as stored in the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Position in the central directory
    pub index: usize,
    /// Entry name (path inside the archive)
    pub name: String,
    /// Uncompressed size in bytes
    pub size: u64,
    /// Stored CRC-32 of the uncompressed content
    pub crc32: u32,
    /// Stored modification time (local time, no zone)
    pub modified: Option<NaiveDateTime>,
}

type Container = ZipArchive<BufReader<File>>;

/// Shared, lazily reopened handle to a ZIP container.
pub struct ArchiveHandle {
    path: PathBuf,
    archive: Mutex<Option<Container>>,
}

impl fmt::Debug for ArchiveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = self
            .archive
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false);
        f.debug_struct("ArchiveHandle")
            .field("path", &self.path)
            .field("open", &open)
            .finish()
    }
}

impl ArchiveHandle {
    /// Open a container and parse its central directory.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Open`] if the file cannot be opened or is not
    /// a readable ZIP archive.
    pub fn open(path: &Path) -> Result<Arc<Self>, ArchiveError> {
        let container = open_container(path).map_err(|source| ArchiveError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        log::debug!(
            "Opened archive {} ({} records)",
            path.display(),
            container.len()
        );

        Ok(Arc::new(Self {
            path: path.to_path_buf(),
            archive: Mutex::new(Some(container)),
        }))
    }

    /// Path of the container on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// List every non-directory entry without decompressing anything.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if the container cannot be reopened or an
    /// entry record is unreadable. Listing stops at the first bad record.
    pub fn entries(&self) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let mut guard = self.lock();
        let archive = self.ensure_open(&mut guard).map_err(|source| ArchiveError::Open {
            path: self.path.clone(),
            source,
        })?;

        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let file = archive
                .by_index_raw(index)
                .map_err(|source| ArchiveError::Entry {
                    path: self.path.clone(),
                    index,
                    source,
                })?;

            if file.is_dir() {
                continue;
            }

            let modified: Option<zip::DateTime> = file.last_modified().into();
            entries.push(ArchiveEntry {
                index,
                name: file.name().to_string(),
                size: file.size(),
                crc32: file.crc32(),
                modified: modified.and_then(naive_from_zip),
            });
        }

        Ok(entries)
    }

    /// Run `read` over the decompressed content of one entry.
    ///
    /// Reopens the container if it was released. Access is serialised per
    /// container; separate containers can be read concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`] if the container or the entry cannot be opened,
    /// or if `read` fails.
    pub fn with_entry<T>(
        &self,
        entry: &ArchiveEntry,
        read: impl FnOnce(&mut dyn Read) -> io::Result<T>,
    ) -> Result<T, ReadError> {
        let entry_error = |message: String| ReadError::Archive {
            path: self.path.clone(),
            entry: entry.name.clone(),
            message,
        };

        let mut guard = self.lock();
        let archive = self
            .ensure_open(&mut guard)
            .map_err(|e| entry_error(e.to_string()))?;
        let mut file = archive
            .by_index(entry.index)
            .map_err(|e| entry_error(e.to_string()))?;

        read(&mut file).map_err(|e| entry_error(e.to_string()))
    }

    /// Close the underlying file; the next access reopens it.
    pub fn release(&self) {
        if self.lock().take().is_some() {
            log::trace!("Released archive {}", self.path.display());
        }
    }

    /// Whether the container is currently held open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Container>> {
        self.archive.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open<'a>(
        &self,
        slot: &'a mut Option<Container>,
    ) -> zip::result::ZipResult<&'a mut Container> {
        if slot.is_none() {
            log::trace!("Reopening archive {}", self.path.display());
            *slot = Some(open_container(&self.path)?);
        }
        slot.as_mut().ok_or(zip::result::ZipError::FileNotFound)
    }
}

fn open_container(path: &Path) -> zip::result::ZipResult<Container> {
    let file = File::open(path)?;
    ZipArchive::new(BufReader::new(file))
}

fn naive_from_zip(dt: zip::DateTime) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(
        i32::from(dt.year()),
        u32::from(dt.month()),
        u32::from(dt.day()),
    )?
    .and_hms_opt(
        u32::from(dt.hour()),
        u32::from(dt.minute()),
        u32::from(dt.second()),
    )
}
