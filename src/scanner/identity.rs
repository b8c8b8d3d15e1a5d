//! Lazily fingerprinted file identities.
//!
//! # Overview
//!
//! A [`FileIdentity`] is one addressable unit of content: either a plain
//! file on disk or an entry inside a ZIP container. Size, partial fingerprint,
//! full fingerprint and modification time are all computed on first demand
//! and cached for the lifetime of the value.
//!
//! Which operation runs first depends on the representation:
//!
//! | | plain file | archive entry |
//! |---|---|---|
//! | size | file metadata (with partial) | central directory |
//! | partial | first 64 KiB of the file | first 64 KiB, decompressed |
//! | full | whole file streamed | stored CRC-32, no I/O |
//!
//! Two identities are never compared by path. Equal [`CompositeKey`]s make
//! them candidates; equal full fingerprints make them duplicates.

use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Local, TimeZone};

use super::archive::{ArchiveEntry, ArchiveHandle};
use super::fingerprint::{full_checksum, partial_checksum};
use super::ReadError;

/// Fast lookup key: partial fingerprint plus size.
///
/// Rendered as `partial:size`; an empty file is always `0:0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey {
    /// CRC-32 of the first 64 KiB
    pub partial: u32,
    /// Content size in bytes
    pub size: u64,
}

impl CompositeKey {
    /// Key shared by every empty file or entry.
    pub const EMPTY: Self = Self {
        partial: 0,
        size: 0,
    };

    /// Create a key from its parts.
    #[must_use]
    pub fn new(partial: u32, size: u64) -> Self {
        Self { partial, size }
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.partial, self.size)
    }
}

/// Error returned when parsing a `partial:size` string.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid composite key '{0}': expected <partial>:<size>")]
pub struct ParseKeyError(String);

impl FromStr for CompositeKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (partial, size) = s.split_once(':').ok_or_else(|| ParseKeyError(s.to_string()))?;
        let partial = partial
            .trim()
            .parse()
            .map_err(|_| ParseKeyError(s.to_string()))?;
        let size = size
            .trim()
            .parse()
            .map_err(|_| ParseKeyError(s.to_string()))?;
        Ok(Self { partial, size })
    }
}

/// Where the content of an identity lives.
#[derive(Debug, Clone)]
pub enum Source {
    /// A regular file; the identity's path is the file itself.
    Plain,
    /// An entry inside the ZIP container at the identity's path.
    Archived {
        /// Shared handle to the container
        archive: Arc<ArchiveHandle>,
        /// Entry metadata from the central directory
        entry: ArchiveEntry,
    },
}

/// One addressable unit of content with memoized fingerprints.
///
/// Cached values are set at most once. A failed computation leaves its
/// slot empty, so a later call retries.
#[derive(Debug, Clone)]
pub struct FileIdentity {
    path: PathBuf,
    source: Source,
    size: OnceLock<u64>,
    partial: OnceLock<u32>,
    full: OnceLock<u32>,
    key: OnceLock<CompositeKey>,
    modified: OnceLock<Option<DateTime<Local>>>,
}

impl FileIdentity {
    /// Identity for a plain file.
    #[must_use]
    pub fn plain(path: impl Into<PathBuf>) -> Self {
        Self::with_source(path.into(), Source::Plain)
    }

    /// Identity for an entry inside an open archive.
    #[must_use]
    pub fn archived(archive: Arc<ArchiveHandle>, entry: ArchiveEntry) -> Self {
        let path = archive.path().to_path_buf();
        Self::with_source(path, Source::Archived { archive, entry })
    }

    fn with_source(path: PathBuf, source: Source) -> Self {
        Self {
            path,
            source,
            size: OnceLock::new(),
            partial: OnceLock::new(),
            full: OnceLock::new(),
            key: OnceLock::new(),
            modified: OnceLock::new(),
        }
    }

    /// Underlying path: the file itself, or the container for archive entries.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Representation of this identity.
    #[must_use]
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Archive entry descriptor, if this identity lives inside a container.
    #[must_use]
    pub fn entry(&self) -> Option<&ArchiveEntry> {
        match &self.source {
            Source::Plain => None,
            Source::Archived { entry, .. } => Some(entry),
        }
    }

    /// Whether this identity is an archive entry.
    #[must_use]
    pub fn is_archived(&self) -> bool {
        matches!(self.source, Source::Archived { .. })
    }

    /// Path that a deletion policy may remove.
    ///
    /// Archive entries have no standalone file, so they return `None`.
    #[must_use]
    pub fn deletion_target(&self) -> Option<&Path> {
        match self.source {
            Source::Plain => Some(&self.path),
            Source::Archived { .. } => None,
        }
    }

    /// Content size in bytes.
    ///
    /// Plain files resolve it through the partial fingerprint; archive entries
    /// through the full fingerprint, which is free metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`] if the file's metadata cannot be read.
    pub fn size(&self) -> Result<u64, ReadError> {
        if let Some(size) = self.size.get() {
            return Ok(*size);
        }
        match self.source {
            Source::Plain => {
                self.partial_fingerprint()?;
            }
            Source::Archived { .. } => {
                self.full_fingerprint()?;
            }
        }
        // Both paths above record the size before returning Ok
        Ok(self.size.get().copied().unwrap_or_default())
    }

    /// CRC-32 of at most the first 64 KiB of content; `0` when empty.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`] if the file or entry cannot be opened or read.
    pub fn partial_fingerprint(&self) -> Result<u32, ReadError> {
        if let Some(crc) = self.partial.get() {
            return Ok(*crc);
        }

        let computed = match &self.source {
            Source::Plain => self.plain_partial(),
            Source::Archived { archive, entry } => {
                self.record_size(entry.size);
                if entry.size == 0 {
                    Ok(0)
                } else {
                    archive.with_entry(entry, |reader| partial_checksum(reader))
                }
            }
        };

        match computed {
            Ok(crc) => Ok(*self.partial.get_or_init(|| crc)),
            Err(e) => {
                log::warn!("Failed to compute partial fingerprint for {self}: {e}");
                Err(e)
            }
        }
    }

    fn plain_partial(&self) -> Result<u32, ReadError> {
        let metadata =
            fs::metadata(&self.path).map_err(|e| ReadError::from_io(&self.path, e))?;
        let size = self.record_size(metadata.len());
        if size == 0 {
            return Ok(0);
        }
        let file = File::open(&self.path).map_err(|e| ReadError::from_io(&self.path, e))?;
        partial_checksum(file).map_err(|e| ReadError::from_io(&self.path, e))
    }

    /// CRC-32 of the entire content.
    ///
    /// Plain files are streamed in 100 KiB blocks. Archive entries return the
    /// checksum stored in the container without decompressing anything.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`] if a plain file cannot be opened or read.
    pub fn full_fingerprint(&self) -> Result<u32, ReadError> {
        if let Some(crc) = self.full.get() {
            return Ok(*crc);
        }

        let computed = match &self.source {
            Source::Plain => File::open(&self.path)
                .and_then(full_checksum)
                .map(|(crc, len)| {
                    self.record_size(len);
                    crc
                })
                .map_err(|e| ReadError::from_io(&self.path, e)),
            Source::Archived { entry, .. } => {
                self.record_size(entry.size);
                Ok(entry.crc32)
            }
        };

        match computed {
            Ok(crc) => Ok(*self.full.get_or_init(|| crc)),
            Err(e) => {
                log::warn!("Failed to compute full fingerprint for {self}: {e}");
                Err(e)
            }
        }
    }

    /// The `partial:size` lookup key, computed once.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`] if the partial fingerprint cannot be computed.
    pub fn composite_key(&self) -> Result<CompositeKey, ReadError> {
        if let Some(key) = self.key.get() {
            return Ok(*key);
        }
        let partial = self.partial_fingerprint()?;
        let size = self.size()?;
        Ok(*self.key.get_or_init(|| CompositeKey::new(partial, size)))
    }

    /// Cached composite key, if it has already been computed.
    #[must_use]
    pub fn cached_key(&self) -> Option<CompositeKey> {
        self.key.get().copied()
    }

    /// Modification time: file metadata for plain files, the stored entry
    /// timestamp for archive entries. `None` when unavailable.
    #[must_use]
    pub fn modified(&self) -> Option<DateTime<Local>> {
        *self.modified.get_or_init(|| match &self.source {
            Source::Plain => fs::metadata(&self.path)
                .and_then(|m| m.modified())
                .ok()
                .map(DateTime::<Local>::from),
            Source::Archived { entry, .. } => entry
                .modified
                .and_then(|naive| Local.from_local_datetime(&naive).earliest()),
        })
    }

    fn record_size(&self, size: u64) -> u64 {
        *self.size.get_or_init(|| size)
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Source::Plain => write!(f, "{}", self.path.display()),
            Source::Archived { entry, .. } => {
                write!(f, "{}|{}", self.path.display(), entry.name)
            }
        }
    }
}
