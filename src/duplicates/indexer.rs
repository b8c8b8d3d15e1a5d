//! Builds a [`ContentIndex`] from a directory tree.
//!
//! # Overview
//!
//! The [`Indexer`] drives a [`TreeWalker`] over one root and turns every
//! accepted regular file into a plain [`FileIdentity`]. With archive entry
//! enabled, each `*.zip` file is also opened and every non-directory entry
//! becomes an archived identity, indexed in addition to the container.
//!
//! Indexing runs in three steps:
//! 1. **Walk**: collect identities in visit order. Archive entries are keyed
//!    while their container is open, then the container is released.
//! 2. **Key**: compute the composite keys of plain files on a bounded rayon
//!    pool (`io_threads`), since each key is independent.
//! 3. **Insert**: add identities to the index sequentially, in visit order.
//!
//! Nothing here is fatal except a missing root or an interruption: unreadable
//! files and broken archives are reported to the [`DiagnosticSink`] and left
//! out.
//!
//! # Example
//!
//! ```no_run
//! use deldup::duplicates::{Indexer, IndexerConfig};
//! use std::path::Path;
//!
//! let config = IndexerConfig::default().with_enter_archives(true);
//! let (index, stats) = Indexer::new(config).index(Path::new("/photos/official")).unwrap();
//! println!("{} entries under {} keys", index.len(), index.bucket_count());
//! println!("{} archive entries", stats.archive_entries);
//! ```

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use super::index::ContentIndex;
use super::IndexError;
use crate::diagnostics::{Diagnostic, DiagnosticSink, LogSink, WarningKind};
use crate::scanner::{is_archive, ArchiveHandle, CompositeKey, FileIdentity, NodeKind, ReadError, TreeWalker};

/// Configuration for one indexing pass.
#[derive(Clone)]
pub struct IndexerConfig {
    /// Descend into symbolic links to directories and index symlinked files.
    pub follow_symlinks: bool,
    /// Index the entries of `*.zip` files as virtual files.
    pub enter_archives: bool,
    /// Number of threads used to compute composite keys.
    /// Default is 4 to prevent disk thrashing.
    pub io_threads: usize,
    /// Receiver for walk and archive diagnostics.
    pub sink: Arc<dyn DiagnosticSink>,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
}

impl std::fmt::Debug for IndexerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexerConfig")
            .field("follow_symlinks", &self.follow_symlinks)
            .field("enter_archives", &self.enter_archives)
            .field("io_threads", &self.io_threads)
            .field("sink", &"<sink>")
            .field("shutdown_flag", &self.shutdown_flag)
            .finish()
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            enter_archives: false,
            io_threads: 4,
            sink: Arc::new(LogSink),
            shutdown_flag: None,
        }
    }
}

impl IndexerConfig {
    /// Follow symbolic links.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Index archive entries.
    #[must_use]
    pub fn with_enter_archives(mut self, enter: bool) -> Self {
        self.enter_archives = enter;
        self
    }

    /// Set the key computation thread count (at least 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Send diagnostics to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Counters from one indexing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Directory nodes visited
    pub directories: usize,
    /// Regular files accepted for indexing
    pub files: usize,
    /// Regular files rejected (not regular after resolution, unfollowed link)
    pub rejected: usize,
    /// Identities inserted into the index (files and archive entries)
    pub entries_indexed: usize,
    /// Archives whose entries were indexed
    pub archives_expanded: usize,
    /// Archive entries inserted into the index
    pub archive_entries: usize,
    /// Archives that could not be opened or listed
    pub archives_failed: usize,
    /// Files or entries left out because they could not be read
    pub unreadable: usize,
}

/// Walks a tree and builds its [`ContentIndex`].
#[derive(Debug, Clone, Default)]
pub struct Indexer {
    config: IndexerConfig,
}

impl Indexer {
    /// Create an indexer with the given configuration.
    #[must_use]
    pub fn new(config: IndexerConfig) -> Self {
        Self { config }
    }

    /// Create an indexer with default settings.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Index every regular file (and optionally archive entry) under `root`.
    ///
    /// The root is canonicalized first; identity paths descend from it.
    ///
    /// # Errors
    ///
    /// - [`IndexError::RootNotFound`] if `root` does not exist or cannot be resolved
    /// - [`IndexError::Interrupted`] if the shutdown flag was raised
    pub fn index(&self, root: &Path) -> Result<(ContentIndex, IndexStats), IndexError> {
        // One spelling per file, so the same tree named twice yields equal paths
        let root = match fs::canonicalize(root) {
            Ok(canonical) => canonical,
            Err(_) => return Err(IndexError::RootNotFound(root.to_path_buf())),
        };
        let root = root.as_path();

        log::info!("Reading files under {}", root.display());

        let mut stats = IndexStats::default();
        let pending = self.collect(root, &mut stats);

        if self.config.is_shutdown_requested() {
            log::info!("Indexing interrupted by shutdown signal");
            return Err(IndexError::Interrupted);
        }

        let keys = self.compute_keys(&pending);

        if self.config.is_shutdown_requested() {
            log::info!("Indexing interrupted by shutdown signal");
            return Err(IndexError::Interrupted);
        }

        let mut index = ContentIndex::new();
        for (identity, key) in pending.into_iter().zip(keys) {
            if let Err(e) = key {
                self.report_unreadable(&identity, &e);
                stats.unreadable += 1;
                continue;
            }
            let archived = identity.is_archived();
            match index.insert(identity) {
                Ok(_) => {
                    stats.entries_indexed += 1;
                    if archived {
                        stats.archive_entries += 1;
                    }
                }
                Err(e) => {
                    log::warn!("Failed to index {}: {}", e.path().display(), e);
                    stats.unreadable += 1;
                }
            }
        }

        log::info!(
            "Indexed {} entries ({} archived) under {} keys from {}",
            stats.entries_indexed,
            stats.archive_entries,
            index.bucket_count(),
            root.display()
        );

        Ok((index, stats))
    }

    /// Walk the tree and build identities in visit order.
    fn collect(&self, root: &Path, stats: &mut IndexStats) -> Vec<FileIdentity> {
        let mut walker = TreeWalker::new(root, self.config.follow_symlinks)
            .with_sink(Arc::clone(&self.config.sink));
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }

        let mut pending = Vec::new();
        for node in walker {
            if node.kind == NodeKind::Directory {
                stats.directories += 1;
                continue;
            }

            if node.is_symlink && !self.config.follow_symlinks {
                log::debug!("Skipping symlinked file: {}", node.path.display());
                stats.rejected += 1;
                continue;
            }

            // Re-check after resolution: the node may have changed since it was listed
            match fs::metadata(&node.path) {
                Ok(metadata) if metadata.is_file() => {}
                Ok(_) => {
                    log::debug!("Skipping non-regular file: {}", node.path.display());
                    stats.rejected += 1;
                    continue;
                }
                Err(e) => {
                    self.config.sink.emit(Diagnostic::warning(
                        &node.path,
                        WarningKind::Unreadable,
                        e.to_string(),
                    ));
                    stats.unreadable += 1;
                    continue;
                }
            }

            stats.files += 1;
            let expand = self.config.enter_archives && is_archive(&node.path);
            pending.push(FileIdentity::plain(node.path.clone()));

            if expand {
                pending.extend(self.expand_archive(&node.path, stats));
            }
        }

        pending
    }

    /// Build keyed identities for every non-directory entry of an archive.
    fn expand_archive(&self, path: &Path, stats: &mut IndexStats) -> Vec<FileIdentity> {
        let handle = match ArchiveHandle::open(path) {
            Ok(handle) => handle,
            Err(e) => {
                self.config.sink.emit(Diagnostic::warning(
                    path,
                    WarningKind::ArchiveOpen,
                    e.to_string(),
                ));
                stats.archives_failed += 1;
                return Vec::new();
            }
        };

        let entries = match handle.entries() {
            Ok(entries) => entries,
            Err(e) => {
                self.config.sink.emit(Diagnostic::warning(
                    path,
                    WarningKind::ArchiveRead,
                    e.to_string(),
                ));
                stats.archives_failed += 1;
                handle.release();
                return Vec::new();
            }
        };

        let mut identities = Vec::with_capacity(entries.len());
        for entry in entries {
            let identity = FileIdentity::archived(Arc::clone(&handle), entry);
            // Key while the container is still open
            match identity.composite_key() {
                Ok(_) => identities.push(identity),
                Err(e) => {
                    self.config.sink.emit(Diagnostic::warning(
                        path,
                        WarningKind::ArchiveRead,
                        e.to_string(),
                    ));
                    stats.unreadable += 1;
                }
            }
        }

        handle.release();
        stats.archives_expanded += 1;
        log::debug!(
            "Expanded archive {} ({} entries)",
            path.display(),
            identities.len()
        );

        identities
    }

    /// Compute the composite key of every pending identity, preserving order.
    fn compute_keys(&self, pending: &[FileIdentity]) -> Vec<Result<CompositeKey, ReadError>> {
        let key_of = |identity: &FileIdentity| {
            if self.config.is_shutdown_requested() {
                // Placeholder; the caller discards results once interrupted
                return Ok(CompositeKey::EMPTY);
            }
            identity.composite_key()
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads)
            .build()
        {
            Ok(pool) => pool.install(|| pending.par_iter().map(key_of).collect()),
            Err(e) => {
                log::warn!("Failed to create thread pool, computing keys sequentially: {e}");
                pending.iter().map(key_of).collect()
            }
        }
    }

    fn report_unreadable(&self, identity: &FileIdentity, error: &ReadError) {
        let kind = if identity.is_archived() {
            WarningKind::ArchiveRead
        } else {
            WarningKind::Unreadable
        };
        self.config
            .sink
            .emit(Diagnostic::warning(identity.path(), kind, error.to_string()));
    }
}
