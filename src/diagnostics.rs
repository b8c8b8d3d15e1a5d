//! Diagnostic events emitted while walking and indexing.
//!
//! The core never prints or exits on its own. Everything worth reporting
//! during a traversal is sent to a [`DiagnosticSink`] as a [`Diagnostic`]:
//!
//! - [`Diagnostic::VisitedDirectory`] for every directory node
//! - [`Diagnostic::Warning`] for conditions that exclude part of the tree
//! - [`Diagnostic::Skipped`] for special files that are never indexed
//!
//! [`LogSink`] forwards events to the `log` facade and is the default.
//! [`MemorySink`] records them for inspection. [`CountingSink`] only counts
//! warnings per kind, which is what the binary uses to decide on a
//! partial-success exit code.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Category of a non-fatal warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// A directory could not be listed.
    UnreadableDirectory,
    /// A symbolic link to a directory was not followed.
    UnfollowedSymlink,
    /// A followed symbolic link leads back to one of its ancestors.
    SymlinkCycle,
    /// A node could not be inspected at all.
    Unreadable,
    /// An archive container could not be opened.
    ArchiveOpen,
    /// An archive entry could not be listed or read.
    ArchiveRead,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnreadableDirectory => "unreadable directory",
            Self::UnfollowedSymlink => "unfollowed symlink",
            Self::SymlinkCycle => "symlink cycle",
            Self::Unreadable => "unreadable",
            Self::ArchiveOpen => "archive open failure",
            Self::ArchiveRead => "archive read failure",
        };
        f.write_str(name)
    }
}

impl WarningKind {
    /// Every kind, in declaration order.
    pub const ALL: [WarningKind; 6] = [
        Self::UnreadableDirectory,
        Self::UnfollowedSymlink,
        Self::SymlinkCycle,
        Self::Unreadable,
        Self::ArchiveOpen,
        Self::ArchiveRead,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

/// One event reported by the walker or the indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A directory node was visited.
    VisitedDirectory(PathBuf),
    /// Part of the tree was excluded.
    Warning {
        /// Path concerned
        path: PathBuf,
        /// What went wrong
        kind: WarningKind,
        /// Human-readable detail
        message: String,
    },
    /// A special file (device, pipe, socket, broken link) was skipped.
    Skipped {
        /// Path concerned
        path: PathBuf,
        /// Why it was skipped
        reason: String,
    },
}

impl Diagnostic {
    /// Build a warning event.
    #[must_use]
    pub fn warning(path: &Path, kind: WarningKind, message: impl Into<String>) -> Self {
        Self::Warning {
            path: path.to_path_buf(),
            kind,
            message: message.into(),
        }
    }

    /// Build a skip event.
    #[must_use]
    pub fn skipped(path: &Path, reason: impl Into<String>) -> Self {
        Self::Skipped {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Path the event is about.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::VisitedDirectory(path)
            | Self::Warning { path, .. }
            | Self::Skipped { path, .. } => path,
        }
    }

    /// Whether this event is a warning.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning { .. })
    }
}

/// Receiver for diagnostic events.
///
/// Implementations must be cheap; they are called inline from the walk.
pub trait DiagnosticSink: Send + Sync {
    /// Handle one event.
    fn emit(&self, diagnostic: Diagnostic);
}

/// Sink that writes every event to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::VisitedDirectory(path) => log::debug!("{}", path.display()),
            Diagnostic::Warning {
                path,
                kind,
                message,
            } => log::warn!("Warning ({kind}): {} - {message}", path.display()),
            Diagnostic::Skipped { path, reason } => {
                log::info!("Skipping {reason}: {}", path.display());
            }
        }
    }
}

/// Sink that records events, optionally forwarding them to another sink.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<Diagnostic>>,
    forward: Option<Arc<dyn DiagnosticSink>>,
}

impl fmt::Debug for MemorySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySink")
            .field("events", &self.len())
            .field("forward", &self.forward.as_ref().map(|_| "<sink>"))
            .finish()
    }
}

impl MemorySink {
    /// Create an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record events and also pass them on to `sink`.
    #[must_use]
    pub fn forwarding_to(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            forward: Some(sink),
        }
    }

    /// Copy of every event recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<Diagnostic> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of events recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no event has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Warnings of the given kind.
    #[must_use]
    pub fn warnings(&self, kind: WarningKind) -> Vec<Diagnostic> {
        self.events()
            .into_iter()
            .filter(|d| matches!(d, Diagnostic::Warning { kind: k, .. } if *k == kind))
            .collect()
    }

    /// Number of warning events of any kind.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|d| d.is_warning())
            .count()
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, diagnostic: Diagnostic) {
        if let Some(ref forward) = self.forward {
            forward.emit(diagnostic.clone());
        }
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }
}

/// Sink that keeps one counter per [`WarningKind`] and forwards every event.
///
/// Memory use does not grow with the size of the tree.
pub struct CountingSink {
    warnings: [AtomicUsize; 6],
    forward: Arc<dyn DiagnosticSink>,
}

impl fmt::Debug for CountingSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountingSink")
            .field("warnings", &self.total())
            .finish_non_exhaustive()
    }
}

impl CountingSink {
    /// Count warnings and pass every event on to `forward`.
    #[must_use]
    pub fn new(forward: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            warnings: Default::default(),
            forward,
        }
    }

    /// Warnings of one kind seen so far.
    #[must_use]
    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings[kind.slot()].load(Ordering::Relaxed)
    }

    /// Warnings of every kind seen so far.
    #[must_use]
    pub fn total(&self) -> usize {
        WarningKind::ALL.iter().map(|k| self.count(*k)).sum()
    }
}

impl DiagnosticSink for CountingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        if let Diagnostic::Warning { kind, .. } = &diagnostic {
            self.warnings[kind.slot()].fetch_add(1, Ordering::Relaxed);
        }
        self.forward.emit(diagnostic);
    }
}
