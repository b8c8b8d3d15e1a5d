//! Iterative directory walker.
//!
//! # Overview
//!
//! [`TreeWalker`] traverses a subtree depth-first without recursion. It keeps
//! an explicit stack of cursors, one per directory being listed, so the depth
//! it can handle is bounded by memory rather than by the call stack.
//!
//! Each directory listing is read completely when the walker descends into
//! it. The stack therefore holds paths, not open directory handles, and a
//! deep tree does not exhaust file descriptors.
//!
//! # Behaviour
//!
//! - Directories are yielded before their children.
//! - Sibling order is whatever the platform's directory listing returns.
//! - Unreadable directories and unfollowed directory symlinks are yielded but
//!   not entered; a warning goes to the [`DiagnosticSink`].
//! - Devices, pipes, sockets and broken symlinks are reported as skipped and
//!   not yielded.
//! - With symlink following enabled, a directory that is already one of its
//!   own ancestors (Unix: same device and inode) is not entered again.
//!
//! # Example
//!
//! ```no_run
//! use deldup::scanner::{NodeKind, TreeWalker};
//! use std::path::Path;
//!
//! let files = TreeWalker::new(Path::new("/home/user/Pictures"), false)
//!     .filter(|node| node.kind == NodeKind::File)
//!     .count();
//! println!("Found {files} files");
//! ```

use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::diagnostics::{Diagnostic, DiagnosticSink, LogSink, WarningKind};

/// Kind of node yielded by the walker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A directory (yielded before its children)
    Directory,
    /// A regular file, possibly reached through a symlink
    File,
}

/// A filesystem node produced by [`TreeWalker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Path of the node
    pub path: PathBuf,
    /// Directory or regular file
    pub kind: NodeKind,
    /// Whether the path itself is a symbolic link
    pub is_symlink: bool,
}

/// Identity of a directory used for cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DirKey {
    device: u64,
    inode: u64,
}

impl DirKey {
    #[cfg(unix)]
    fn from_metadata(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            device: metadata.dev(),
            inode: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        None
    }
}

/// Remaining siblings at one level of the tree.
#[derive(Debug)]
struct Cursor {
    children: std::vec::IntoIter<PathBuf>,
    dir: Option<DirKey>,
}

/// Stack-based, single-pass directory walker.
pub struct TreeWalker {
    follow_symlinks: bool,
    sink: Arc<dyn DiagnosticSink>,
    shutdown_flag: Option<Arc<AtomicBool>>,
    stack: Vec<Cursor>,
}

impl std::fmt::Debug for TreeWalker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeWalker")
            .field("follow_symlinks", &self.follow_symlinks)
            .field("depth", &self.stack.len())
            .field("shutdown_flag", &self.shutdown_flag)
            .finish()
    }
}

impl TreeWalker {
    /// Create a walker rooted at `root`.
    ///
    /// The root itself is the first node considered: a directory root is
    /// yielded and entered, a regular-file root is yielded alone.
    #[must_use]
    pub fn new(root: &Path, follow_symlinks: bool) -> Self {
        Self {
            follow_symlinks,
            sink: Arc::new(LogSink),
            shutdown_flag: None,
            stack: vec![Cursor {
                children: vec![root.to_path_buf()].into_iter(),
                dir: None,
            }],
        }
    }

    /// Send diagnostics to `sink` instead of the log.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// Once the flag is `true` the walker yields nothing more.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Current number of cursors on the stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Next path from the innermost cursor, popping exhausted cursors.
    fn next_path(&mut self) -> Option<PathBuf> {
        loop {
            let top = self.stack.last_mut()?;
            match top.children.next() {
                Some(path) => return Some(path),
                None => {
                    self.stack.pop();
                }
            }
        }
    }

    fn is_ancestor(&self, key: DirKey) -> bool {
        self.stack.iter().any(|cursor| cursor.dir == Some(key))
    }

    /// Decide whether to descend into `path` and push a cursor if so.
    fn enter_directory(&mut self, path: &Path, is_symlink: bool, metadata: &Metadata) {
        if is_symlink && !self.follow_symlinks {
            self.sink.emit(Diagnostic::warning(
                path,
                WarningKind::UnfollowedSymlink,
                "not following symbolic link",
            ));
            return;
        }

        let key = DirKey::from_metadata(metadata);
        if let Some(key) = key {
            if self.follow_symlinks && self.is_ancestor(key) {
                self.sink.emit(Diagnostic::warning(
                    path,
                    WarningKind::SymlinkCycle,
                    "directory is its own ancestor",
                ));
                return;
            }
        }

        match self.list_children(path) {
            Ok(children) => self.stack.push(Cursor {
                children: children.into_iter(),
                dir: key,
            }),
            Err(e) => self.sink.emit(Diagnostic::warning(
                path,
                WarningKind::UnreadableDirectory,
                format!("could not read directory: {e}"),
            )),
        }
    }

    fn list_children(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut children = Vec::new();
        for entry in fs::read_dir(dir)? {
            match entry {
                Ok(entry) => children.push(entry.path()),
                Err(e) => self.sink.emit(Diagnostic::warning(
                    dir,
                    WarningKind::UnreadableDirectory,
                    format!("could not read directory entry: {e}"),
                )),
            }
        }
        Ok(children)
    }
}

impl Iterator for TreeWalker {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        loop {
            if self.is_shutdown_requested() {
                if !self.stack.is_empty() {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                    self.stack.clear();
                }
                return None;
            }

            let path = self.next_path()?;

            let link_metadata = match fs::symlink_metadata(&path) {
                Ok(m) => m,
                Err(e) => {
                    self.sink.emit(Diagnostic::warning(
                        &path,
                        WarningKind::Unreadable,
                        e.to_string(),
                    ));
                    continue;
                }
            };

            let is_symlink = link_metadata.file_type().is_symlink();
            let metadata = if is_symlink {
                match fs::metadata(&path) {
                    Ok(m) => m,
                    Err(_) => {
                        self.sink
                            .emit(Diagnostic::skipped(&path, "broken symbolic link"));
                        continue;
                    }
                }
            } else {
                link_metadata
            };

            if metadata.is_dir() {
                self.sink.emit(Diagnostic::VisitedDirectory(path.clone()));
                self.enter_directory(&path, is_symlink, &metadata);
                return Some(Node {
                    path,
                    kind: NodeKind::Directory,
                    is_symlink,
                });
            }

            if metadata.is_file() {
                return Some(Node {
                    path,
                    kind: NodeKind::File,
                    is_symlink,
                });
            }

            self.sink.emit(Diagnostic::skipped(&path, "special file"));
        }
    }
}

impl std::iter::FusedIterator for TreeWalker {}
