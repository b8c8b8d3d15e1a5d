//! Terminal progress for indexing, using indicatif.
//!
//! [`Progress`] is a [`DiagnosticSink`]: it ticks a spinner for every visited
//! directory and forwards every event to a wrapped sink. Forwarded events are
//! emitted with the spinner suspended, so log lines do not tear through it.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::diagnostics::{Diagnostic, DiagnosticSink};

/// Spinner showing the directory being indexed.
pub struct Progress {
    bar: ProgressBar,
    forward: Arc<dyn DiagnosticSink>,
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("directories", &self.bar.position())
            .field("hidden", &self.bar.is_hidden())
            .finish()
    }
}

impl Progress {
    /// Create a reporter forwarding to `forward`. Nothing is drawn when `quiet`.
    ///
    /// # Examples
    ///
    /// ```
    /// use deldup::diagnostics::LogSink;
    /// use deldup::progress::Progress;
    /// use std::sync::Arc;
    ///
    /// let progress = Progress::new(true, Arc::new(LogSink));
    /// progress.start("Indexing official tree");
    /// progress.finish();
    /// ```
    #[must_use]
    pub fn new(quiet: bool, forward: Arc<dyn DiagnosticSink>) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        bar.set_style(spinner_style());
        Self { bar, forward }
    }

    /// Begin a new phase with the given label.
    pub fn start(&self, label: &str) {
        self.bar.reset();
        self.bar.set_prefix(label.to_string());
        self.bar.set_message(String::new());
        if !self.bar.is_hidden() {
            self.bar.enable_steady_tick(Duration::from_millis(100));
        }
    }

    /// Stop the spinner and clear it from the terminal.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Directories visited since the last [`start`](Self::start).
    #[must_use]
    pub fn directories(&self) -> u64 {
        self.bar.position()
    }
}

impl DiagnosticSink for Progress {
    fn emit(&self, diagnostic: Diagnostic) {
        if let Diagnostic::VisitedDirectory(ref path) = diagnostic {
            self.bar.inc(1);
            self.bar.set_message(truncate_path(path, 40));
        }
        self.bar.suspend(|| self.forward.emit(diagnostic));
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {prefix} [{elapsed_precise}] {pos} dirs {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
}

/// Shorten a path to its file name when it does not fit in `max_len` characters.
fn truncate_path(path: &Path, max_len: usize) -> String {
    let full = path.display().to_string();
    if full.chars().count() <= max_len {
        return full;
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let count = name.chars().count();
    if count + 4 > max_len {
        let tail: String = name.chars().skip(count + 3 - max_len).collect();
        return format!("...{tail}");
    }
    format!(".../{name}")
}
