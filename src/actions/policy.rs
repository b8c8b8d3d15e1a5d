//! Deletion policy: what happens to each matched candidate.
//!
//! # Overview
//!
//! [`DeletePolicy::apply`] consumes [`MatchDecision`]s and, for every
//! confirmed duplicate with a deletion target, either asks, deletes, or only
//! reports, depending on its [`DeleteMode`]:
//!
//! - `y` deletes this file
//! - `Y` deletes this file and every following duplicate without asking
//! - `n`, `N` or an empty line keeps it
//! - end of input stops the run
//!
//! Fast-key collisions are reported and never deleted. A duplicate is only
//! deleted while one of its originals is still in place: when the two trees
//! overlap, an original may itself have been deleted earlier in the run.
//!
//! Prompts and reports
//! go to any `Write`, answers come from any `BufRead`, so the loop is
//! testable without a terminal.

use std::collections::HashSet;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytesize::ByteSize;

use super::delete::{delete_file, DeleteResult, FileSnapshot};
use crate::duplicates::{MatchDecision, MatchOutcome};
use crate::scanner::{FileIdentity, Source};

/// Prompt shown before each deletion in [`DeleteMode::Ask`].
pub const PROMPT: &str = "Delete? (y/Y/n/N) :";

/// How confirmed duplicates are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Ask for every duplicate.
    #[default]
    Ask,
    /// Delete every duplicate without asking.
    All,
    /// Only report what would be deleted.
    DryRun,
}

/// Why a run ended before every decision was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The answer stream was exhausted.
    EndOfInput,
    /// The shutdown flag was raised.
    Interrupted,
}

/// Everything the policy did.
#[derive(Debug, Clone, Default)]
pub struct DedupeReport {
    /// Confirmed duplicates seen
    pub duplicates: usize,
    /// Files removed
    pub deleted: Vec<DeleteResult>,
    /// Duplicates kept on the user's answer
    pub declined: usize,
    /// Duplicates listed in dry-run mode
    pub would_delete: Vec<PathBuf>,
    /// Duplicates without a deletion target (archive entries)
    pub not_deletable: usize,
    /// Duplicates kept because none of their originals is left in place
    pub orphaned: usize,
    /// Fast-key collisions without a full match
    pub anomalies: usize,
    /// Candidates that could not be read
    pub unreadable: usize,
    /// Deletions that failed, with their error message
    pub failures: Vec<(PathBuf, String)>,
    /// Set when the run ended early
    pub stopped: Option<StopReason>,
}

impl DedupeReport {
    /// Bytes freed by the deleted files.
    #[must_use]
    pub fn bytes_freed(&self) -> u64 {
        self.deleted.iter().map(|d| d.size).sum()
    }

    /// Whether anything went wrong that the user should know about.
    #[must_use]
    pub fn has_problems(&self) -> bool {
        self.unreadable > 0 || !self.failures.is_empty()
    }

    /// One-line human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} duplicate(s): deleted {}, freed {}",
            self.duplicates,
            self.deleted.len(),
            ByteSize::b(self.bytes_freed())
        );
        if !self.would_delete.is_empty() {
            summary.push_str(&format!(", {} would be deleted", self.would_delete.len()));
        }
        if self.declined > 0 {
            summary.push_str(&format!(", {} kept", self.declined));
        }
        if self.orphaned > 0 {
            summary.push_str(&format!(", {} kept without a surviving original", self.orphaned));
        }
        if !self.failures.is_empty() {
            summary.push_str(&format!(", {} failed", self.failures.len()));
        }
        if self.anomalies > 0 {
            summary.push_str(&format!(", {} fast-key collision(s)", self.anomalies));
        }
        if self.unreadable > 0 {
            summary.push_str(&format!(", {} unreadable", self.unreadable));
        }
        summary
    }
}

/// Applies a [`DeleteMode`] to a stream of decisions.
#[derive(Debug, Clone, Default)]
pub struct DeletePolicy {
    mode: DeleteMode,
    permanent: bool,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl DeletePolicy {
    /// Create a policy that moves files to the trash.
    #[must_use]
    pub fn new(mode: DeleteMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Delete permanently instead of moving to the trash.
    #[must_use]
    pub fn with_permanent(mut self, permanent: bool) -> Self {
        self.permanent = permanent;
        self
    }

    /// Stop between decisions once `flag` is raised.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Current mode; `Ask` turns into `All` after a `Y` answer.
    #[must_use]
    pub fn mode(&self) -> DeleteMode {
        self.mode
    }

    /// Handle every decision in order.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if writing to `output` or reading from `input`
    /// fails. Deletion failures are recorded in the report instead.
    pub fn apply<'a, I, R, W>(
        &mut self,
        decisions: I,
        input: &mut R,
        output: &mut W,
    ) -> io::Result<DedupeReport>
    where
        I: IntoIterator<Item = MatchDecision<'a>>,
        R: BufRead,
        W: Write,
    {
        let mut report = DedupeReport::default();
        // Deleted, or listed as deleted in a dry run
        let mut removed = HashSet::new();

        for decision in decisions {
            if self.is_shutdown_requested() {
                report.stopped = Some(StopReason::Interrupted);
                break;
            }

            let candidate = decision.candidate;
            match decision.outcome {
                MatchOutcome::Unique => {
                    log::trace!("No duplicate for {candidate}");
                }
                MatchOutcome::Unreadable(e) => {
                    log::warn!("Cannot check {candidate}: {e}");
                    report.unreadable += 1;
                }
                MatchOutcome::FastKeyCollision(others) => {
                    writeln!(output, "File {candidate}")?;
                    writeln!(output, "{} shares its fast key with:", describe(candidate))?;
                    for other in &others {
                        writeln!(output, " => {other}")?;
                        writeln!(output, "{}", describe(other))?;
                    }
                    writeln!(output, "Not actually a duplicate, keeping it.")?;
                    report.anomalies += 1;
                }
                MatchOutcome::Duplicate(matches) => {
                    report.duplicates += 1;
                    writeln!(output, "File {candidate}")?;
                    writeln!(output, "{} is duplicated at:", describe(candidate))?;
                    for original in &matches {
                        writeln!(output, " => {original}")?;
                    }
                    let stop = self.handle_duplicate(
                        candidate,
                        &matches,
                        &mut removed,
                        (&mut *input, &mut *output),
                        &mut report,
                    )?;
                    if let Some(reason) = stop {
                        report.stopped = Some(reason);
                        break;
                    }
                }
            }
        }

        log::info!("{}", report.summary());
        Ok(report)
    }

    fn handle_duplicate<R: BufRead, W: Write>(
        &mut self,
        candidate: &FileIdentity,
        originals: &[&FileIdentity],
        removed: &mut HashSet<PathBuf>,
        (input, output): (&mut R, &mut W),
        report: &mut DedupeReport,
    ) -> io::Result<Option<StopReason>> {
        let Some(target) = candidate.deletion_target() else {
            writeln!(output, "Archive entries cannot be deleted.")?;
            report.not_deletable += 1;
            return Ok(None);
        };

        let snapshot = match FileSnapshot::capture(target) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("Cannot delete {}: {}", target.display(), e);
                report.failures.push((target.to_path_buf(), e.to_string()));
                return Ok(None);
            }
        };

        if !originals.iter().any(|o| original_survives(o, removed)) {
            log::warn!("Every original of {candidate} is gone, keeping it");
            writeln!(output, "No original left in place, keeping it.")?;
            report.orphaned += 1;
            return Ok(None);
        }

        match self.mode {
            DeleteMode::DryRun => {
                writeln!(output, "Would delete {}", target.display())?;
                report.would_delete.push(target.to_path_buf());
                removed.insert(target.to_path_buf());
                return Ok(None);
            }
            DeleteMode::All => {}
            DeleteMode::Ask => {
                write!(output, "{PROMPT}")?;
                output.flush()?;
                match read_answer(input)? {
                    Answer::Yes => {}
                    Answer::YesToAll => self.mode = DeleteMode::All,
                    Answer::No => {
                        report.declined += 1;
                        return Ok(None);
                    }
                    Answer::EndOfInput => {
                        writeln!(output)?;
                        log::info!("End of input stream detected, stopping");
                        return Ok(Some(StopReason::EndOfInput));
                    }
                }
            }
        }

        match delete_file(&snapshot, self.permanent) {
            Ok(result) => {
                removed.insert(target.to_path_buf());
                report.deleted.push(result);
            }
            Err(e) => {
                writeln!(output, "Failed to delete {}: {}", target.display(), e)?;
                report.failures.push((target.to_path_buf(), e.to_string()));
            }
        }
        Ok(None)
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Answer {
    Yes,
    YesToAll,
    No,
    EndOfInput,
}

/// Read one answer; only the first non-blank character counts.
fn read_answer<R: BufRead>(input: &mut R) -> io::Result<Answer> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(Answer::EndOfInput);
    }
    Ok(match line.trim().chars().next() {
        Some('y') => Answer::Yes,
        Some('Y') => Answer::YesToAll,
        _ => Answer::No,
    })
}

/// Whether `original` still holds its content on disk.
///
/// Plain files must exist with their indexed size; archive entries need their
/// container. Anything removed earlier in the run is gone.
fn original_survives(original: &FileIdentity, removed: &HashSet<PathBuf>) -> bool {
    let path = original.path();
    if removed.contains(path) {
        return false;
    }
    match original.source() {
        Source::Plain => match (fs::metadata(path), original.size()) {
            (Ok(metadata), Ok(size)) => metadata.is_file() && metadata.len() == size,
            _ => false,
        },
        Source::Archived { .. } => fs::metadata(path).is_ok_and(|m| m.is_file()),
    }
}

/// `Size:<bytes> CRC32:<checksum>` from cached fingerprints.
fn describe(identity: &FileIdentity) -> String {
    let size = identity
        .size()
        .map_or_else(|_| "?".to_string(), |s| s.to_string());
    let crc = identity
        .full_fingerprint()
        .map_or_else(|_| "?".to_string(), |c| c.to_string());
    format!("Size:{size} CRC32:{crc}")
}
