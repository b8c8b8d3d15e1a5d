//! Confirms duplicates of new-tree entries against the official index.
//!
//! # Overview
//!
//! For every candidate, the [`DuplicateMatcher`] looks up its composite key in
//! the official [`ContentIndex`]. A missing bucket means the content is
//! unique. Otherwise each official entry of the bucket is compared by full
//! fingerprint, and every entry whose full fingerprint matches is reported.
//!
//! A bucket where nothing matches is a fast-key collision: same size and same
//! leading 64 KiB, different content. It is reported as its own outcome so the
//! caller can surface it instead of treating it as unique.
//!
//! An official entry that is the candidate itself (same path, or on Unix the
//! same device and inode) is never counted as a match.
//!
//! The matcher never modifies the filesystem; the returned
//! [`MatchDecision`]s are handed to a deletion policy.

use std::fs;
use std::path::Path;

use super::index::ContentIndex;
use crate::scanner::{FileIdentity, ReadError, Source};

/// Verdict for one candidate.
#[derive(Debug, Clone)]
pub enum MatchOutcome<'a> {
    /// No official entry shares the candidate's composite key.
    Unique,
    /// Official entries with the same full fingerprint, in bucket order.
    Duplicate(Vec<&'a FileIdentity>),
    /// The composite key matched but no full fingerprint did.
    FastKeyCollision(Vec<&'a FileIdentity>),
    /// The candidate, or every official entry of its bucket, could not be read.
    Unreadable(ReadError),
}

/// A candidate paired with its verdict.
#[derive(Debug, Clone)]
pub struct MatchDecision<'a> {
    /// Entry from the new tree
    pub candidate: &'a FileIdentity,
    /// What the official index says about it
    pub outcome: MatchOutcome<'a>,
}

impl<'a> MatchDecision<'a> {
    /// Whether the candidate is a confirmed duplicate.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self.outcome, MatchOutcome::Duplicate(_))
    }

    /// Whether the fast key matched without any full-fingerprint match.
    #[must_use]
    pub fn is_anomalous(&self) -> bool {
        matches!(self.outcome, MatchOutcome::FastKeyCollision(_))
    }

    /// Confirmed matches; empty unless the candidate is a duplicate.
    #[must_use]
    pub fn matches(&self) -> &[&'a FileIdentity] {
        match &self.outcome {
            MatchOutcome::Duplicate(matches) => matches,
            _ => &[],
        }
    }
}

/// Outcome counts over a batch of decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchStats {
    /// Candidates examined
    pub candidates: usize,
    /// Confirmed duplicates
    pub duplicates: usize,
    /// Fast-key collisions without a full match
    pub collisions: usize,
    /// Candidates with no key in the official index
    pub unique: usize,
    /// Candidates that could not be decided
    pub unreadable: usize,
}

impl MatchStats {
    /// Count one decision.
    pub fn record(&mut self, decision: &MatchDecision<'_>) {
        self.candidates += 1;
        match decision.outcome {
            MatchOutcome::Unique => self.unique += 1,
            MatchOutcome::Duplicate(_) => self.duplicates += 1,
            MatchOutcome::FastKeyCollision(_) => self.collisions += 1,
            MatchOutcome::Unreadable(_) => self.unreadable += 1,
        }
    }
}

/// Queries an official index with entries from another tree.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateMatcher<'a> {
    official: &'a ContentIndex,
}

impl<'a> DuplicateMatcher<'a> {
    /// Create a matcher over the official index.
    #[must_use]
    pub fn new(official: &'a ContentIndex) -> Self {
        Self { official }
    }

    /// Decide one candidate.
    #[must_use]
    pub fn match_entry(&self, candidate: &'a FileIdentity) -> MatchDecision<'a> {
        let outcome = self.outcome(candidate);
        MatchDecision { candidate, outcome }
    }

    /// Decide a sequence of candidates lazily, in order.
    pub fn decisions<I>(&self, candidates: I) -> impl Iterator<Item = MatchDecision<'a>>
    where
        I: IntoIterator<Item = &'a FileIdentity>,
    {
        let matcher = *self;
        candidates
            .into_iter()
            .map(move |candidate| matcher.match_entry(candidate))
    }

    /// Decide every entry of `new`, bucket by bucket.
    #[must_use]
    pub fn match_index(&self, new: &'a ContentIndex) -> (Vec<MatchDecision<'a>>, MatchStats) {
        let mut stats = MatchStats::default();
        let decisions: Vec<_> = self
            .decisions(new.entries())
            .inspect(|decision| stats.record(decision))
            .collect();

        log::info!(
            "Matched {} entries: {} duplicates, {} fast-key collisions, {} unreadable",
            stats.candidates,
            stats.duplicates,
            stats.collisions,
            stats.unreadable
        );

        (decisions, stats)
    }

    fn outcome(&self, candidate: &'a FileIdentity) -> MatchOutcome<'a> {
        let key = match candidate.composite_key() {
            Ok(key) => key,
            Err(e) => return MatchOutcome::Unreadable(e),
        };

        let Some(bucket) = self.official.lookup(&key) else {
            return MatchOutcome::Unique;
        };

        // Only the candidate itself shares the key
        let others: Vec<&'a FileIdentity> = bucket
            .iter()
            .filter(|official| !is_same_file(candidate, official))
            .collect();
        if others.is_empty() {
            return MatchOutcome::Unique;
        }

        let expected = match candidate.full_fingerprint() {
            Ok(crc) => crc,
            Err(e) => return MatchOutcome::Unreadable(e),
        };

        let mut matches = Vec::new();
        let mut last_error = None;
        let mut failures = 0;
        for official in &others {
            match official.full_fingerprint() {
                Ok(crc) if crc == expected => matches.push(*official),
                Ok(_) => {}
                Err(e) => {
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }

        if !matches.is_empty() {
            return MatchOutcome::Duplicate(matches);
        }

        match last_error {
            Some(e) if failures == others.len() => MatchOutcome::Unreadable(e),
            _ => {
                log::warn!(
                    "{candidate} shares key {key} with {} entries but no full fingerprint matches",
                    others.len()
                );
                MatchOutcome::FastKeyCollision(others)
            }
        }
    }
}

/// Whether two identities are the same plain file on disk.
///
/// Hard links and symlinked aliases count as the same file: deleting one
/// would remove the content the other is supposed to vouch for.
fn is_same_file(a: &FileIdentity, b: &FileIdentity) -> bool {
    if !matches!((a.source(), b.source()), (Source::Plain, Source::Plain)) {
        return false;
    }
    a.path() == b.path() || same_inode(a.path(), b.path())
}

#[cfg(unix)]
fn same_inode(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_inode(_a: &Path, _b: &Path) -> bool {
    false
}
