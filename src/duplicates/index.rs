//! Multi-valued content index keyed by [`CompositeKey`].
//!
//! # Overview
//!
//! A [`ContentIndex`] maps each composite key to the collision bucket of
//! every [`FileIdentity`] observed with that key, in visit order. Insertion is
//! strictly additive: buckets grow, nothing is ever removed.
//!
//! Membership in a bucket means *candidate*, never *duplicate*. Confirmation
//! needs a full-fingerprint comparison, which is the matcher's job.
//!
//! The index is built by one writer and read afterwards; it has no interior
//! mutability of its own.
//!
//! # Example
//!
//! ```no_run
//! use deldup::duplicates::ContentIndex;
//! use deldup::scanner::FileIdentity;
//!
//! let mut index = ContentIndex::new();
//! let key = index.insert(FileIdentity::plain("a.txt")).unwrap();
//! index.insert(FileIdentity::plain("b.txt")).unwrap();
//!
//! if let Some(bucket) = index.lookup(&key) {
//!     println!("{} candidates share {key}", bucket.len());
//! }
//! ```

use std::collections::HashMap;

use crate::scanner::{CompositeKey, FileIdentity, ReadError};

/// Mapping from composite key to an insertion-ordered collision bucket.
#[derive(Debug, Default)]
pub struct ContentIndex {
    buckets: HashMap<CompositeKey, Vec<FileIdentity>>,
    /// Keys in the order their buckets were created
    order: Vec<CompositeKey>,
    entries: usize,
}

impl ContentIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identity to the bucket for its composite key.
    ///
    /// Computes the key if it is not cached yet. The bucket is created on
    /// first use; existing entries are never replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`] if the key cannot be computed. The identity is
    /// dropped and the index is left unchanged.
    pub fn insert(&mut self, identity: FileIdentity) -> Result<CompositeKey, ReadError> {
        let key = identity.composite_key()?;
        let bucket = self.buckets.entry(key).or_insert_with(|| {
            self.order.push(key);
            Vec::new()
        });
        bucket.push(identity);
        self.entries += 1;
        Ok(key)
    }

    /// Collision bucket for `key`, or `None` when no entry has that key.
    #[must_use]
    pub fn lookup(&self, key: &CompositeKey) -> Option<&[FileIdentity]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    /// Collision bucket for the key of `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`] if the identity's key cannot be computed.
    pub fn lookup_entry(&self, identity: &FileIdentity) -> Result<Option<&[FileIdentity]>, ReadError> {
        Ok(self.lookup(&identity.composite_key()?))
    }

    /// Whether a bucket exists for `key`.
    #[must_use]
    pub fn contains_key(&self, key: &CompositeKey) -> bool {
        self.buckets.contains_key(key)
    }

    /// Total number of indexed identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
    }

    /// Whether the index holds no identities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.order.len()
    }

    /// Buckets in the order their keys were first seen.
    pub fn buckets(&self) -> impl Iterator<Item = (CompositeKey, &[FileIdentity])> + '_ {
        self.order
            .iter()
            .filter_map(|key| self.lookup(key).map(|bucket| (*key, bucket)))
    }

    /// Every identity, bucket by bucket.
    pub fn entries(&self) -> impl Iterator<Item = &FileIdentity> + '_ {
        self.buckets().flat_map(|(_, bucket)| bucket.iter())
    }

    /// Buckets holding more than one identity.
    pub fn collisions(&self) -> impl Iterator<Item = (CompositeKey, &[FileIdentity])> + '_ {
        self.buckets().filter(|(_, bucket)| bucket.len() > 1)
    }
}
