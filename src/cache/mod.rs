// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! LRU cache for embedding vectors.
//!
//! Avoids re-encoding identical texts on the single-query path. Keys are
//! SHA-256 fingerprints of the UTF-8 text bytes, so they are deterministic
//! across process restarts and independent of any in-process hash seed.
//!
//! The cache carries no model or normalization tag: entries are only valid
//! for the model and settings the process was started with. The engine
//! constructs a fresh cache at startup, so a configuration change (which is
//! a process restart) flushes it by construction.
//!
//! Not internally synchronized; the engine guards it with a mutex.

use lru::LruCache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;

/// Snapshot of cache counters, exposed by GET /health.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries currently stored
    pub size: usize,

    /// Lookups that returned a stored vector
    pub hits: u64,

    /// Lookups that found nothing
    pub misses: u64,

    /// hits / (hits + misses), or 0.0 before the first lookup
    pub hit_rate: f64,
}

/// Bounded LRU store mapping text fingerprints to embedding vectors.
pub struct EmbeddingCache {
    entries: LruCache<[u8; 32], Vec<f32>>,
    hits: u64,
    misses: u64,
}

impl EmbeddingCache {
    /// Creates a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// SHA-256 of the text's UTF-8 bytes. Collision resistance is the
    /// requirement here, not secrecy: a false hit would silently return the
    /// wrong vector.
    fn fingerprint(text: &str) -> [u8; 32] {
        Sha256::digest(text.as_bytes()).into()
    }

    /// Looks up a previously cached vector for `text`.
    ///
    /// A hit bumps the entry to most-recently-used and increments the hit
    /// counter; a miss increments the miss counter and leaves the stored
    /// set untouched.
    pub fn get(&mut self, text: &str) -> Option<Vec<f32>> {
        match self.entries.get(&Self::fingerprint(text)) {
            Some(embedding) => {
                self.hits += 1;
                Some(embedding.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Stores (or overwrites) the vector for `text`, marking it
    /// most-recently-used. Evicts the least-recently-used entry when the
    /// cache is at capacity.
    pub fn put(&mut self, text: &str, embedding: Vec<f32>) {
        self.entries.put(Self::fingerprint(text), embedding);
    }

    /// Number of entries currently stored
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counter snapshot. `hit_rate` is 0.0 until the first lookup.
    pub fn stats(&self) -> CacheStats {
        let total = self.hits + self.misses;
        CacheStats {
            size: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            hit_rate: if total > 0 {
                self.hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}
