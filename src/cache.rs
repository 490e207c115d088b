//! Content-addressed memoization of compiler runs.
//!
//! Entries are keyed by filename and a blake3 digest of the source text. The
//! digest says nothing about which compiler produced the result, so the cache
//! must be cleared whenever the resolved plugin path changes.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::helpers;

pub const DEFAULT_CAPACITY: usize = 100;

pub struct ResultCache<T> {
    entries: Mutex<LruCache<String, T>>,
}

impl<T: Clone> ResultCache<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn key(text: &str, filename: &str) -> String {
        format!("{}:{}", filename, helpers::compute_string_hash(text).to_hex())
    }

    /// Look up a result, promoting it to most recently used on a hit.
    pub fn get(&self, text: &str, filename: &str) -> Option<T> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(&Self::key(text, filename)).cloned()
    }

    /// Insert a result. At capacity, the least recently used entry is evicted.
    pub fn set(&self, text: &str, filename: &str, result: T) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.put(Self::key(text, filename), result);
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Default for ResultCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
