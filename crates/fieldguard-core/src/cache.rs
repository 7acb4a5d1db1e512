#![forbid(unsafe_code)]

//! Result memoization keyed by the exact input value.
//!
//! [`ResultCache`] lets a field skip rule evaluation and external validator
//! calls for values it has already validated. It is scoped to one field and
//! is emptied by that field's reset.
//!
//! # Eviction
//!
//! The cache is bounded. Once full, inserting a new key evicts the key that
//! was inserted first (FIFO by insertion). Reads do not refresh an entry's
//! position, so this is deliberately not LRU. Overwriting an existing key
//! keeps its original position and evicts nothing.

use std::collections::{HashMap, VecDeque};

use crate::result::ValidationResult;

/// Default number of entries kept per field.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Statistics about cache performance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CacheStats {
    /// Number of entries currently in the cache.
    pub entries: usize,
    /// Total cache hits since creation or last reset.
    pub hits: u64,
    /// Total cache misses since creation or last reset.
    pub misses: u64,
    /// Entries evicted to honor the bound.
    pub evictions: u64,
    /// Hit rate as a fraction (0.0 to 1.0).
    pub hit_rate: f64,
}

/// Bounded FIFO memo of `value -> ValidationResult`.
#[derive(Debug, Clone)]
pub struct ResultCache {
    entries: HashMap<String, ValidationResult>,
    /// Keys in insertion order, oldest first.
    order: VecDeque<String>,
    capacity: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl ResultCache {
    /// Create a cache holding at most `capacity` entries.
    ///
    /// A capacity of zero disables caching: `put` is a no-op.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity.min(DEFAULT_CACHE_CAPACITY)),
            order: VecDeque::with_capacity(capacity.min(DEFAULT_CACHE_CAPACITY)),
            capacity,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Look up the memoized result for an exact value.
    pub fn get(&mut self, value: &str) -> Option<&ValidationResult> {
        match self.entries.get(value) {
            Some(result) => {
                self.hits += 1;
                Some(result)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Check for an entry without touching the statistics.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.entries.contains_key(value)
    }

    /// Memoize `result` for `value`, evicting the oldest entries first if the
    /// cache is full.
    pub fn put(&mut self, value: impl Into<String>, result: ValidationResult) {
        if self.capacity == 0 {
            return;
        }
        let value = value.into();
        if let Some(slot) = self.entries.get_mut(&value) {
            *slot = result;
            return;
        }
        while self.order.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            self.evictions += 1;
        }
        self.order.push_back(value.clone());
        self.entries.insert(value, result);
    }

    /// Drop every entry and reset the statistics.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
    }

    /// Number of entries held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys in eviction order (oldest first).
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let total = self.hits + self.misses;
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            hit_rate: if total > 0 {
                self.hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}
