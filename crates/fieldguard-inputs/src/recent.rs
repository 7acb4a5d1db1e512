#![forbid(unsafe_code)]

//! Recently used values, remembered through a [`PersistencePort`].
//!
//! [`RecentValues`] keeps a short most-recent-first list without
//! duplicates. The list is loaded once at construction and written back on
//! every change. Storage trouble never reaches the caller: a failed load
//! starts from an empty list, a failed save keeps the in-memory list, and
//! both are logged at `warn` on `fieldguard.persistence`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use fieldguard_core::persistence::MemoryPersistence;
//! use fieldguard_inputs::recent::RecentValues;
//!
//! let mut recent = RecentValues::new(Arc::new(MemoryPersistence::new()));
//! recent.record("alice@example.com");
//! recent.record("bob@example.com");
//! recent.record("alice@example.com");
//! assert_eq!(recent.values(), ["alice@example.com", "bob@example.com"]);
//! ```

use std::fmt;
use std::sync::Arc;

use fieldguard_core::persistence::PersistencePort;

/// Default number of remembered values.
pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// Bounded, de-duplicated, most-recent-first value list.
pub struct RecentValues {
    port: Arc<dyn PersistencePort>,
    values: Vec<String>,
    limit: usize,
    degraded: bool,
}

impl fmt::Debug for RecentValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecentValues")
            .field("backend", &self.port.name())
            .field("values", &self.values)
            .field("limit", &self.limit)
            .field("degraded", &self.degraded)
            .finish()
    }
}

impl RecentValues {
    /// Load up to [`DEFAULT_RECENT_LIMIT`] values from `port`.
    #[must_use]
    pub fn new(port: Arc<dyn PersistencePort>) -> Self {
        Self::with_limit(port, DEFAULT_RECENT_LIMIT)
    }

    /// Load up to `limit` values from `port`.
    #[must_use]
    pub fn with_limit(port: Arc<dyn PersistencePort>, limit: usize) -> Self {
        let (values, degraded) = match port.load() {
            Ok(stored) => (dedup(stored, limit), false),
            Err(err) => {
                tracing::warn!(
                    target: "fieldguard.persistence",
                    backend = port.name(),
                    error = %err,
                    "failed to load recent values; starting empty"
                );
                (Vec::new(), true)
            }
        };
        tracing::debug!(
            target: "fieldguard.persistence",
            backend = port.name(),
            count = values.len(),
            "recent values loaded"
        );
        Self {
            port,
            values,
            limit,
            degraded,
        }
    }

    /// Move `value` to the front. Blank values are ignored.
    ///
    /// Returns `true` if the list changed.
    pub fn record(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        let value = value.trim();
        if value.is_empty() || self.limit == 0 {
            return false;
        }
        if self.values.first().is_some_and(|v| v == value) {
            return false;
        }
        self.values.retain(|v| v != value);
        self.values.insert(0, value.to_owned());
        self.values.truncate(self.limit);
        self.persist();
        true
    }

    /// Forget `value`. Returns `true` if it was present.
    pub fn remove(&mut self, value: &str) -> bool {
        let before = self.values.len();
        self.values.retain(|v| v != value);
        if self.values.len() == before {
            return false;
        }
        self.persist();
        true
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        if self.values.is_empty() {
            return;
        }
        self.values.clear();
        self.persist();
    }

    /// Values, most recent first.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Values starting with `prefix`, compared case-insensitively.
    pub fn matching<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let prefix = prefix.to_lowercase();
        self.values
            .iter()
            .filter(move |v| v.to_lowercase().starts_with(&prefix))
            .map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether a load or save has failed since construction.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    fn persist(&mut self) {
        if let Err(err) = self.port.save(&self.values) {
            tracing::warn!(
                target: "fieldguard.persistence",
                backend = self.port.name(),
                error = %err,
                "failed to save recent values; keeping them in memory"
            );
            self.degraded = true;
        }
    }
}

fn dedup(stored: Vec<String>, limit: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(limit.min(stored.len()));
    for value in stored {
        if out.len() == limit {
            break;
        }
        if !value.trim().is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}
