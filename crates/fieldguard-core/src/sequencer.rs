#![forbid(unsafe_code)]

//! Attempt sequencing with id-based staleness detection.
//!
//! Every validation attempt for a field receives an [`AttemptId`] from the
//! field's [`Sequencer`]. When an attempt resolves, the field asks the
//! sequencer whether the attempt is still current. Results of superseded
//! attempts are dropped: in-flight work is never aborted, only ignored.
//!
//! # Invariants
//!
//! - Ids are strictly monotonic per sequencer: `id_n < id_{n+1}`.
//! - Id 0 is reserved for "no attempt".
//! - Exactly one id is current at a time; retiring the sequencer makes no
//!   issued id current.

use std::fmt;

use web_time::Instant;

/// A monotonically increasing id for one validation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttemptId(u64);

impl AttemptId {
    /// The null id representing no attempt.
    pub const NONE: Self = Self(0);

    /// Create an id from a raw value (for testing/deserialization).
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Check if this is the null id.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attempt({})", self.0)
    }
}

/// Issues attempt ids and answers "is this attempt still the latest?".
///
/// The counter is never rewound, not even by [`Sequencer::retire`], so an
/// attempt issued before a reset can never be mistaken for one issued after.
#[derive(Debug, Clone, Default)]
pub struct Sequencer {
    /// Highest raw id handed out (issued or retired).
    last: u64,
    /// The id results must match to be applied.
    current: AttemptId,
}

impl Sequencer {
    /// Create a sequencer that has issued nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new id strictly greater than every id issued so far.
    ///
    /// The new id becomes current; all earlier ids become stale.
    pub fn next_attempt_id(&mut self) -> AttemptId {
        self.last = self.last.saturating_add(1);
        self.current = AttemptId(self.last);
        self.current
    }

    /// Returns `true` iff `attempt` is the most recently issued id and the
    /// sequencer has not been retired since.
    #[must_use]
    pub fn is_current(&self, attempt: AttemptId) -> bool {
        !attempt.is_none() && attempt == self.current
    }

    /// The current id, or [`AttemptId::NONE`] if nothing is current.
    #[must_use]
    pub fn current(&self) -> AttemptId {
        self.current
    }

    /// The highest raw id consumed so far.
    #[must_use]
    pub fn last_issued(&self) -> AttemptId {
        AttemptId(self.last)
    }

    /// Make every outstanding attempt stale without issuing a new one.
    ///
    /// Used on clear, reset and teardown.
    pub fn retire(&mut self) {
        self.current = AttemptId::NONE;
    }
}

/// One validation attempt handed to the host when the debounce fires.
///
/// Requests are never mutated. A superseded request is not cancelled; its
/// eventual resolution is simply discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRequest {
    /// The value to validate.
    pub value: String,
    /// The attempt this request belongs to.
    pub attempt: AttemptId,
    /// When the attempt was issued.
    pub enqueued_at: Instant,
}
