#![forbid(unsafe_code)]

//! Lifecycle trace for a field's validation attempts.
//!
//! Every field records what happened to each attempt: started, served from
//! cache, completed, applied, discarded as stale, rejected by the external
//! validator, or cleared. The trace is the audit trail behind the
//! "freshest attempt wins" guarantee and can be checksummed for regression
//! tests.

use std::collections::VecDeque;
use std::hash::{DefaultHasher, Hash, Hasher};

use crate::sequencer::AttemptId;

/// Events kept per field before the oldest are dropped.
pub const TRACE_CAPACITY: usize = 1024;

/// An event in the validation lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValidationEvent {
    /// The debounce fired and an attempt was issued.
    Started {
        attempt: AttemptId,
        /// Milliseconds since the field was created.
        elapsed_ms: u64,
    },
    /// An attempt still in flight was overtaken by a newer one.
    Superseded {
        attempt: AttemptId,
        superseded_by: AttemptId,
        elapsed_ms: u64,
    },
    /// The attempt was answered from the result cache.
    CacheHit { attempt: AttemptId, elapsed_ms: u64 },
    /// The attempt produced a result (applied or not).
    Completed {
        attempt: AttemptId,
        is_valid: bool,
        elapsed_ms: u64,
    },
    /// The result became the field's visible result.
    Applied {
        attempt: AttemptId,
        is_valid: bool,
        elapsed_ms: u64,
    },
    /// The result arrived after a newer attempt was issued and was dropped.
    StaleDiscarded {
        attempt: AttemptId,
        /// The current attempt when the result arrived.
        current: AttemptId,
        elapsed_ms: u64,
    },
    /// The external validator rejected.
    Rejected { attempt: AttemptId, elapsed_ms: u64 },
    /// The field was cleared or reset; `last` is the last id issued.
    Cleared { last: AttemptId, elapsed_ms: u64 },
}

impl ValidationEvent {
    /// The attempt this event concerns.
    #[must_use]
    pub fn attempt(&self) -> AttemptId {
        match self {
            Self::Started { attempt, .. }
            | Self::Superseded { attempt, .. }
            | Self::CacheHit { attempt, .. }
            | Self::Completed { attempt, .. }
            | Self::Applied { attempt, .. }
            | Self::StaleDiscarded { attempt, .. }
            | Self::Rejected { attempt, .. } => *attempt,
            Self::Cleared { last, .. } => *last,
        }
    }

    /// The event type name for logging.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Superseded { .. } => "superseded",
            Self::CacheHit { .. } => "cache_hit",
            Self::Completed { .. } => "completed",
            Self::Applied { .. } => "applied",
            Self::StaleDiscarded { .. } => "stale_discarded",
            Self::Rejected { .. } => "rejected",
            Self::Cleared { .. } => "cleared",
        }
    }
}

/// Bounded, ordered log of [`ValidationEvent`]s.
#[derive(Debug, Clone)]
pub struct ValidationTrace {
    events: VecDeque<ValidationEvent>,
    capacity: usize,
    dropped: u64,
}

impl Default for ValidationTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationTrace {
    /// Create a trace holding up to [`TRACE_CAPACITY`] events.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(TRACE_CAPACITY)
    }

    /// Create a trace holding up to `capacity` events (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    /// Record an event, dropping the oldest if full.
    pub fn push(&mut self, event: ValidationEvent) {
        if self.events.len() >= self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
    }

    /// All retained events, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &ValidationEvent> {
        self.events.iter()
    }

    /// Events concerning one attempt.
    #[must_use]
    pub fn events_for(&self, attempt: AttemptId) -> Vec<&ValidationEvent> {
        self.events.iter().filter(|e| e.attempt() == attempt).collect()
    }

    /// Check if an event of `event_type` was recorded for `attempt`.
    #[must_use]
    pub fn contains_event_type(&self, attempt: AttemptId, event_type: &str) -> bool {
        self.events
            .iter()
            .any(|e| e.attempt() == attempt && e.event_type() == event_type)
    }

    /// Number of events of `event_type`.
    #[must_use]
    pub fn count(&self, event_type: &str) -> usize {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }

    /// Checksum of all retained events, for golden comparison.
    #[must_use]
    pub fn checksum(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for event in &self.events {
            event.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Number of retained events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the trace is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events dropped to honor the capacity.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Clear all events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Verify trace invariants, returning one description per violation.
    ///
    /// 1. `Started` ids are strictly increasing.
    /// 2. `StaleDiscarded` only for attempts older than the current one
    ///    (or when nothing is current after a clear).
    /// 3. `Applied` never follows a `Superseded` for the same attempt.
    #[must_use]
    pub fn verify_invariants(&self) -> Vec<String> {
        let mut violations = Vec::new();

        let mut last_started = AttemptId::NONE;
        for event in &self.events {
            if let ValidationEvent::Started { attempt, .. } = event {
                if *attempt <= last_started {
                    violations.push(format!(
                        "Non-monotonic start: {attempt} after {last_started}"
                    ));
                }
                last_started = *attempt;
            }
        }

        for event in &self.events {
            if let ValidationEvent::StaleDiscarded {
                attempt, current, ..
            } = event
                && !current.is_none()
                && attempt >= current
            {
                violations.push(format!(
                    "StaleDiscarded with non-stale attempt: {attempt} >= {current}"
                ));
            }
        }

        let mut superseded = Vec::new();
        for event in &self.events {
            match event {
                ValidationEvent::Superseded { attempt, .. } => superseded.push(*attempt),
                ValidationEvent::Applied { attempt, .. } if superseded.contains(attempt) => {
                    violations.push(format!("Applied after supersession: {attempt}"));
                }
                _ => {}
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> AttemptId {
        AttemptId::from_raw(n)
    }

    #[test]
    fn event_type_names() {
        let cases = [
            (
                ValidationEvent::Started {
                    attempt: id(1),
                    elapsed_ms: 0,
                },
                "started",
            ),
            (
                ValidationEvent::Superseded {
                    attempt: id(1),
                    superseded_by: id(2),
                    elapsed_ms: 0,
                },
                "superseded",
            ),
            (
                ValidationEvent::CacheHit {
                    attempt: id(1),
                    elapsed_ms: 0,
                },
                "cache_hit",
            ),
            (
                ValidationEvent::Rejected {
                    attempt: id(1),
                    elapsed_ms: 0,
                },
                "rejected",
            ),
            (
                ValidationEvent::Cleared {
                    last: id(1),
                    elapsed_ms: 0,
                },
                "cleared",
            ),
        ];
        for (event, name) in cases {
            assert_eq!(event.event_type(), name);
            assert_eq!(event.attempt(), id(1));
        }
    }

    #[test]
    fn capacity_drops_oldest() {
        let mut trace = ValidationTrace::with_capacity(2);
        for n in 1..=3 {
            trace.push(ValidationEvent::Started {
                attempt: id(n),
                elapsed_ms: n,
            });
        }
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.dropped(), 1);
        assert!(!trace.contains_event_type(id(1), "started"));
        assert!(trace.contains_event_type(id(3), "started"));
    }

    #[test]
    fn checksum_is_deterministic_and_order_sensitive() {
        let a = ValidationEvent::Started {
            attempt: id(1),
            elapsed_ms: 10,
        };
        let b = ValidationEvent::Applied {
            attempt: id(1),
            is_valid: true,
            elapsed_ms: 20,
        };

        let mut t1 = ValidationTrace::new();
        let mut t2 = ValidationTrace::new();
        let mut t3 = ValidationTrace::new();
        t1.push(a.clone());
        t1.push(b.clone());
        t2.push(a.clone());
        t2.push(b.clone());
        t3.push(b);
        t3.push(a);

        assert_eq!(t1.checksum(), t2.checksum());
        assert_ne!(t1.checksum(), t3.checksum());
    }

    #[test]
    fn detects_non_monotonic_start() {
        let mut trace = ValidationTrace::new();
        trace.push(ValidationEvent::Started {
            attempt: id(2),
            elapsed_ms: 0,
        });
        trace.push(ValidationEvent::Started {
            attempt: id(1),
            elapsed_ms: 1,
        });
        assert_eq!(trace.verify_invariants().len(), 1);
    }

    #[test]
    fn detects_bad_stale_discard() {
        let mut trace = ValidationTrace::new();
        trace.push(ValidationEvent::StaleDiscarded {
            attempt: id(3),
            current: id(2),
            elapsed_ms: 0,
        });
        assert_eq!(trace.verify_invariants().len(), 1);
    }

    #[test]
    fn detects_apply_after_supersession() {
        let mut trace = ValidationTrace::new();
        trace.push(ValidationEvent::Superseded {
            attempt: id(1),
            superseded_by: id(2),
            elapsed_ms: 0,
        });
        trace.push(ValidationEvent::Applied {
            attempt: id(1),
            is_valid: true,
            elapsed_ms: 1,
        });
        assert_eq!(trace.verify_invariants().len(), 1);
    }

    #[test]
    fn stale_discard_after_clear_is_allowed() {
        let mut trace = ValidationTrace::new();
        trace.push(ValidationEvent::StaleDiscarded {
            attempt: id(4),
            current: AttemptId::NONE,
            elapsed_ms: 0,
        });
        assert!(trace.verify_invariants().is_empty());
    }
}
