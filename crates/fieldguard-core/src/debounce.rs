#![forbid(unsafe_code)]

//! Debounce scheduling for keystroke-driven validation.
//!
//! A field receives a burst of input changes while the user types. The
//! [`Debouncer`] coalesces the burst into a single "commit" once the input has
//! been quiet for the configured delay.
//!
//! # Design
//!
//! The debouncer uses a "latest wins" strategy:
//! - Scheduling while a timer is pending replaces both the value and the
//!   deadline. The replaced value never fires.
//! - At most one timer is pending at a time.
//!
//! The debouncer never sleeps. The owner drives it by calling
//! [`Debouncer::poll_at`] from its event loop (or [`Debouncer::poll`] with
//! the wall clock), which returns the committed value once the deadline has
//! passed.
//!
//! # Usage
//!
//! ```
//! use std::time::Duration;
//! use web_time::Instant;
//! use fieldguard_core::debounce::Debouncer;
//!
//! let start = Instant::now();
//! let mut debouncer = Debouncer::new();
//!
//! debouncer.schedule_at("a", Duration::from_millis(300), start);
//! debouncer.schedule_at("ab", Duration::from_millis(300), start + Duration::from_millis(100));
//!
//! // Still inside the quiet window of the second keystroke.
//! assert_eq!(debouncer.poll_at(start + Duration::from_millis(350)), None);
//! // Quiet window elapsed: only the latest value fires.
//! assert_eq!(debouncer.poll_at(start + Duration::from_millis(400)), Some("ab"));
//! assert!(!debouncer.has_pending());
//! ```

use std::time::Duration;

use web_time::Instant;

#[inline]
fn duration_since_or_zero(now: Instant, earlier: Instant) -> Duration {
    now.checked_duration_since(earlier)
        .unwrap_or(Duration::ZERO)
}

/// A pending debounce timer.
#[derive(Debug, Clone)]
struct PendingFire<T> {
    value: T,
    scheduled_at: Instant,
    delay: Duration,
}

impl<T> PendingFire<T> {
    fn deadline(&self) -> Instant {
        self.scheduled_at + self.delay
    }
}

/// Coalesces a stream of values into one commit after a quiet period.
///
/// # Thread Safety
///
/// `Debouncer` is not thread-safe. It is owned by exactly one field.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    pending: Option<PendingFire<T>>,
    /// Number of schedules replaced before they fired.
    coalesced: u64,
    /// Number of commits delivered.
    fired: u64,
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debouncer<T> {
    /// Create a debouncer with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: None,
            coalesced: 0,
            fired: 0,
        }
    }

    /// Schedule `value` to fire after `delay` of quiet, measured from now.
    pub fn schedule(&mut self, value: T, delay: Duration) {
        self.schedule_at(value, delay, Instant::now());
    }

    /// Schedule `value` to fire after `delay` of quiet, measured from `now`.
    ///
    /// Replaces any pending timer without firing it.
    pub fn schedule_at(&mut self, value: T, delay: Duration, now: Instant) {
        if self.pending.is_some() {
            self.coalesced = self.coalesced.saturating_add(1);
            tracing::trace!(
                target: "fieldguard.debounce",
                coalesced = self.coalesced,
                "pending commit replaced"
            );
        }
        self.pending = Some(PendingFire {
            value,
            scheduled_at: now,
            delay,
        });
    }

    /// Fire the pending value if its quiet period has elapsed, using the wall clock.
    pub fn poll(&mut self) -> Option<T> {
        self.poll_at(Instant::now())
    }

    /// Fire the pending value if its quiet period has elapsed at `now`.
    ///
    /// Returns the value exactly once; the timer is cleared when it fires.
    pub fn poll_at(&mut self, now: Instant) -> Option<T> {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|pending| now >= pending.deadline());
        if !due {
            return None;
        }
        self.fired = self.fired.saturating_add(1);
        self.pending.take().map(|pending| pending.value)
    }

    /// Fire the pending value immediately regardless of the deadline.
    pub fn flush(&mut self) -> Option<T> {
        let pending = self.pending.take()?;
        self.fired = self.fired.saturating_add(1);
        Some(pending.value)
    }

    /// Clear any pending timer without firing it.
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            tracing::trace!(target: "fieldguard.debounce", "pending commit cancelled");
        }
    }

    /// Check if a timer is pending.
    #[inline]
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The value waiting to fire, if any.
    #[must_use]
    pub fn pending_value(&self) -> Option<&T> {
        self.pending.as_ref().map(|pending| &pending.value)
    }

    /// Time remaining until the pending value fires.
    ///
    /// Returns `None` when nothing is pending and `Duration::ZERO` when overdue.
    #[must_use]
    pub fn time_until_fire(&self, now: Instant) -> Option<Duration> {
        let pending = self.pending.as_ref()?;
        let elapsed = duration_since_or_zero(now, pending.scheduled_at);
        Some(pending.delay.saturating_sub(elapsed))
    }

    /// Number of schedules that were replaced before firing.
    #[must_use]
    pub fn coalesced_count(&self) -> u64 {
        self.coalesced
    }

    /// Number of commits delivered.
    #[must_use]
    pub fn fired_count(&self) -> u64 {
        self.fired
    }
}
