#![forbid(unsafe_code)]

//! Screen-reader announcements for validation transitions.
//!
//! [`compose_announcement`] turns a transition into one sentence.
//! [`LiveRegion`] holds the single string rendered inside a polite live
//! region and decides when it changes:
//!
//! - a new announcement replaces any pending one; nothing is queued;
//! - text is published only after it has been pending for `settle`, so a
//!   burst of transitions surfaces only its last sentence;
//! - published text is cleared after `clear_after`;
//! - announcing the text already shown publishes `""` first and the text
//!   again one settle later, which makes screen readers repeat it.

use std::time::Duration;

use web_time::Instant;

use crate::i18n::{Translator, keys};
use crate::result::Severity;
use crate::rules::RuleStatus;
use crate::state::ValidationStatus;

/// Default quiet period before pending text is published.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(100);

/// Default lifetime of published text.
pub const DEFAULT_CLEAR_AFTER: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone)]
struct Pending {
    text: String,
    since: Instant,
}

/// The single live-region string of a field.
#[derive(Debug, Clone)]
pub struct LiveRegion {
    settle: Duration,
    clear_after: Duration,
    pending: Option<Pending>,
    current: String,
    published_at: Option<Instant>,
    replaced: u64,
    published: u64,
}

impl Default for LiveRegion {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE, DEFAULT_CLEAR_AFTER)
    }
}

impl LiveRegion {
    /// Create a live region with explicit timings.
    #[must_use]
    pub fn new(settle: Duration, clear_after: Duration) -> Self {
        Self {
            settle,
            clear_after,
            pending: None,
            current: String::new(),
            published_at: None,
            replaced: 0,
            published: 0,
        }
    }

    /// Queue `text` for publication, replacing anything still pending.
    pub fn announce_at(&mut self, text: impl Into<String>, now: Instant) {
        if self.pending.is_some() {
            self.replaced += 1;
        }
        self.pending = Some(Pending {
            text: text.into(),
            since: now,
        });
    }

    /// [`LiveRegion::announce_at`] using the current time.
    pub fn announce(&mut self, text: impl Into<String>) {
        self.announce_at(text, Instant::now());
    }

    /// Advance the region's clock.
    ///
    /// Returns the new live-region text when it changed, including `""`
    /// for a clear.
    pub fn tick_at(&mut self, now: Instant) -> Option<String> {
        if let Some(pending) = &self.pending
            && now.saturating_duration_since(pending.since) >= self.settle
        {
            let Some(pending) = self.pending.take() else {
                return None;
            };
            if !pending.text.is_empty() && pending.text == self.current {
                // blank first, re-publish after another settle
                self.current.clear();
                self.published_at = None;
                self.pending = Some(Pending {
                    text: pending.text,
                    since: now,
                });
                return Some(String::new());
            }
            self.current = pending.text;
            self.published_at = (!self.current.is_empty()).then_some(now);
            self.published += 1;
            tracing::debug!(
                target: "fieldguard.announcer",
                text = %self.current,
                "live region updated"
            );
            return Some(self.current.clone());
        }

        if self.pending.is_none()
            && let Some(at) = self.published_at
            && now.saturating_duration_since(at) >= self.clear_after
        {
            self.current.clear();
            self.published_at = None;
            return Some(String::new());
        }
        None
    }

    /// [`LiveRegion::tick_at`] using the current time.
    pub fn tick(&mut self) -> Option<String> {
        self.tick_at(Instant::now())
    }

    /// The text currently rendered in the live region.
    #[must_use]
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Text waiting for its settle period, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.text.as_str())
    }

    /// Time until the next change `tick_at` would make.
    #[must_use]
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        if let Some(pending) = &self.pending {
            let deadline = pending.since + self.settle;
            return Some(deadline.saturating_duration_since(now));
        }
        self.published_at
            .map(|at| (at + self.clear_after).saturating_duration_since(now))
    }

    /// Drop pending text and blank the region.
    pub fn clear(&mut self) {
        self.pending = None;
        self.current.clear();
        self.published_at = None;
    }

    /// Announcements replaced before being published.
    #[must_use]
    pub fn replaced_count(&self) -> u64 {
        self.replaced
    }

    /// Announcements published (re-announcements included).
    #[must_use]
    pub fn published_count(&self) -> u64 {
        self.published
    }
}

/// Inputs for [`compose_announcement`].
#[derive(Clone, Copy)]
pub struct AnnouncementContext<'a> {
    /// Human-readable field name.
    pub field: &'a str,
    /// The status just entered.
    pub status: ValidationStatus,
    /// The error message, for `Invalid`.
    pub error: Option<&'a str>,
    /// Per-rule outcomes of the attempt.
    pub rules: &'a [RuleStatus],
    pub translator: &'a dyn Translator,
    pub locale: &'a str,
}

/// One sentence describing a transition, with per-requirement detail.
#[must_use]
pub fn compose_announcement(ctx: &AnnouncementContext<'_>) -> String {
    let t = |key: &str, params: &[(&str, &str)]| -> String {
        ctx.translator.translate_or_key(key, ctx.locale, params)
    };
    let field = [("field", ctx.field)];

    let mut parts = vec![match ctx.status {
        ValidationStatus::Idle => t(keys::CLEARED, &field),
        ValidationStatus::Validating => t(keys::VALIDATING, &field),
        ValidationStatus::Valid => t(keys::VALID, &field),
        ValidationStatus::Invalid => t(
            keys::INVALID,
            &[("field", ctx.field), ("error", ctx.error.unwrap_or_default())],
        ),
        ValidationStatus::Error => t(keys::ERROR, &field),
    }];

    let requirements: Vec<&RuleStatus> = ctx
        .rules
        .iter()
        .filter(|r| r.severity == Severity::Error)
        .collect();
    if ctx.status.is_settled() && !requirements.is_empty() {
        let passed = requirements.iter().filter(|r| r.passed).count().to_string();
        let total = requirements.len().to_string();
        parts.push(t(
            keys::REQUIREMENTS,
            &[("passed", passed.as_str()), ("total", total.as_str())],
        ));
        let missing: Vec<&str> = requirements
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.label.as_str())
            .collect();
        if !missing.is_empty() {
            let labels = missing.join(", ");
            parts.push(t(keys::MISSING, &[("labels", labels.as_str())]));
        }
    }

    parts.join(". ")
}
