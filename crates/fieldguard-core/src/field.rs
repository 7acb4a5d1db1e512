#![forbid(unsafe_code)]

//! Per-field validation orchestrator.
//!
//! [`FieldValidator`] owns everything one input field needs to validate
//! itself: the debounce timer, the attempt sequencer, the result cache, the
//! status state machine, the trace, telemetry hooks and the live region.
//! Nothing is shared between fields.
//!
//! # Driving a field
//!
//! The validator never sleeps and never spawns. The host feeds it input
//! with [`FieldValidator::input_at`] and advances it with
//! [`FieldValidator::tick_at`]. When a debounce fire needs the external
//! validator, `tick_at` returns a [`ValidationRequest`]; the host runs the
//! validator however it likes and reports back with
//! [`FieldValidator::complete_at`].
//!
//! ```text
//! input ─▶ Debouncer ─▶ Sequencer ─▶ cache hit? ──yes──▶ apply
//!                                        │ no
//!                                        ▼
//!                                    evaluate rules ──errors / no validator──▶ apply
//!                                        │ passed
//!                                        ▼
//!                          ValidationRequest ─▶ host ─▶ complete_at ─▶ current? ─▶ apply
//!                                                                         │ no
//!                                                                         ▼
//!                                                                    discard (stale)
//! ```
//!
//! # Invariants
//!
//! 1. The visible result always belongs to the highest attempt id that has
//!    resolved; a lower id resolving later is discarded.
//! 2. At most one debounce timer is pending.
//! 3. After `clear`, `reset` or `dispose`, no earlier attempt can apply.
//! 4. Rejections are never cached.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use web_time::Instant;
//! use fieldguard_core::config::ValidationConfig;
//! use fieldguard_core::field::{FieldValidator, Resolution};
//! use fieldguard_core::result::ValidatorVerdict;
//! use fieldguard_core::state::ValidationStatus;
//!
//! let t0 = Instant::now();
//! let mut field = FieldValidator::new("Username", ValidationConfig::default())
//!     .with_external_validator(true);
//!
//! field.input_at("ali", t0);
//! field.input_at("alice", t0 + Duration::from_millis(100));
//! assert!(field.tick_at(t0 + Duration::from_millis(200)).is_none());
//!
//! let request = field.tick_at(t0 + Duration::from_millis(400)).unwrap();
//! assert_eq!(request.value, "alice");
//! assert_eq!(field.status(), ValidationStatus::Validating);
//!
//! let outcome = field.complete_at(request.attempt, Ok(ValidatorVerdict::valid()), t0);
//! assert_eq!(outcome, Resolution::Applied(ValidationStatus::Valid));
//! assert!(field.snapshot().is_valid);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use web_time::Instant;

use crate::announcer::{AnnouncementContext, LiveRegion, compose_announcement};
use crate::cache::{CacheStats, ResultCache};
use crate::config::ValidationConfig;
use crate::debounce::Debouncer;
use crate::i18n::{Catalog, Translator, keys};
use crate::result::{ValidationResult, ValidatorRejection, ValidatorVerdict};
use crate::rules::{Rule, RuleReport, RuleSet, RuleSetError, RuleStatus, evaluate};
use crate::sequencer::{AttemptId, Sequencer, ValidationRequest};
use crate::state::{
    FieldSnapshot, FieldValidationState, VALIDATION_FAILED_MESSAGE, ValidationStatus,
};
use crate::telemetry::{TelemetryError, ValidationHooks};
use crate::trace::{ValidationEvent, ValidationTrace};

/// What an external validator produced for an attempt.
pub type ValidatorOutcome = Result<ValidatorVerdict, ValidatorRejection>;

/// What happened to a reported resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The resolution became the visible result; the field entered this status.
    Applied(ValidationStatus),
    /// A newer attempt was issued first (or the field was cleared); dropped.
    Stale,
    /// The attempt is current but was not waiting on the external validator.
    NotAwaited,
}

/// Why a retry was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryError {
    /// The configured retry budget is spent.
    Exhausted { attempts: u32, max: u32 },
    /// There is no value to validate (empty, disabled or disposed).
    NothingToRetry,
}

impl fmt::Display for RetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { attempts, max } => {
                write!(f, "retry limit reached ({attempts} of {max})")
            }
            Self::NothingToRetry => f.write_str("nothing to retry"),
        }
    }
}

impl std::error::Error for RetryError {}

/// The attempt currently waiting on the external validator.
#[derive(Debug, Clone)]
struct Awaiting {
    attempt: AttemptId,
    value: String,
    report: RuleReport,
}

/// Validation orchestrator for one input field.
pub struct FieldValidator {
    label: String,
    config: ValidationConfig,
    rules: RuleSet,
    external: bool,
    value: String,
    state: FieldValidationState,
    debouncer: Debouncer<String>,
    sequencer: Sequencer,
    cache: ResultCache,
    awaiting: Option<Awaiting>,
    rule_statuses: Vec<RuleStatus>,
    hooks: ValidationHooks,
    translator: Arc<dyn Translator>,
    live_region: LiveRegion,
    trace: ValidationTrace,
    created_at: Instant,
    disposed: bool,
}

impl fmt::Debug for FieldValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldValidator")
            .field("label", &self.label)
            .field("value", &self.value)
            .field("status", &self.state.status())
            .field("current", &self.sequencer.current())
            .field("pending", &self.debouncer.has_pending())
            .field("awaiting", &self.awaiting.as_ref().map(|a| a.attempt))
            .field("rules", &self.rules.len())
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl FieldValidator {
    /// Create a field with no rules and no external validator.
    #[must_use]
    pub fn new(label: impl Into<String>, config: ValidationConfig) -> Self {
        Self::new_at(label, config, Instant::now())
    }

    /// Create a field whose trace clock starts at `now`.
    #[must_use]
    pub fn new_at(label: impl Into<String>, config: ValidationConfig, now: Instant) -> Self {
        Self {
            label: label.into(),
            cache: ResultCache::new(config.effective_cache_capacity()),
            live_region: LiveRegion::new(config.announce_settle, config.announce_clear_after),
            config,
            rules: RuleSet::empty(),
            external: false,
            value: String::new(),
            state: FieldValidationState::new(),
            debouncer: Debouncer::new(),
            sequencer: Sequencer::new(),
            awaiting: None,
            rule_statuses: Vec::new(),
            hooks: ValidationHooks::new(),
            translator: Arc::new(Catalog::default()),
            trace: ValidationTrace::new(),
            created_at: now,
            disposed: false,
        }
    }

    /// Install the rule set, narrowed to the configured active rules.
    #[must_use]
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = match &self.config.active_rules {
            Some(active) => rules.only(active.as_slice()),
            None => rules,
        };
        self
    }

    /// Append one rule outside the active-rule filter.
    pub fn with_rule(mut self, rule: Rule) -> Result<Self, RuleSetError> {
        self.rules.push(rule)?;
        Ok(self)
    }

    /// Whether attempts that pass the rules go on to an external validator.
    #[must_use]
    pub fn with_external_validator(mut self, enabled: bool) -> Self {
        self.external = enabled;
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: ValidationHooks) -> Self {
        self.hooks = hooks;
        self
    }

    #[must_use]
    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    // -- Input -----------------------------------------------------------

    /// Record a new value and (re)start the debounce timer.
    ///
    /// An empty value cancels the timer, retires outstanding attempts and
    /// returns the field to `Idle`; the retry count survives. A disabled or disposed field only
    /// records the value.
    pub fn input_at(&mut self, value: impl Into<String>, now: Instant) {
        self.value = value.into();
        if self.disposed || !self.config.enabled {
            return;
        }
        if self.value.is_empty() {
            self.debouncer.cancel();
            self.go_idle(now, false);
            return;
        }
        self.debouncer
            .schedule_at(self.value.clone(), self.config.debounce, now);
    }

    /// [`FieldValidator::input_at`] using the current time.
    pub fn input(&mut self, value: impl Into<String>) {
        self.input_at(value, Instant::now());
    }

    /// Advance timers. Returns a request when the external validator must run.
    pub fn tick_at(&mut self, now: Instant) -> Option<ValidationRequest> {
        let request = if self.disposed {
            None
        } else {
            self.debouncer
                .poll_at(now)
                .and_then(|value| self.start_attempt(value, now, false))
        };
        if let Some(text) = self.live_region.tick_at(now)
            && !text.is_empty()
        {
            self.hooks.fire_announcement(&text);
        }
        request
    }

    /// [`FieldValidator::tick_at`] using the current time.
    pub fn tick(&mut self) -> Option<ValidationRequest> {
        self.tick_at(Instant::now())
    }

    /// Validate immediately, skipping the rest of the debounce window.
    pub fn validate_now_at(&mut self, now: Instant) -> Option<ValidationRequest> {
        if self.disposed || !self.config.enabled {
            return None;
        }
        let value = match self.debouncer.flush() {
            Some(value) => value,
            None if !self.value.is_empty() => self.value.clone(),
            None => return None,
        };
        self.start_attempt(value, now, false)
    }

    /// [`FieldValidator::validate_now_at`] using the current time.
    pub fn validate_now(&mut self) -> Option<ValidationRequest> {
        self.validate_now_at(Instant::now())
    }

    /// Re-run validation of the current value, bypassing the cache.
    ///
    /// Refused once `retry_count` reaches the configured maximum. A valid
    /// result resets the count.
    pub fn retry_at(&mut self, now: Instant) -> Result<Option<ValidationRequest>, RetryError> {
        if self.disposed || !self.config.enabled || self.value.is_empty() {
            return Err(RetryError::NothingToRetry);
        }
        let attempts = self.state.retry_count();
        if attempts >= self.config.max_retries {
            return Err(RetryError::Exhausted {
                attempts,
                max: self.config.max_retries,
            });
        }
        let count = self.state.increment_retry();
        self.hooks.fire_retry(count);
        self.debouncer.cancel();
        Ok(self.start_attempt(self.value.clone(), now, true))
    }

    /// [`FieldValidator::retry_at`] using the current time.
    pub fn retry(&mut self) -> Result<Option<ValidationRequest>, RetryError> {
        self.retry_at(Instant::now())
    }

    /// Report the external validator's outcome for `attempt`.
    pub fn complete_at(
        &mut self,
        attempt: AttemptId,
        outcome: ValidatorOutcome,
        now: Instant,
    ) -> Resolution {
        if !self.sequencer.is_current(attempt) {
            let current = self.sequencer.current();
            tracing::debug!(
                target: "fieldguard.field",
                field = %self.label,
                attempt = attempt.raw(),
                current = current.raw(),
                "discarding stale resolution"
            );
            self.record(now, |elapsed_ms| ValidationEvent::StaleDiscarded {
                attempt,
                current,
                elapsed_ms,
            });
            return Resolution::Stale;
        }
        let Some(awaiting) = self.awaiting.take_if(|a| a.attempt == attempt) else {
            return Resolution::NotAwaited;
        };

        match outcome {
            Ok(verdict) => {
                let result = self.merge_verdict(awaiting.report, verdict, now);
                self.record(now, |elapsed_ms| ValidationEvent::Completed {
                    attempt,
                    is_valid: result.is_valid,
                    elapsed_ms,
                });
                self.cache.put(awaiting.value, result.clone());
                self.apply(attempt, result, now)
            }
            Err(rejection) => self.reject(attempt, awaiting.report, rejection, now),
        }
    }

    /// [`FieldValidator::complete_at`] using the current time.
    pub fn complete(&mut self, attempt: AttemptId, outcome: ValidatorOutcome) -> Resolution {
        self.complete_at(attempt, outcome, Instant::now())
    }

    // -- Reset and teardown ----------------------------------------------

    /// Drop the value, validation state, cache and retry count.
    ///
    /// Idempotent.
    pub fn clear_at(&mut self, now: Instant) {
        self.value.clear();
        self.reset_at(now);
    }

    /// [`FieldValidator::clear_at`] using the current time.
    pub fn clear(&mut self) {
        self.clear_at(Instant::now());
    }

    /// Return to `Idle` keeping the value; empties the cache.
    pub fn reset_at(&mut self, now: Instant) {
        self.debouncer.cancel();
        self.cache.clear();
        self.go_idle(now, true);
    }

    /// [`FieldValidator::reset_at`] using the current time.
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    /// Tear the field down: cancel timers, retire attempts, blank the live
    /// region. Later input, ticks and resolutions are ignored.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.debouncer.cancel();
        self.sequencer.retire();
        self.awaiting = None;
        self.live_region.clear();
        self.disposed = true;
        tracing::debug!(target: "fieldguard.field", field = %self.label, "disposed");
    }

    // -- Accessors -------------------------------------------------------

    /// The outbound state contract.
    #[must_use]
    pub fn snapshot(&self) -> FieldSnapshot {
        self.state.snapshot()
    }

    #[must_use]
    pub fn status(&self) -> ValidationStatus {
        self.state.status()
    }

    #[must_use]
    pub fn state(&self) -> &FieldValidationState {
        &self.state
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Per-rule outcomes of the latest evaluated attempt.
    #[must_use]
    pub fn rule_statuses(&self) -> &[RuleStatus] {
        &self.rule_statuses
    }

    #[must_use]
    pub fn trace(&self) -> &ValidationTrace {
        &self.trace
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Check if a result is memoized for `value`.
    #[must_use]
    pub fn is_cached(&self, value: &str) -> bool {
        self.cache.contains(value)
    }

    #[must_use]
    pub fn live_region(&self) -> &LiveRegion {
        &self.live_region
    }

    /// The text to render in the polite live region.
    #[must_use]
    pub fn announcement(&self) -> &str {
        self.live_region.current()
    }

    /// The attempt waiting on the external validator, if any.
    #[must_use]
    pub fn awaiting(&self) -> Option<AttemptId> {
        self.awaiting.as_ref().map(|a| a.attempt)
    }

    #[must_use]
    pub fn has_pending_debounce(&self) -> bool {
        self.debouncer.has_pending()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Time until the next tick would change something.
    #[must_use]
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        match (
            self.debouncer.time_until_fire(now),
            self.live_region.time_until_next(now),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// The translator used for messages and announcements.
    #[must_use]
    pub fn translator(&self) -> &dyn Translator {
        self.translator.as_ref()
    }

    // -- Internals -------------------------------------------------------

    fn start_attempt(
        &mut self,
        value: String,
        now: Instant,
        bypass_cache: bool,
    ) -> Option<ValidationRequest> {
        let attempt = self.sequencer.next_attempt_id();
        if let Some(previous) = self.awaiting.take() {
            self.record(now, |elapsed_ms| ValidationEvent::Superseded {
                attempt: previous.attempt,
                superseded_by: attempt,
                elapsed_ms,
            });
        }
        self.record(now, |elapsed_ms| ValidationEvent::Started {
            attempt,
            elapsed_ms,
        });
        self.transition(FieldValidationState::begin, now);

        let request = ValidationRequest {
            value,
            attempt,
            enqueued_at: now,
        };
        self.hooks.fire_validation_started(&request);

        if !bypass_cache && let Some(cached) = self.cache.get(&request.value).cloned() {
            self.record(now, |elapsed_ms| ValidationEvent::CacheHit {
                attempt,
                elapsed_ms,
            });
            self.rule_statuses.clear();
            self.apply(attempt, cached, now);
            return None;
        }

        let report = evaluate(&request.value, &self.rules);
        for status in report.statuses.iter().filter(|s| s.faulted) {
            self.hooks.fire_error(&TelemetryError::RuleFaulted {
                attempt,
                rule: status.key.clone(),
            });
        }
        self.rule_statuses = report.statuses.clone();

        if self.external && report.is_valid() {
            self.awaiting = Some(Awaiting {
                attempt,
                value: request.value.clone(),
                report,
            });
            return Some(request);
        }

        let result = report.into_result(now);
        self.record(now, |elapsed_ms| ValidationEvent::Completed {
            attempt,
            is_valid: result.is_valid,
            elapsed_ms,
        });
        self.cache.put(request.value, result.clone());
        self.apply(attempt, result, now);
        None
    }

    fn merge_verdict(
        &self,
        report: RuleReport,
        verdict: ValidatorVerdict,
        now: Instant,
    ) -> ValidationResult {
        let mut errors = report.errors;
        if !verdict.is_valid {
            errors.push(verdict.message.clone().unwrap_or_else(|| {
                self.translator
                    .translate_or_key(keys::INVALID_VALUE, &self.config.locale, &[])
            }));
        }
        let mut result =
            ValidationResult::from_diagnostics(errors, report.warnings, report.suggestions, now);
        if verdict.is_valid
            && let Some(message) = verdict.message
        {
            result.message = message;
        }
        result
    }

    fn apply(&mut self, attempt: AttemptId, result: ValidationResult, now: Instant) -> Resolution {
        let is_valid = result.is_valid;
        if is_valid {
            self.state.reset_retries();
        }
        let settled = result.clone();
        self.transition(|state| state.settle(settled), now);
        self.record(now, |elapsed_ms| ValidationEvent::Applied {
            attempt,
            is_valid,
            elapsed_ms,
        });
        self.hooks.fire_validation_completed(&result);
        if is_valid {
            self.hooks.fire_success(&result);
        }
        Resolution::Applied(self.state.status())
    }

    fn reject(
        &mut self,
        attempt: AttemptId,
        report: RuleReport,
        rejection: ValidatorRejection,
        now: Instant,
    ) -> Resolution {
        tracing::warn!(
            target: "fieldguard.field",
            field = %self.label,
            attempt = attempt.raw(),
            reason = rejection.reason(),
            "external validator rejected"
        );
        self.record(now, |elapsed_ms| ValidationEvent::Rejected {
            attempt,
            elapsed_ms,
        });
        let message = self
            .translator
            .translate(keys::VALIDATION_FAILED, &self.config.locale, &[])
            .unwrap_or_else(|| VALIDATION_FAILED_MESSAGE.to_owned());
        let result = ValidationResult::from_diagnostics(
            vec![message],
            report.warnings,
            report.suggestions,
            now,
        );
        self.transition(|state| state.fail(result), now);
        self.hooks
            .fire_error(&TelemetryError::ValidatorRejected { attempt, rejection });
        Resolution::Applied(self.state.status())
    }

    fn go_idle(&mut self, now: Instant, drop_retries: bool) {
        self.sequencer.retire();
        self.awaiting = None;
        self.rule_statuses.clear();
        let was_idle = self.state.status() == ValidationStatus::Idle;
        if drop_retries {
            self.state.reset();
        } else {
            self.state.idle();
        }
        if !was_idle {
            let last = self.sequencer.last_issued();
            self.record(now, |elapsed_ms| ValidationEvent::Cleared { last, elapsed_ms });
            self.announce(now);
        }
    }

    fn transition<F, E>(&mut self, step: F, now: Instant)
    where
        F: FnOnce(&mut FieldValidationState) -> Result<(), E>,
        E: fmt::Display,
    {
        let from = self.state.status();
        if let Err(err) = step(&mut self.state) {
            tracing::error!(
                target: "fieldguard.field",
                field = %self.label,
                error = %err,
                "status transition refused"
            );
            return;
        }
        let to = self.state.status();
        tracing::debug!(
            target: "fieldguard.field",
            field = %self.label,
            from = from.as_str(),
            to = to.as_str(),
            "status transition"
        );
        if from != to {
            self.announce(now);
        }
    }

    fn announce(&mut self, now: Instant) {
        let snapshot = self.state.snapshot();
        let text = compose_announcement(&AnnouncementContext {
            field: &self.label,
            status: snapshot.status,
            error: snapshot.error.as_deref(),
            rules: &self.rule_statuses,
            translator: self.translator.as_ref(),
            locale: &self.config.locale,
        });
        self.live_region.announce_at(text, now);
    }

    fn record(&mut self, now: Instant, event: impl FnOnce(u64) -> ValidationEvent) {
        let elapsed = now.saturating_duration_since(self.created_at).as_millis();
        let elapsed_ms = u64::try_from(elapsed).unwrap_or(u64::MAX);
        self.trace.push(event(elapsed_ms));
    }
}
