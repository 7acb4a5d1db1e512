#![forbid(unsafe_code)]

//! Thread-backed driver for blocking external validators.
//!
//! [`SharedFieldValidator`] wraps a [`FieldValidator`] in `Arc<Mutex<_>>`
//! and runs each [`ValidationRequest`] on its own worker thread. Workers
//! report back through [`FieldValidator::complete_at`], so results that
//! arrive out of order are filtered by the same attempt check as in the
//! single-threaded case. The lock is never held while a validator runs.
//!
//! A validator that panics is reported as a [`ValidatorRejection`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use web_time::Instant;

use crate::fault::contain;
use crate::field::{FieldValidator, Resolution, RetryError, ValidatorOutcome};
use crate::result::ValidatorRejection;
use crate::sequencer::ValidationRequest;
use crate::state::FieldSnapshot;

/// A blocking external validator.
///
/// Implementations own their timeouts; the driver imposes none.
pub trait AsyncValidator: Send + Sync {
    fn validate(&self, value: &str) -> ValidatorOutcome;
}

impl<F> AsyncValidator for F
where
    F: Fn(&str) -> ValidatorOutcome + Send + Sync,
{
    fn validate(&self, value: &str) -> ValidatorOutcome {
        self(value)
    }
}

/// Handle to a validator run on a worker thread.
#[derive(Debug)]
pub struct PendingValidation {
    inner: Pending,
}

#[derive(Debug)]
enum Pending {
    Running(JoinHandle<Resolution>),
    Ready(Resolution),
}

impl PendingValidation {
    /// Wait for the worker and return what happened to its resolution.
    pub fn join(self) -> thread::Result<Resolution> {
        match self.inner {
            Pending::Running(handle) => handle.join(),
            Pending::Ready(resolution) => Ok(resolution),
        }
    }

    /// Check if the worker has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        match &self.inner {
            Pending::Running(handle) => handle.is_finished(),
            Pending::Ready(_) => true,
        }
    }
}

/// A [`FieldValidator`] shared with validator worker threads.
#[derive(Clone)]
pub struct SharedFieldValidator {
    field: Arc<Mutex<FieldValidator>>,
    validator: Arc<dyn AsyncValidator>,
}

impl std::fmt::Debug for SharedFieldValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedFieldValidator")
            .field("field", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl SharedFieldValidator {
    /// Drive `field` with `validator`. The field is switched to external
    /// validation.
    #[must_use]
    pub fn new(field: FieldValidator, validator: Arc<dyn AsyncValidator>) -> Self {
        Self {
            field: Arc::new(Mutex::new(field.with_external_validator(true))),
            validator,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FieldValidator> {
        self.field.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the field.
    pub fn with_field<R>(&self, f: impl FnOnce(&mut FieldValidator) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn input_at(&self, value: impl Into<String>, now: Instant) {
        self.lock().input_at(value, now);
    }

    pub fn input(&self, value: impl Into<String>) {
        self.input_at(value, Instant::now());
    }

    /// Advance timers; a debounce fire that needs the validator spawns a worker.
    pub fn tick_at(&self, now: Instant) -> Option<PendingValidation> {
        let request = self.lock().tick_at(now)?;
        Some(self.spawn(request))
    }

    pub fn tick(&self) -> Option<PendingValidation> {
        self.tick_at(Instant::now())
    }

    /// Validate immediately, skipping the rest of the debounce window.
    pub fn validate_now(&self) -> Option<PendingValidation> {
        let request = self.lock().validate_now_at(Instant::now())?;
        Some(self.spawn(request))
    }

    /// Retry the current value, bypassing the cache.
    pub fn retry(&self) -> Result<Option<PendingValidation>, RetryError> {
        let request = self.lock().retry_at(Instant::now())?;
        Ok(request.map(|r| self.spawn(r)))
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn reset(&self) {
        self.lock().reset();
    }

    pub fn dispose(&self) {
        self.lock().dispose();
    }

    #[must_use]
    pub fn snapshot(&self) -> FieldSnapshot {
        self.lock().snapshot()
    }

    fn spawn(&self, request: ValidationRequest) -> PendingValidation {
        let field = Arc::clone(&self.field);
        let validator = Arc::clone(&self.validator);
        let attempt = request.attempt;
        let run = move || {
            let outcome = contain(|| validator.validate(&request.value)).unwrap_or_else(
                |panic| Err(ValidatorRejection::new(format!("validator panicked: {panic}"))),
            );
            field
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .complete_at(attempt, outcome, Instant::now())
        };
        let inner = match thread::Builder::new()
            .name("fieldguard-validator".to_owned())
            .spawn(run)
        {
            Ok(handle) => Pending::Running(handle),
            Err(err) => {
                tracing::warn!(
                    target: "fieldguard.field",
                    attempt = attempt.raw(),
                    error = %err,
                    "failed to spawn validator thread"
                );
                let resolution = self.lock().complete_at(
                    attempt,
                    Err(ValidatorRejection::new(format!("spawn failed: {err}"))),
                    Instant::now(),
                );
                Pending::Ready(resolution)
            }
        };
        PendingValidation { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationConfig;
    use crate::result::ValidatorVerdict;
    use crate::state::ValidationStatus;
    use std::sync::mpsc;
    use std::time::Duration;

    fn field() -> FieldValidator {
        FieldValidator::new("Code", ValidationConfig::default().with_debounce(Duration::ZERO))
    }

    #[test]
    fn worker_result_is_applied() {
        let shared = SharedFieldValidator::new(
            field(),
            Arc::new(|value: &str| -> ValidatorOutcome {
                Ok(ValidatorVerdict {
                    is_valid: value == "ok",
                    message: None,
                })
            }),
        );
        shared.input("ok");
        let handle = shared.tick().unwrap();
        assert_eq!(
            handle.join().unwrap(),
            Resolution::Applied(ValidationStatus::Valid)
        );
        assert!(shared.snapshot().is_valid);
    }

    #[test]
    fn slow_older_worker_is_discarded() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let shared = SharedFieldValidator::new(
            field(),
            Arc::new(move |value: &str| -> ValidatorOutcome {
                if value == "slow" {
                    let _ = release_rx.lock().unwrap().recv();
                    Ok(ValidatorVerdict::invalid("slow says no"))
                } else {
                    Ok(ValidatorVerdict::valid())
                }
            }),
        );

        shared.input("slow");
        let slow = shared.tick().unwrap();
        shared.input("fast");
        let fast = shared.tick().unwrap();

        assert_eq!(
            fast.join().unwrap(),
            Resolution::Applied(ValidationStatus::Valid)
        );
        release_tx.send(()).unwrap();
        assert_eq!(slow.join().unwrap(), Resolution::Stale);
        assert_eq!(shared.snapshot().status, ValidationStatus::Valid);
    }

    #[test]
    fn panicking_validator_becomes_error_state() {
        let shared = SharedFieldValidator::new(
            field(),
            Arc::new(|_: &str| -> ValidatorOutcome { panic!("backend exploded") }),
        );
        shared.input("abc");
        let resolution = shared.tick().unwrap().join().unwrap();
        assert_eq!(resolution, Resolution::Applied(ValidationStatus::Error));
        assert_eq!(
            shared.snapshot().error.as_deref(),
            Some("Validation failed")
        );
    }

    #[test]
    fn with_field_exposes_trace() {
        let shared = SharedFieldValidator::new(
            field(),
            Arc::new(|_: &str| -> ValidatorOutcome { Ok(ValidatorVerdict::valid()) }),
        );
        shared.input("x");
        shared.tick().unwrap().join().unwrap();
        let applied = shared.with_field(|f| f.trace().count("applied"));
        assert_eq!(applied, 1);
    }
}
