#![forbid(unsafe_code)]

//! Best-effort fan-out of validation lifecycle events to caller callbacks.
//!
//! Hooks are registered with a builder and observe a field without being
//! able to influence it. Every callback runs behind a panic guard: a panic
//! becomes a [`TelemetryError::HookPanicked`] forwarded to `on_error`, and a
//! panic inside `on_error` itself is logged and dropped.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use fieldguard_core::telemetry::ValidationHooks;
//!
//! let retries = Arc::new(AtomicU32::new(0));
//! let seen = Arc::clone(&retries);
//! let hooks = ValidationHooks::new()
//!     .on_retry(move |n| seen.store(n, Ordering::SeqCst))
//!     .with_tracing(true);
//! assert!(hooks.has_retry());
//! ```

use std::fmt;

use crate::fault::contain;
use crate::result::{ValidationResult, ValidatorRejection};
use crate::sequencer::{AttemptId, ValidationRequest};

/// Callback receiving the request of a started attempt.
pub type OnValidationStarted = Box<dyn Fn(&ValidationRequest) + Send + Sync>;
/// Callback receiving an accepted result.
pub type OnValidationResult = Box<dyn Fn(&ValidationResult) + Send + Sync>;
/// Callback receiving a reported fault.
pub type OnTelemetryError = Box<dyn Fn(&TelemetryError) + Send + Sync>;
/// Callback receiving the retry count after an explicit retry.
pub type OnRetry = Box<dyn Fn(u32) + Send + Sync>;
/// Callback receiving published live-region text.
pub type OnAnnouncement = Box<dyn Fn(&str) + Send + Sync>;

/// Faults reported through `on_error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    /// The external validator rejected for the current attempt.
    ValidatorRejected {
        attempt: AttemptId,
        rejection: ValidatorRejection,
    },
    /// A rule predicate panicked and was treated as a pass.
    RuleFaulted { attempt: AttemptId, rule: String },
    /// A telemetry callback panicked.
    HookPanicked { hook: &'static str, message: String },
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidatorRejected { attempt, rejection } => {
                write!(f, "{attempt}: {rejection}")
            }
            Self::RuleFaulted { attempt, rule } => {
                write!(f, "{attempt}: rule '{rule}' panicked")
            }
            Self::HookPanicked { hook, message } => {
                write!(f, "telemetry hook '{hook}' panicked: {message}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ValidatorRejected { rejection, .. } => Some(rejection),
            _ => None,
        }
    }
}

/// Caller-supplied lifecycle callbacks for one field.
#[derive(Default)]
pub struct ValidationHooks {
    on_validation_started: Option<OnValidationStarted>,
    on_validation_completed: Option<OnValidationResult>,
    on_success: Option<OnValidationResult>,
    on_error: Option<OnTelemetryError>,
    on_retry: Option<OnRetry>,
    on_announcement: Option<OnAnnouncement>,
    emit_tracing: bool,
}

impl fmt::Debug for ValidationHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationHooks")
            .field("on_validation_started", &self.on_validation_started.is_some())
            .field(
                "on_validation_completed",
                &self.on_validation_completed.is_some(),
            )
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_retry", &self.on_retry.is_some())
            .field("on_announcement", &self.on_announcement.is_some())
            .field("emit_tracing", &self.emit_tracing)
            .finish()
    }
}

impl ValidationHooks {
    /// Create an empty hook bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called when the debounce fires and an attempt starts.
    #[must_use]
    pub fn on_validation_started<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ValidationRequest) + Send + Sync + 'static,
    {
        self.on_validation_started = Some(Box::new(callback));
        self
    }

    /// Called for every applied result, valid or not.
    #[must_use]
    pub fn on_validation_completed<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ValidationResult) + Send + Sync + 'static,
    {
        self.on_validation_completed = Some(Box::new(callback));
        self
    }

    /// Called for every applied valid result.
    #[must_use]
    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ValidationResult) + Send + Sync + 'static,
    {
        self.on_success = Some(Box::new(callback));
        self
    }

    /// Called for validator rejections and contained faults.
    #[must_use]
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&TelemetryError) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Called after an explicit retry with the new retry count.
    #[must_use]
    pub fn on_retry<F>(mut self, callback: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.on_retry = Some(Box::new(callback));
        self
    }

    /// Called whenever the live region publishes text.
    #[must_use]
    pub fn on_announcement<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_announcement = Some(Box::new(callback));
        self
    }

    /// Also emit one `info` event per hook on target `fieldguard.telemetry`.
    #[must_use]
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.emit_tracing = enabled;
        self
    }

    /// Check if a started hook is registered.
    pub fn has_validation_started(&self) -> bool {
        self.on_validation_started.is_some()
    }

    /// Check if a completed hook is registered.
    pub fn has_validation_completed(&self) -> bool {
        self.on_validation_completed.is_some()
    }

    /// Check if a success hook is registered.
    pub fn has_success(&self) -> bool {
        self.on_success.is_some()
    }

    /// Check if an error hook is registered.
    pub fn has_error(&self) -> bool {
        self.on_error.is_some()
    }

    /// Check if a retry hook is registered.
    pub fn has_retry(&self) -> bool {
        self.on_retry.is_some()
    }

    /// Check if an announcement hook is registered.
    pub fn has_announcement(&self) -> bool {
        self.on_announcement.is_some()
    }

    pub(crate) fn fire_validation_started(&self, request: &ValidationRequest) {
        if self.emit_tracing {
            tracing::info!(
                target: "fieldguard.telemetry",
                attempt = request.attempt.raw(),
                "validation_started"
            );
        }
        if let Some(cb) = &self.on_validation_started {
            self.guard("on_validation_started", || cb(request));
        }
    }

    pub(crate) fn fire_validation_completed(&self, result: &ValidationResult) {
        if self.emit_tracing {
            tracing::info!(
                target: "fieldguard.telemetry",
                is_valid = result.is_valid,
                score = result.score,
                "validation_completed"
            );
        }
        if let Some(cb) = &self.on_validation_completed {
            self.guard("on_validation_completed", || cb(result));
        }
    }

    pub(crate) fn fire_success(&self, result: &ValidationResult) {
        if self.emit_tracing {
            tracing::info!(target: "fieldguard.telemetry", score = result.score, "success");
        }
        if let Some(cb) = &self.on_success {
            self.guard("on_success", || cb(result));
        }
    }

    pub(crate) fn fire_retry(&self, retry_count: u32) {
        if self.emit_tracing {
            tracing::info!(target: "fieldguard.telemetry", retry_count, "retry");
        }
        if let Some(cb) = &self.on_retry {
            self.guard("on_retry", || cb(retry_count));
        }
    }

    pub(crate) fn fire_announcement(&self, text: &str) {
        if self.emit_tracing {
            tracing::info!(target: "fieldguard.telemetry", text, "announcement");
        }
        if let Some(cb) = &self.on_announcement {
            self.guard("on_announcement", || cb(text));
        }
    }

    /// Report a fault. Never fails; a panicking `on_error` is logged only.
    pub(crate) fn fire_error(&self, error: &TelemetryError) {
        if self.emit_tracing {
            tracing::info!(target: "fieldguard.telemetry", error = %error, "error");
        }
        let Some(cb) = &self.on_error else {
            return;
        };
        if let Err(message) = contain(|| cb(error)) {
            tracing::warn!(
                target: "fieldguard.telemetry",
                hook = "on_error",
                panic = %message,
                "telemetry hook panicked; dropped"
            );
        }
    }

    fn guard(&self, hook: &'static str, f: impl FnOnce()) {
        if let Err(message) = contain(f) {
            tracing::warn!(
                target: "fieldguard.telemetry",
                hook,
                panic = %message,
                "telemetry hook panicked"
            );
            self.fire_error(&TelemetryError::HookPanicked { hook, message });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use web_time::Instant;

    fn request() -> ValidationRequest {
        ValidationRequest {
            value: "123456".into(),
            attempt: AttemptId::from_raw(1),
            enqueued_at: Instant::now(),
        }
    }

    #[test]
    fn empty_hooks_are_noops() {
        let hooks = ValidationHooks::new();
        assert!(!hooks.has_validation_started());
        assert!(!hooks.has_error());
        hooks.fire_validation_started(&request());
        hooks.fire_retry(1);
        hooks.fire_error(&TelemetryError::RuleFaulted {
            attempt: AttemptId::from_raw(1),
            rule: "x".into(),
        });
    }

    #[test]
    fn callbacks_receive_payloads() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s1 = Arc::clone(&seen);
        let s2 = Arc::clone(&seen);
        let s3 = Arc::clone(&seen);
        let hooks = ValidationHooks::new()
            .on_validation_started(move |req| {
                s1.lock().unwrap().push(format!("started {}", req.value));
            })
            .on_retry(move |n| s2.lock().unwrap().push(format!("retry {n}")))
            .on_announcement(move |text| s3.lock().unwrap().push(text.to_owned()));

        hooks.fire_validation_started(&request());
        hooks.fire_retry(2);
        hooks.fire_announcement("Code is valid");

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["started 123456", "retry 2", "Code is valid"]
        );
    }

    #[test]
    fn panicking_hook_is_forwarded_to_on_error() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        let hooks = ValidationHooks::new()
            .on_success(|_| panic!("hook exploded"))
            .on_error(move |e| sink.lock().unwrap().push(e.clone()));

        hooks.fire_success(&ValidationResult::valid(Instant::now()));

        let errors = errors.lock().unwrap();
        assert_eq!(
            *errors,
            vec![TelemetryError::HookPanicked {
                hook: "on_success",
                message: "hook exploded".into(),
            }]
        );
    }

    #[test]
    fn panicking_on_error_is_swallowed() {
        let hooks = ValidationHooks::new()
            .on_retry(|_| panic!("first"))
            .on_error(|_| panic!("second"));
        hooks.fire_retry(1);
    }

    #[test]
    fn error_display_and_source() {
        use std::error::Error as _;
        let err = TelemetryError::ValidatorRejected {
            attempt: AttemptId::from_raw(3),
            rejection: ValidatorRejection::new("timeout"),
        };
        assert_eq!(err.to_string(), "Attempt(3): validator rejected: timeout");
        assert!(err.source().is_some());

        let err = TelemetryError::HookPanicked {
            hook: "on_retry",
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "telemetry hook 'on_retry' panicked: boom");
        assert!(err.source().is_none());
    }

    #[test]
    fn debug_shows_registration_only() {
        let hooks = ValidationHooks::new().on_retry(|_| {});
        let debug = format!("{hooks:?}");
        assert!(debug.contains("on_retry: true"));
        assert!(debug.contains("on_success: false"));
    }
}
