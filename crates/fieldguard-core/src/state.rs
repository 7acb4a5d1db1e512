#![forbid(unsafe_code)]

//! The externally observable validation state of one field.
//!
//! ```text
//!            debounce fires              accepted resolution
//!   Idle ───────────────────▶ Validating ───────────────────▶ Valid | Invalid | Error
//!    ▲                            ▲                                   │
//!    │        clear / reset       │         next debounce fire        │
//!    └────────────────────────────┴───────────────────────────────────┘
//! ```
//!
//! Transitions are driven only by a debounce fire, an accepted resolution,
//! or an explicit clear/reset. A stale resolution produces no transition.

use std::fmt;

use web_time::Instant;

use crate::result::ValidationResult;

/// Message surfaced to the user when the external validator rejects.
pub const VALIDATION_FAILED_MESSAGE: &str = "Validation failed";

/// Validation status of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValidationStatus {
    /// No value, or validation disabled.
    #[default]
    Idle,
    /// An attempt is running.
    Validating,
    /// The latest accepted result passed.
    Valid,
    /// The latest accepted result failed its rules or verdict.
    Invalid,
    /// The external validator rejected.
    Error,
}

impl ValidationStatus {
    /// Stable name for logs and traces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Error => "error",
        }
    }

    /// `Valid`, `Invalid` and `Error` end an attempt.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Valid | Self::Invalid | Self::Error)
    }

    /// `Invalid` and `Error` show the same failure icon.
    #[must_use]
    pub const fn shows_failure(self) -> bool {
        matches!(self, Self::Invalid | Self::Error)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            // clear/reset is always allowed
            (_, Self::Idle) => true,
            // debounce fire or retry
            (_, Self::Validating) => true,
            // resolutions only conclude a running attempt
            (Self::Validating, Self::Valid | Self::Invalid | Self::Error) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for a transition the state machine does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    /// Status before the attempted transition.
    pub from: ValidationStatus,
    /// Requested status.
    pub to: ValidationStatus,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid validation transition: {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

/// One field's state: status, latest accepted result, retry count.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldValidationState {
    status: ValidationStatus,
    result: Option<ValidationResult>,
    retry_count: u32,
}

impl FieldValidationState {
    /// A fresh `Idle` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> ValidationStatus {
        self.status
    }

    /// Latest accepted result (`None` while `Idle`).
    #[must_use]
    pub fn result(&self) -> Option<&ValidationResult> {
        self.result.as_ref()
    }

    /// Number of explicit retries since the last success or reset.
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Enter `Validating`. The previous result stays visible until replaced.
    pub fn begin(&mut self) -> Result<(), InvalidTransition> {
        self.transition(ValidationStatus::Validating)
    }

    /// Apply an accepted result; the status follows `result.is_valid`.
    pub fn settle(&mut self, result: ValidationResult) -> Result<(), InvalidTransition> {
        let next = if result.is_valid {
            ValidationStatus::Valid
        } else {
            ValidationStatus::Invalid
        };
        self.transition(next)?;
        self.result = Some(result);
        Ok(())
    }

    /// Apply a rejection of the external validator.
    pub fn fail(&mut self, result: ValidationResult) -> Result<(), InvalidTransition> {
        self.transition(ValidationStatus::Error)?;
        self.result = Some(result);
        Ok(())
    }

    /// Back to `Idle`, dropping the result. The retry count is kept.
    pub fn idle(&mut self) {
        self.status = ValidationStatus::Idle;
        self.result = None;
    }

    /// Back to `Idle`, dropping the result and the retry count.
    pub fn reset(&mut self) {
        self.idle();
        self.retry_count = 0;
    }

    pub(crate) fn increment_retry(&mut self) -> u32 {
        self.retry_count = self.retry_count.saturating_add(1);
        self.retry_count
    }

    pub(crate) fn reset_retries(&mut self) {
        self.retry_count = 0;
    }

    fn transition(&mut self, next: ValidationStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// The outbound contract consumed by the rendering layer.
    #[must_use]
    pub fn snapshot(&self) -> FieldSnapshot {
        let result = self.result.as_ref();
        FieldSnapshot {
            status: self.status,
            is_valid: self.status == ValidationStatus::Valid,
            is_validating: self.status == ValidationStatus::Validating,
            error: match self.status {
                ValidationStatus::Invalid | ValidationStatus::Error => {
                    result.and_then(|r| r.error()).map(str::to_owned)
                }
                _ => None,
            },
            warnings: result.map(|r| r.warnings.clone()).unwrap_or_default(),
            suggestions: result.map(|r| r.suggestions.clone()).unwrap_or_default(),
            score: result.map_or(0, |r| r.score),
            last_validation_timestamp: result.map(|r| r.validated_at),
            retry_count: self.retry_count,
        }
    }
}

/// Read-only view of a field for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSnapshot {
    /// Current status.
    pub status: ValidationStatus,
    /// `true` only in `Valid`.
    pub is_valid: bool,
    /// `true` only in `Validating`.
    pub is_validating: bool,
    /// Error message in `Invalid`/`Error`.
    pub error: Option<String>,
    /// Warnings of the latest result.
    pub warnings: Vec<String>,
    /// Suggestions of the latest result.
    pub suggestions: Vec<String>,
    /// Score of the latest result (0 when there is none).
    pub score: u8,
    /// When the latest result was produced.
    pub last_validation_timestamp: Option<Instant>,
    /// Explicit retries since the last success or reset.
    pub retry_count: u32,
}
