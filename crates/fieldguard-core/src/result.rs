#![forbid(unsafe_code)]

//! Validation outcomes: the immutable [`ValidationResult`] a field exposes,
//! the inbound [`ValidatorVerdict`] an external validator resolves with, and
//! the [`ValidatorRejection`] it fails with.

use std::fmt;

use web_time::Instant;

/// Score ceiling for a result with no errors and no warnings.
pub const MAX_SCORE: u8 = 100;

/// Derive a result score from its diagnostic counts.
///
/// `max(0, 100 - 2*errors - 1*warnings)`. Errors weigh twice as much as
/// warnings.
#[must_use]
pub fn score_for(error_count: usize, warning_count: usize) -> u8 {
    let penalty = error_count
        .saturating_mul(2)
        .saturating_add(warning_count);
    let score = usize::from(MAX_SCORE).saturating_sub(penalty);
    // score <= 100 by construction
    score as u8
}

/// Severity of a rule failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    /// Blocks validity.
    #[default]
    Error,
    /// Reported but does not block validity.
    Warning,
    /// Reported as a suggestion.
    Info,
}

impl Severity {
    /// Stable name for logs and traces.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// The outcome of one accepted validation attempt.
///
/// Results are never mutated after construction. A field replaces its
/// current result wholesale when a newer attempt is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether the value passed.
    pub is_valid: bool,
    /// Primary user-facing message (empty when there is nothing to say).
    pub message: String,
    /// Error diagnostics, in rule declaration order.
    pub errors: Vec<String>,
    /// Warning diagnostics, in rule declaration order.
    pub warnings: Vec<String>,
    /// Suggestions, in rule declaration order.
    pub suggestions: Vec<String>,
    /// Quality score in `0..=100`.
    pub score: u8,
    /// When the result was produced.
    pub validated_at: Instant,
}

impl ValidationResult {
    /// A passing result with no diagnostics.
    #[must_use]
    pub fn valid(validated_at: Instant) -> Self {
        Self {
            is_valid: true,
            message: String::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            suggestions: Vec::new(),
            score: MAX_SCORE,
            validated_at,
        }
    }

    /// A failing result carrying a single error message.
    #[must_use]
    pub fn invalid(message: impl Into<String>, validated_at: Instant) -> Self {
        let message = message.into();
        Self {
            is_valid: false,
            errors: vec![message.clone()],
            message,
            warnings: Vec::new(),
            suggestions: Vec::new(),
            score: score_for(1, 0),
            validated_at,
        }
    }

    /// Build a result from accumulated diagnostics.
    ///
    /// Validity is "no errors"; the message is the first error, if any.
    #[must_use]
    pub fn from_diagnostics(
        errors: Vec<String>,
        warnings: Vec<String>,
        suggestions: Vec<String>,
        validated_at: Instant,
    ) -> Self {
        Self {
            is_valid: errors.is_empty(),
            message: errors.first().cloned().unwrap_or_default(),
            score: score_for(errors.len(), warnings.len()),
            errors,
            warnings,
            suggestions,
            validated_at,
        }
    }

    /// Returns the first error message, if the result is failing.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        if self.is_valid || self.message.is_empty() {
            None
        } else {
            Some(&self.message)
        }
    }
}

/// What an external validator resolves with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidatorVerdict {
    /// Whether the value passed.
    pub is_valid: bool,
    /// Optional explanation.
    pub message: Option<String>,
}

impl ValidatorVerdict {
    /// A passing verdict.
    #[must_use]
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: None,
        }
    }

    /// A failing verdict with a message.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
        }
    }

    /// Attach a message to the verdict.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// An external validator failed to produce a verdict (network error,
/// timeout, internal fault). Distinct from a failing verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorRejection {
    reason: String,
}

impl ValidatorRejection {
    /// Create a rejection with the given reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The reason reported by the validator.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for ValidatorRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validator rejected: {}", self.reason)
    }
}

impl std::error::Error for ValidatorRejection {}

impl From<String> for ValidatorRejection {
    fn from(reason: String) -> Self {
        Self::new(reason)
    }
}

impl From<&str> for ValidatorRejection {
    fn from(reason: &str) -> Self {
        Self::new(reason)
    }
}
