#![forbid(unsafe_code)]

//! fieldguard public facade crate.
//!
//! Re-exports the validation core and the ready-made input fields, adds a
//! crate-wide [`Error`] and a prelude for day-to-day use.
//!
//! ```
//! use std::time::{Duration, Instant};
//! use fieldguard::prelude::*;
//!
//! # fn main() -> fieldguard::Result<()> {
//! let t0 = Instant::now();
//! let rules = RuleSet::new(vec![Rule::builtin("min", BuiltinRule::MinLength(3))])?;
//! let mut field = FieldValidator::new_at("Username", ValidationConfig::default(), t0)
//!     .with_rules(rules);
//!
//! field.input_at("al", t0);
//! field.tick_at(t0 + Duration::from_millis(300));
//! assert_eq!(field.status(), ValidationStatus::Invalid);
//! # Ok(())
//! # }
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use fieldguard_core::announcer::{AnnouncementContext, LiveRegion, compose_announcement};
pub use fieldguard_core::cache::{CacheStats, ResultCache};
pub use fieldguard_core::config::ValidationConfig;
pub use fieldguard_core::debounce::Debouncer;
pub use fieldguard_core::field::{FieldValidator, Resolution, RetryError, ValidatorOutcome};
pub use fieldguard_core::i18n::{Catalog, LocaleStrings, Translator};
pub use fieldguard_core::persistence::{
    MemoryPersistence, PersistencePort, StorageError, StorageResult,
};
pub use fieldguard_core::result::{
    Severity, ValidationResult, ValidatorRejection, ValidatorVerdict,
};
pub use fieldguard_core::rules::{
    BuiltinRule, Rule, RuleOutcome, RuleReport, RuleSet, RuleSetError, RuleStatus, evaluate,
};
pub use fieldguard_core::sequencer::{AttemptId, ValidationRequest};
pub use fieldguard_core::shared::{AsyncValidator, PendingValidation, SharedFieldValidator};
pub use fieldguard_core::state::{
    FieldSnapshot, FieldValidationState, InvalidTransition, ValidationStatus,
};
pub use fieldguard_core::telemetry::{TelemetryError, ValidationHooks};
pub use fieldguard_core::trace::{ValidationEvent, ValidationTrace};

#[cfg(feature = "persistence")]
pub use fieldguard_core::persistence::FilePersistence;

// --- Input re-exports ------------------------------------------------------

#[cfg(feature = "inputs")]
pub use fieldguard_inputs::{
    OtpCharset, OtpField, OtpOptions, PasswordField, PasswordPolicy, RecentValues, Strength,
    TextField, TextKind, TextOptions,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for fieldguard APIs.
#[derive(Debug)]
pub enum Error {
    /// A rule set could not be built.
    Rules(RuleSetError),
    /// A retry was refused.
    Retry(RetryError),
    /// A persistence backend failed.
    Storage(StorageError),
    /// An external validator rejected.
    Validator(ValidatorRejection),
    /// A telemetry fault, as reported to `on_error`.
    Telemetry(TelemetryError),
    /// A status change the state machine does not allow.
    Transition(InvalidTransition),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rules(err) => write!(f, "{err}"),
            Self::Retry(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::Validator(err) => write!(f, "{err}"),
            Self::Telemetry(err) => write!(f, "{err}"),
            Self::Transition(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rules(err) => Some(err),
            Self::Retry(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Validator(err) => Some(err),
            Self::Telemetry(err) => Some(err),
            Self::Transition(err) => Some(err),
        }
    }
}

impl From<RuleSetError> for Error {
    fn from(err: RuleSetError) -> Self {
        Self::Rules(err)
    }
}

impl From<RetryError> for Error {
    fn from(err: RetryError) -> Self {
        Self::Retry(err)
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl From<ValidatorRejection> for Error {
    fn from(err: ValidatorRejection) -> Self {
        Self::Validator(err)
    }
}

impl From<TelemetryError> for Error {
    fn from(err: TelemetryError) -> Self {
        Self::Telemetry(err)
    }
}

impl From<InvalidTransition> for Error {
    fn from(err: InvalidTransition) -> Self {
        Self::Transition(err)
    }
}

/// Standard result type for fieldguard APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        BuiltinRule, Error, FieldSnapshot, FieldValidator, Resolution, Result, Rule, RuleSet,
        Severity, SharedFieldValidator, ValidationConfig, ValidationHooks, ValidationRequest,
        ValidationResult, ValidationStatus, ValidatorRejection, ValidatorVerdict,
    };

    #[cfg(feature = "inputs")]
    pub use crate::{OtpField, OtpOptions, PasswordField, PasswordPolicy, TextField, TextOptions};

    pub use crate::core;
    #[cfg(feature = "inputs")]
    pub use crate::inputs;
}

pub use fieldguard_core as core;
#[cfg(feature = "inputs")]
pub use fieldguard_inputs as inputs;
