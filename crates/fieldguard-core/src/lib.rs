#![forbid(unsafe_code)]

//! Debounced, race-safe field validation.
//!
//! `fieldguard-core` turns a stream of keystrokes into validation results
//! that never go stale. Each input field owns a [`FieldValidator`] which
//! combines:
//!
//! - [`Debouncer`] - coalesces a typing burst into one commit
//! - [`Sequencer`] - numbers attempts so late results can be recognized
//! - [`ResultCache`] - bounded FIFO memo of `value -> ValidationResult`
//! - [`RuleSet`] / [`evaluate`] - synchronous rules with fail-open faults
//! - [`FieldValidationState`] - the `Idle | Validating | Valid | Invalid | Error` machine
//! - [`ValidationHooks`] - panic-guarded telemetry callbacks
//! - [`LiveRegion`] - throttled screen-reader announcements
//!
//! External validators are run by the host: a debounce fire that needs one
//! yields a [`ValidationRequest`], and the outcome is reported back with
//! [`FieldValidator::complete_at`]. [`SharedFieldValidator`] does this on
//! worker threads for blocking validators.
//!
//! # Feature Flags
//!
//! - `persistence`: JSON [`FilePersistence`](persistence::FilePersistence).

pub mod announcer;
pub mod cache;
pub mod config;
pub mod debounce;
mod fault;
pub mod field;
pub mod i18n;
pub mod persistence;
pub mod result;
pub mod rules;
pub mod sequencer;
pub mod shared;
pub mod state;
pub mod telemetry;
pub mod trace;

pub use announcer::{AnnouncementContext, LiveRegion, compose_announcement};
pub use cache::{CacheStats, ResultCache};
pub use config::ValidationConfig;
pub use debounce::Debouncer;
pub use field::{FieldValidator, Resolution, RetryError, ValidatorOutcome};
pub use i18n::{Catalog, LocaleStrings, Translator};
pub use persistence::{MemoryPersistence, PersistencePort, StorageError, StorageResult};
pub use result::{Severity, ValidationResult, ValidatorRejection, ValidatorVerdict, score_for};
pub use rules::{
    BuiltinRule, Rule, RuleOutcome, RuleReport, RuleSet, RuleSetError, RuleStatus, evaluate,
};
pub use sequencer::{AttemptId, Sequencer, ValidationRequest};
pub use shared::{AsyncValidator, PendingValidation, SharedFieldValidator};
pub use state::{FieldSnapshot, FieldValidationState, InvalidTransition, ValidationStatus};
pub use telemetry::{TelemetryError, ValidationHooks};
pub use trace::{ValidationEvent, ValidationTrace};
