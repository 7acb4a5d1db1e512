#![forbid(unsafe_code)]

//! Ready-made fields on top of `fieldguard-core`.
//!
//! - [`OtpField`] - one-time codes, sanitized typing and paste, bounded
//!   verification retries
//! - [`PasswordField`] - requirement checklist, strength meter, optional
//!   confirmation
//! - [`TextField`] - required/length/format rules, custom rules and
//!   [`RecentValues`]
//!
//! Every field wraps a [`FieldValidator`](fieldguard_core::FieldValidator)
//! and is driven the same way: `input_at`, `tick_at`, and `complete_at`
//! when an external validator is in play.

pub mod otp;
pub mod password;
pub mod recent;
pub mod text;

pub use otp::{OtpCharset, OtpField, OtpOptions, sanitize};
pub use password::{PasswordField, PasswordPolicy, Strength};
pub use recent::RecentValues;
pub use text::{TextField, TextKind, TextOptions};
