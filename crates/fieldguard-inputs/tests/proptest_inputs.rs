//! Property-based tests for the input fields.
//!
//! 1. Sanitized codes only hold allowed characters and never exceed the length.
//! 2. Sanitizing is idempotent.
//! 3. The strength level stays within `0..=max` for any input.
//! 4. The recent list stays bounded and duplicate-free.

use std::collections::HashSet;
use std::sync::Arc;

use fieldguard_core::config::ValidationConfig;
use fieldguard_core::persistence::MemoryPersistence;
use fieldguard_inputs::otp::{OtpCharset, sanitize};
use fieldguard_inputs::password::{PasswordField, PasswordPolicy};
use fieldguard_inputs::recent::RecentValues;
use proptest::prelude::*;

fn charset() -> impl Strategy<Value = OtpCharset> {
    prop_oneof![Just(OtpCharset::Numeric), Just(OtpCharset::Alphanumeric)]
}

proptest! {
    #[test]
    fn sanitized_code_is_in_charset(input in ".{0,40}", length in 0usize..12, charset in charset()) {
        let code = sanitize(&input, length, charset);
        prop_assert!(code.chars().count() <= length);
        prop_assert!(code.chars().all(|c| charset.allows(c)));
        prop_assert!(!code.chars().any(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn sanitize_is_idempotent(input in ".{0,40}", length in 0usize..12, charset in charset()) {
        let once = sanitize(&input, length, charset);
        prop_assert_eq!(sanitize(&once, length, charset), once.clone());
    }

    #[test]
    fn strength_stays_in_range(value in "[ -~]{0,24}", max in 1u8..8) {
        let field = PasswordField::new(
            "Password",
            PasswordPolicy::default().with_max_strength(max),
            ValidationConfig::default(),
        )
        .unwrap();
        let strength = field.strength_of(&value);
        prop_assert!(strength.level <= max);
        if value.is_empty() {
            prop_assert_eq!(strength.level, 0);
        }
        prop_assert!(!strength.label.is_empty());
    }

    #[test]
    fn recent_list_is_bounded_and_unique(
        limit in 0usize..8,
        values in proptest::collection::vec("[a-d]{1,2}", 0..40),
    ) {
        let mut recent = RecentValues::with_limit(Arc::new(MemoryPersistence::new()), limit);
        for value in &values {
            recent.record(value.as_str());
            prop_assert!(recent.len() <= limit);
            let unique: HashSet<&String> = recent.values().iter().collect();
            prop_assert_eq!(unique.len(), recent.len());
        }
        if let Some(last) = values.last()
            && limit > 0
        {
            prop_assert_eq!(recent.values().first(), Some(last));
        }
    }
}
