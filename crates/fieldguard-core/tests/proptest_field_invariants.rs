//! Property-based invariant tests for the field validation pipeline.
//!
//! 1. The freshest attempt wins under any resolution order.
//! 2. A burst inside the debounce window fires once, with the last value.
//! 3. The result cache never exceeds its bound.
//! 4. Score is `max(0, 100 - 2e - w)`.
//! 5. Arbitrary operation sequences keep the trace invariants and never panic.

use std::time::Duration;

use fieldguard_core::cache::ResultCache;
use fieldguard_core::config::ValidationConfig;
use fieldguard_core::debounce::Debouncer;
use fieldguard_core::field::{FieldValidator, Resolution};
use fieldguard_core::result::{ValidationResult, ValidatorVerdict, score_for};
use fieldguard_core::sequencer::ValidationRequest;
use fieldguard_core::state::ValidationStatus;
use proptest::prelude::*;
use web_time::Instant;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn async_field(t0: Instant) -> FieldValidator {
    FieldValidator::new_at(
        "Field",
        ValidationConfig::default().with_debounce(Duration::ZERO),
        t0,
    )
    .with_external_validator(true)
}

// ── Strategies ────────────────────────────────────────────────────────────

/// Attempt count, a resolution order over those attempts, and verdicts.
fn resolution_plan() -> impl Strategy<Value = (Vec<usize>, Vec<bool>)> {
    (1usize..10).prop_flat_map(|n| {
        (
            Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
            proptest::collection::vec(any::<bool>(), n),
        )
    })
}

#[derive(Debug, Clone)]
enum Op {
    Input(u8),
    Advance(u16),
    Resolve { index: usize, valid: bool },
    Reject(usize),
    Retry,
    Clear,
    Reset,
    ValidateNow,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..6).prop_map(Op::Input),
        4 => (0u16..600).prop_map(Op::Advance),
        3 => (0usize..8, any::<bool>()).prop_map(|(index, valid)| Op::Resolve { index, valid }),
        1 => (0usize..8).prop_map(Op::Reject),
        1 => Just(Op::Retry),
        1 => Just(Op::Clear),
        1 => Just(Op::Reset),
        1 => Just(Op::ValidateNow),
    ]
}

// ── Properties ────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn freshest_attempt_wins((order, verdicts) in resolution_plan()) {
        let t0 = Instant::now();
        let mut field = async_field(t0);
        let mut requests: Vec<ValidationRequest> = Vec::new();
        for i in 0..verdicts.len() {
            let at = t0 + ms(i as u64 * 10);
            field.input_at(format!("value-{i}"), at);
            requests.push(field.tick_at(at).expect("external validator requested"));
        }
        let last = requests.len() - 1;

        for (step, &index) in order.iter().enumerate() {
            let verdict = if verdicts[index] {
                ValidatorVerdict::valid()
            } else {
                ValidatorVerdict::invalid(format!("bad {index}"))
            };
            let resolution = field.complete_at(
                requests[index].attempt,
                Ok(verdict),
                t0 + ms(1000 + step as u64),
            );
            if index == last {
                prop_assert!(matches!(resolution, Resolution::Applied(_)));
            } else {
                prop_assert_eq!(resolution, Resolution::Stale);
            }
        }

        let expected = if verdicts[last] {
            ValidationStatus::Valid
        } else {
            ValidationStatus::Invalid
        };
        prop_assert_eq!(field.status(), expected);
        if !verdicts[last] {
            let expected_error = format!("bad {last}");
            let snapshot = field.snapshot();
            prop_assert_eq!(snapshot.error.as_deref(), Some(expected_error.as_str()));
        }
        prop_assert_eq!(field.trace().count("applied"), 1);
        prop_assert!(field.trace().verify_invariants().is_empty());
    }

    #[test]
    fn burst_fires_once_with_last_value(gaps in proptest::collection::vec(0u64..300, 1..30)) {
        let delay = ms(300);
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new();
        let mut now = t0;
        let mut fired = Vec::new();
        for (i, gap) in gaps.iter().enumerate() {
            now += ms(*gap);
            if let Some(v) = debouncer.poll_at(now) {
                fired.push(v);
            }
            debouncer.schedule_at(i, delay, now);
        }
        prop_assert!(fired.is_empty());
        prop_assert_eq!(debouncer.poll_at(now + delay - ms(1)), None);
        prop_assert_eq!(debouncer.poll_at(now + delay), Some(gaps.len() - 1));
        prop_assert_eq!(debouncer.poll_at(now + delay * 10), None);
    }

    #[test]
    fn cache_never_exceeds_bound(
        capacity in 0usize..20,
        keys in proptest::collection::vec(0u16..50, 0..200),
    ) {
        let now = Instant::now();
        let mut cache = ResultCache::new(capacity);
        for key in &keys {
            cache.put(key.to_string(), ValidationResult::valid(now));
            prop_assert!(cache.len() <= capacity);
        }
        if let Some(last) = keys.last()
            && capacity > 0
        {
            prop_assert!(cache.contains(&last.to_string()));
        }
    }

    #[test]
    fn score_formula(errors in 0usize..80, warnings in 0usize..120) {
        let expected = 100i64 - 2 * errors as i64 - warnings as i64;
        prop_assert_eq!(i64::from(score_for(errors, warnings)), expected.max(0));
    }

    #[test]
    fn arbitrary_operations_keep_trace_invariants(
        ops in proptest::collection::vec(op_strategy(), 1..60),
    ) {
        let t0 = Instant::now();
        let mut field = FieldValidator::new_at("Field", ValidationConfig::default(), t0)
            .with_external_validator(true);
        let mut now = t0;
        let mut requests: Vec<ValidationRequest> = Vec::new();

        for op in ops {
            match op {
                Op::Input(n) => {
                    let value = if n == 0 { String::new() } else { format!("v{n}") };
                    field.input_at(value, now);
                }
                Op::Advance(delta) => {
                    now += ms(u64::from(delta));
                    requests.extend(field.tick_at(now));
                }
                Op::Resolve { index, valid } => {
                    if let Some(request) = requests.get(index) {
                        let verdict = if valid {
                            ValidatorVerdict::valid()
                        } else {
                            ValidatorVerdict::invalid("no")
                        };
                        field.complete_at(request.attempt, Ok(verdict), now);
                    }
                }
                Op::Reject(index) => {
                    if let Some(request) = requests.get(index) {
                        field.complete_at(request.attempt, Err("offline".into()), now);
                    }
                }
                Op::Retry => {
                    if let Ok(request) = field.retry_at(now) {
                        requests.extend(request);
                    }
                }
                Op::Clear => field.clear_at(now),
                Op::Reset => field.reset_at(now),
                Op::ValidateNow => requests.extend(field.validate_now_at(now)),
            }

            let snapshot = field.snapshot();
            prop_assert_eq!(snapshot.is_valid, snapshot.status == ValidationStatus::Valid);
            prop_assert!(snapshot.retry_count <= 3);
            if snapshot.status == ValidationStatus::Idle {
                prop_assert!(field.state().result().is_none());
            }
        }

        prop_assert!(field.trace().verify_invariants().is_empty());
    }
}
