//! Benchmarks for rule evaluation, the result cache and debounced input.
//!
//! Run with: cargo bench -p fieldguard-core

use std::hint::black_box;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use fieldguard_core::cache::ResultCache;
use fieldguard_core::config::ValidationConfig;
use fieldguard_core::field::FieldValidator;
use fieldguard_core::result::ValidationResult;
use fieldguard_core::rules::{BuiltinRule, Rule, RuleSet, evaluate};
use web_time::Instant;

fn password_rules() -> RuleSet {
    RuleSet::new(vec![
        Rule::builtin("min", BuiltinRule::MinLength(8)),
        Rule::builtin("upper", BuiltinRule::HasUppercase),
        Rule::builtin("lower", BuiltinRule::HasLowercase),
        Rule::builtin("digit", BuiltinRule::HasDigit),
        Rule::builtin("special", BuiltinRule::HasSpecial),
        Rule::builtin("repeated", BuiltinRule::NoRepeatedRun(3)).warning(),
        Rule::builtin("sequential", BuiltinRule::NoSequentialRun(3)).warning(),
        Rule::custom("no-space", "No spaces", |v: &str| !v.contains(' ')),
    ])
    .unwrap()
}

// ============================================================================
// Rule engine
// ============================================================================

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("rules/evaluate");
    let rules = password_rules();

    for len in [8usize, 64, 512] {
        let value: String = "aB3$xyz9".chars().cycle().take(len).collect();
        group.bench_with_input(BenchmarkId::new("password", len), &value, |b, value| {
            b.iter(|| black_box(evaluate(value, &rules)))
        });
    }

    group.finish();
}

// ============================================================================
// Result cache
// ============================================================================

fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache");
    let now = Instant::now();

    for capacity in [16usize, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("put_evicting", capacity),
            &capacity,
            |b, &capacity| {
                let mut cache = ResultCache::new(capacity);
                let mut n = 0u64;
                b.iter(|| {
                    n += 1;
                    cache.put(n.to_string(), ValidationResult::valid(now));
                })
            },
        );
    }

    group.finish();
}

// ============================================================================
// Field pipeline
// ============================================================================

fn bench_typing_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("field/typing_burst");
    let step = Duration::from_millis(40);

    for keystrokes in [10usize, 100] {
        group.bench_with_input(
            BenchmarkId::from_parameter(keystrokes),
            &keystrokes,
            |b, &keystrokes| {
                b.iter(|| {
                    let t0 = Instant::now();
                    let mut field = FieldValidator::new_at("Bench", ValidationConfig::default(), t0)
                        .with_rules(password_rules());
                    let mut value = String::new();
                    let mut now = t0;
                    for i in 0..keystrokes {
                        value.push(char::from(b'a' + (i % 26) as u8));
                        now += step;
                        field.input_at(value.clone(), now);
                        field.tick_at(now);
                    }
                    field.tick_at(now + Duration::from_secs(1));
                    black_box(field.snapshot())
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_cache, bench_typing_burst);
criterion_main!(benches);
