//! Rate resolution tests
//!
//! Covers the layered override scheme: customer-specific override,
//! grade default, zero fallback, and the program-level declared-rate
//! override on top.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::{effective_rate, resolve_rate, resolve_rate_with_source, RateSource};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[test]
fn test_override_wins_over_default() {
    let rate = resolve_rate(Some(dec("62.50")), dec("55.00"));
    assert_eq!(rate, dec("62.50"));
}

#[test]
fn test_default_used_without_override() {
    let (rate, source) = resolve_rate_with_source(None, dec("55.00"));
    assert_eq!(rate, dec("55.00"));
    assert_eq!(source, RateSource::GradeDefault);
}

#[test]
fn test_zero_default_falls_through_to_zero() {
    let (rate, source) = resolve_rate_with_source(None, Decimal::ZERO);
    assert_eq!(rate, Decimal::ZERO);
    assert_eq!(source, RateSource::Fallback);
}

#[test]
fn test_override_source_reported() {
    let (_, source) = resolve_rate_with_source(Some(dec("10")), dec("55.00"));
    assert_eq!(source, RateSource::CustomerSpecific);
}

#[test]
fn test_declared_rate_always_wins() {
    assert_eq!(effective_rate(Some(dec("70.00")), dec("55.00")), dec("70.00"));
}

#[test]
fn test_zero_declared_rate_defers_to_resolution() {
    assert_eq!(effective_rate(Some(Decimal::ZERO), dec("55.00")), dec("55.00"));
    assert_eq!(effective_rate(None, dec("55.00")), dec("55.00"));
}

#[test]
fn test_no_data_resolves_to_zero() {
    assert_eq!(effective_rate(None, resolve_rate(None, Decimal::ZERO)), Decimal::ZERO);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Resolution is a pure function: the same inputs always produce
    /// the same rate.
    #[test]
    fn prop_resolution_deterministic(
        override_cents in proptest::option::of(1u32..1_000_000),
        default_cents in 0u32..1_000_000,
    ) {
        let override_rate = override_cents.map(|c| Decimal::new(c as i64, 2));
        let default_rate = Decimal::new(default_cents as i64, 2);

        let first = resolve_rate(override_rate, default_rate);
        let second = resolve_rate(override_rate, default_rate);
        prop_assert_eq!(first, second);
    }

    /// The resolved rate always comes from one of the three layers.
    #[test]
    fn prop_resolved_rate_is_one_of_the_layers(
        override_cents in proptest::option::of(1u32..1_000_000),
        default_cents in 0u32..1_000_000,
    ) {
        let override_rate = override_cents.map(|c| Decimal::new(c as i64, 2));
        let default_rate = Decimal::new(default_cents as i64, 2);

        let (rate, source) = resolve_rate_with_source(override_rate, default_rate);
        match source {
            RateSource::CustomerSpecific => prop_assert_eq!(Some(rate), override_rate),
            RateSource::GradeDefault => prop_assert_eq!(rate, default_rate),
            RateSource::Fallback => prop_assert_eq!(rate, Decimal::ZERO),
        }
    }

    /// A non-zero declared rate overrides whatever resolution produced.
    #[test]
    fn prop_declared_rate_overrides(
        declared_cents in 1u32..1_000_000,
        resolved_cents in 0u32..1_000_000,
    ) {
        let declared = Decimal::new(declared_cents as i64, 2);
        let resolved = Decimal::new(resolved_cents as i64, 2);
        prop_assert_eq!(effective_rate(Some(declared), resolved), declared);
    }
}
