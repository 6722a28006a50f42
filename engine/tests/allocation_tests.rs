//! Allocation and lot balance tests
//!
//! Exercises the balance invariants with an in-memory lot mirroring the
//! engine's debit/credit semantics: `0 <= balance <= total` at all
//! times, exact round-trips, the 0.01 reconciliation tolerance and
//! tax-registration homogeneity.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::{
    allocation_tolerance, balance_percentage, validate_allocation_total, validate_balance_bounds,
    validate_positive_quantity, validate_tax_homogeneity, wastage_percentage,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// In-memory lot with the engine's debit/credit rules
struct TestLot {
    total: Decimal,
    balance: Decimal,
}

impl TestLot {
    fn new(total: Decimal) -> Self {
        Self {
            total,
            balance: total,
        }
    }

    fn debit(&mut self, quantity: Decimal) -> Result<(), &'static str> {
        validate_positive_quantity(quantity)?;
        if self.balance < quantity {
            return Err("Insufficient balance");
        }
        self.balance -= quantity;
        Ok(())
    }

    fn credit(&mut self, quantity: Decimal) {
        self.balance += quantity;
    }
}

#[test]
fn test_debit_reduces_balance() {
    let mut lot = TestLot::new(dec("500.00"));
    lot.debit(dec("100.00")).unwrap();
    assert_eq!(lot.balance, dec("400.00"));
}

#[test]
fn test_debit_beyond_balance_rejected() {
    let mut lot = TestLot::new(dec("500.00"));
    lot.debit(dec("450.00")).unwrap();
    assert!(lot.debit(dec("100.00")).is_err());
    // The failed debit leaves the balance untouched
    assert_eq!(lot.balance, dec("50.00"));
}

#[test]
fn test_zero_and_negative_debits_rejected() {
    let mut lot = TestLot::new(dec("500.00"));
    assert!(lot.debit(Decimal::ZERO).is_err());
    assert!(lot.debit(dec("-10.00")).is_err());
    assert_eq!(lot.balance, dec("500.00"));
}

#[test]
fn test_create_then_delete_allocation_round_trips() {
    let mut lot = TestLot::new(dec("500.00"));
    let before = lot.balance;

    lot.debit(dec("123.45")).unwrap();
    lot.credit(dec("123.45"));

    assert_eq!(lot.balance, before);
}

#[test]
fn test_update_allocation_adjusts_by_delta() {
    let mut lot = TestLot::new(dec("500.00"));
    lot.debit(dec("100.00")).unwrap();

    // Raising the allocation from 100 to 150 debits the 50 difference
    lot.debit(dec("50.00")).unwrap();
    assert_eq!(lot.balance, dec("350.00"));

    // Dropping it back to 80 credits 70
    lot.credit(dec("70.00"));
    assert_eq!(lot.balance, dec("420.00"));
}

#[test]
fn test_lot_allocation_and_wastage_scenario() {
    // Lot with total 500; allocate 100 to a program
    let mut lot = TestLot::new(dec("500.00"));
    lot.debit(dec("100.00")).unwrap();
    assert_eq!(lot.balance, dec("400.00"));

    // Program input 100, output 92: wastage 8 at 8%
    let input = dec("100.00");
    let output = dec("92.00");
    assert_eq!(input - output, dec("8.00"));
    assert_eq!(wastage_percentage(input, output), dec("8.00"));

    // A single 100 allocation reconciles against the 100 input
    assert!(validate_allocation_total(&[dec("100.00")], input).is_ok());
}

#[test]
fn test_mixed_tax_registration_rejected() {
    // Two lots, one registered and one not, in the same program
    assert!(validate_tax_homogeneity(&[true, false]).is_err());
    assert!(validate_tax_homogeneity(&[true, true]).is_ok());
}

#[test]
fn test_allocation_tolerance_boundary() {
    let input = dec("250.00");
    assert!(validate_allocation_total(&[dec("249.99")], input).is_ok());
    assert!(validate_allocation_total(&[dec("250.01")], input).is_ok());
    assert!(validate_allocation_total(&[dec("249.98")], input).is_err());
    assert_eq!(allocation_tolerance(), dec("0.01"));
}

#[test]
fn test_balance_percentage() {
    assert_eq!(balance_percentage(dec("400.00"), dec("500.00")), dec("80.00"));
    assert_eq!(balance_percentage(Decimal::ZERO, dec("500.00")), Decimal::ZERO);
    assert_eq!(balance_percentage(Decimal::ZERO, Decimal::ZERO), Decimal::ZERO);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any sequence of valid debits keeps the balance within [0, total].
    #[test]
    fn prop_balance_stays_in_bounds(
        total_cents in 1u32..10_000_000,
        debits in prop::collection::vec(1u32..1_000_000, 0..20),
    ) {
        let total = Decimal::new(total_cents as i64, 2);
        let mut lot = TestLot::new(total);

        for debit_cents in debits {
            let quantity = Decimal::new(debit_cents as i64, 2);
            // Failed debits must not move the balance
            let before = lot.balance;
            if lot.debit(quantity).is_err() {
                prop_assert_eq!(lot.balance, before);
            }
            prop_assert!(validate_balance_bounds(lot.balance, lot.total).is_ok());
        }
    }

    /// Debiting then crediting the same quantity restores the balance
    /// exactly, regardless of interleaving.
    #[test]
    fn prop_debit_credit_round_trip(
        total_cents in 1u32..10_000_000,
        quantity_cents in 1u32..10_000_000,
    ) {
        let total = Decimal::new(total_cents as i64, 2);
        let quantity = Decimal::new(quantity_cents as i64, 2);
        let mut lot = TestLot::new(total);

        if lot.debit(quantity).is_ok() {
            lot.credit(quantity);
            prop_assert_eq!(lot.balance, total);
        }
    }

    /// The reconciliation check accepts exactly the sums within 0.01 of
    /// the input.
    #[test]
    fn prop_allocation_tolerance(
        input_cents in 1u32..10_000_000,
        offset_cents in -5i64..=5,
    ) {
        let input = Decimal::new(input_cents as i64, 2);
        let allocated = input + Decimal::new(offset_cents, 2);

        let result = validate_allocation_total(&[allocated], input);
        if offset_cents.abs() <= 1 {
            prop_assert!(result.is_ok());
        } else {
            prop_assert!(result.is_err());
        }
    }
}
