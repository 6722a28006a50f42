//! Validation rules for the Textile Processing Ledger
//!
//! Pure checks backing the engine's invariants: lot balance bounds,
//! allocation reconciliation, tax-registration homogeneity.

use rust_decimal::Decimal;

/// Tolerance for reconciling allocated quantity against a program's
/// declared input (0.01 unit, matching two-decimal fixed-point semantics)
pub fn allocation_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

/// Allocation and debit quantities must be strictly positive
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// A lot balance must stay within `[0, total]`
pub fn validate_balance_bounds(balance: Decimal, total: Decimal) -> Result<(), &'static str> {
    if balance < Decimal::ZERO {
        return Err("Balance cannot be negative");
    }
    if balance > total {
        return Err("Balance cannot exceed the total quantity");
    }
    Ok(())
}

/// A program's output cannot exceed its input
pub fn validate_output_within_input(
    input_quantity: Decimal,
    output_quantity: Decimal,
) -> Result<(), &'static str> {
    if output_quantity < Decimal::ZERO {
        return Err("Output quantity cannot be negative");
    }
    if output_quantity > input_quantity {
        return Err("Output quantity cannot exceed input quantity");
    }
    Ok(())
}

/// Allocated quantities must sum to the program's input within the
/// tolerance. The check only applies once at least one allocation exists;
/// programs may be created before allocations are attached.
pub fn validate_allocation_total(
    allocated: &[Decimal],
    input_quantity: Decimal,
) -> Result<(), &'static str> {
    if allocated.is_empty() {
        return Ok(());
    }
    let total: Decimal = allocated.iter().sum();
    if (total - input_quantity).abs() > allocation_tolerance() {
        return Err("Total allocated quantity must equal the program's input quantity");
    }
    Ok(())
}

/// All lots feeding one program (or one bill) must share the same
/// tax-registration status.
pub fn validate_tax_homogeneity(tax_flags: &[bool]) -> Result<(), &'static str> {
    if let Some(first) = tax_flags.first() {
        if tax_flags.iter().any(|flag| flag != first) {
            return Err("Cannot mix tax-registered and unregistered lots");
        }
    }
    Ok(())
}
