//! Inward material lot models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A received quantity of one material grade from one customer, with a
/// depletable balance.
///
/// The balance starts equal to the total quantity and is mutated only
/// through allocation debits and credits; `0 <= current_balance <=
/// total_quantity` holds at all times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialLot {
    pub id: Uuid,
    /// Human-readable number, unique and sequential per fiscal year
    /// (e.g. "LOT-2025-001")
    pub lot_number: String,
    pub customer_id: Uuid,
    pub grade_id: Uuid,
    pub total_quantity: Decimal,
    pub current_balance: Decimal,
    pub received_date: NaiveDate,
    pub fiscal_year: i32,
    /// Whether downstream programs and bills for this lot attract tax
    pub tax_registered: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MaterialLot {
    /// Remaining balance as a percentage of the total quantity
    pub fn balance_percentage(&self) -> Decimal {
        balance_percentage(self.current_balance, self.total_quantity)
    }
}

/// Remaining balance as a percentage of the total quantity (zero when the
/// total is zero)
pub fn balance_percentage(current_balance: Decimal, total_quantity: Decimal) -> Decimal {
    if total_quantity > Decimal::ZERO {
        (current_balance / total_quantity) * Decimal::from(100)
    } else {
        Decimal::ZERO
    }
}

/// Sequence scope key for lot numbers within one fiscal year
pub fn lot_number_scope(fiscal_year: i32) -> String {
    format!("LOT-{}", fiscal_year)
}

/// Format a lot number (e.g. "LOT-2025-001")
pub fn format_lot_number(fiscal_year: i32, sequence: i64) -> String {
    format!("{}-{:03}", lot_number_scope(fiscal_year), sequence)
}
