//! Common types used across the ledger

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Date range for queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Format a monetary amount with the configured currency symbol,
/// rounded to two decimal places
pub fn format_amount(currency_symbol: &str, amount: Decimal) -> String {
    format!("{}{:.2}", currency_symbol, amount.round_dp(2))
}
