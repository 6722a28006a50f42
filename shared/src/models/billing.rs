//! Bill models, payment state machine and totals calculation

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment status of a bill.
///
/// Paid is terminal (in particular it never becomes Scrap); Scrap is
/// terminal. Sent ages into Outstanding after the grace period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Draft,
    Sent,
    Paid,
    Outstanding,
    Scrap,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Draft => "draft",
            PaymentStatus::Sent => "sent",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Outstanding => "outstanding",
            PaymentStatus::Scrap => "scrap",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PaymentStatus::Draft),
            "sent" => Some(PaymentStatus::Sent),
            "paid" => Some(PaymentStatus::Paid),
            "outstanding" => Some(PaymentStatus::Outstanding),
            "scrap" => Some(PaymentStatus::Scrap),
            _ => None,
        }
    }

    /// Whether the transition `self -> to` is a legal move in the payment
    /// state machine.
    pub fn can_transition(&self, to: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, to),
            (Draft, Sent)
                | (Outstanding, Sent)
                | (Sent, Paid)
                | (Outstanding, Paid)
                | (Draft, Scrap)
                | (Sent, Scrap)
                | (Outstanding, Scrap)
                | (Sent, Outstanding)
        )
    }

    /// Statuses from which `to` may be reached
    pub fn allowed_sources(to: PaymentStatus) -> Vec<PaymentStatus> {
        use PaymentStatus::*;
        [Draft, Sent, Paid, Outstanding, Scrap]
            .into_iter()
            .filter(|from| from.can_transition(to))
            .collect()
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Draft => write!(f, "Draft"),
            PaymentStatus::Sent => write!(f, "Sent"),
            PaymentStatus::Paid => write!(f, "Paid"),
            PaymentStatus::Outstanding => write!(f, "Outstanding"),
            PaymentStatus::Scrap => write!(f, "Scrap"),
        }
    }
}

/// An invoice aggregating one or more completed, same-customer,
/// same-tax-status programs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    pub id: Uuid,
    /// Human-readable number, unique and sequential per calendar year
    /// (e.g. "BILL-2026-0001")
    pub bill_number: String,
    pub customer_id: Uuid,
    pub bill_date: NaiveDate,
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub grand_total: Decimal,
    pub payment_status: PaymentStatus,
    pub sent_date: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    /// Whole days elapsed since the bill was sent (zero when never sent)
    pub fn days_since_sent(&self, now: DateTime<Utc>) -> i64 {
        self.sent_date.map(|sent| (now - sent).num_days()).unwrap_or(0)
    }
}

/// Computed bill totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillTotals {
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub grand_total: Decimal,
}

/// Compute bill totals from per-program line amounts.
///
/// Tax applies only to tax-registered bills: `tax = subtotal *
/// tax_rate_percent / 100`, otherwise zero. The grand total is always
/// subtotal plus tax.
pub fn calculate_bill_totals(
    line_amounts: &[Decimal],
    tax_registered: bool,
    tax_rate_percent: Decimal,
) -> BillTotals {
    let subtotal: Decimal = line_amounts.iter().sum();
    let tax_total = if tax_registered {
        (subtotal * tax_rate_percent) / Decimal::from(100)
    } else {
        Decimal::ZERO
    };
    BillTotals {
        subtotal,
        tax_total,
        grand_total: subtotal + tax_total,
    }
}

/// Day 20 after sending: payment reminder
pub const DUE_SOON_DAYS: i64 = 20;
/// Day 25 after sending: urgent reminder
pub const DUE_URGENT_DAYS: i64 = 25;
/// Day 30 after sending: the bill becomes Outstanding
pub const OVERDUE_DAYS: i64 = 30;

/// What the aging check should do for a Sent bill at a given age
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgingAction {
    /// Emit a due-soon reminder, keep the status
    DueSoon,
    /// Emit an urgent reminder, keep the status
    DueUrgent,
    /// Flip the bill to Outstanding and emit an overdue event
    Overdue,
}

/// Aging decision for a Sent bill.
///
/// The reminder thresholds use exact-day equality; the Outstanding flip
/// applies from day 30 onward. Callers are expected to run the check
/// daily, since a skipped day skips that day's reminder.
pub fn aging_action(days_since_sent: i64) -> Option<AgingAction> {
    if days_since_sent >= OVERDUE_DAYS {
        Some(AgingAction::Overdue)
    } else if days_since_sent == DUE_URGENT_DAYS {
        Some(AgingAction::DueUrgent)
    } else if days_since_sent == DUE_SOON_DAYS {
        Some(AgingAction::DueSoon)
    } else {
        None
    }
}

/// Sequence scope key for bill numbers within one calendar year
pub fn bill_number_scope(year: i32) -> String {
    format!("BILL-{}", year)
}

/// Format a bill number (e.g. "BILL-2026-0001")
pub fn format_bill_number(year: i32, sequence: i64) -> String {
    format!("{}-{:04}", bill_number_scope(year), sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_paid_is_terminal() {
        assert!(!PaymentStatus::Paid.can_transition(PaymentStatus::Scrap));
        assert!(!PaymentStatus::Paid.can_transition(PaymentStatus::Sent));
        assert!(!PaymentStatus::Paid.can_transition(PaymentStatus::Outstanding));
        assert!(!PaymentStatus::Paid.can_transition(PaymentStatus::Draft));
    }

    #[test]
    fn test_scrap_is_terminal() {
        for to in [
            PaymentStatus::Draft,
            PaymentStatus::Sent,
            PaymentStatus::Paid,
            PaymentStatus::Outstanding,
        ] {
            assert!(!PaymentStatus::Scrap.can_transition(to));
        }
    }

    #[test]
    fn test_transition_table() {
        use PaymentStatus::*;
        assert!(Draft.can_transition(Sent));
        assert!(Outstanding.can_transition(Sent));
        assert!(Sent.can_transition(Paid));
        assert!(Outstanding.can_transition(Paid));
        assert!(Draft.can_transition(Scrap));
        assert!(Sent.can_transition(Scrap));
        assert!(Outstanding.can_transition(Scrap));
        assert!(Sent.can_transition(Outstanding));

        assert!(!Draft.can_transition(Paid));
        assert!(!Draft.can_transition(Outstanding));
        assert!(!Sent.can_transition(Draft));
    }

    #[test]
    fn test_allowed_sources_for_scrap_excludes_paid() {
        let sources = PaymentStatus::allowed_sources(PaymentStatus::Scrap);
        assert!(!sources.contains(&PaymentStatus::Paid));
        assert_eq!(sources.len(), 3);
    }

    #[test]
    fn test_totals_with_tax() {
        let totals = calculate_bill_totals(&[dec("1000.00"), dec("500.00")], true, dec("5.00"));
        assert_eq!(totals.subtotal, dec("1500.00"));
        assert_eq!(totals.tax_total, dec("75.00"));
        assert_eq!(totals.grand_total, dec("1575.00"));
    }

    #[test]
    fn test_totals_without_tax() {
        let totals = calculate_bill_totals(&[dec("1000.00")], false, dec("5.00"));
        assert_eq!(totals.tax_total, Decimal::ZERO);
        assert_eq!(totals.grand_total, totals.subtotal);
    }

    #[test]
    fn test_totals_empty() {
        let totals = calculate_bill_totals(&[], true, dec("5.00"));
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.grand_total, Decimal::ZERO);
    }

    #[test]
    fn test_aging_action_thresholds() {
        assert_eq!(aging_action(0), None);
        assert_eq!(aging_action(19), None);
        assert_eq!(aging_action(20), Some(AgingAction::DueSoon));
        assert_eq!(aging_action(21), None);
        assert_eq!(aging_action(25), Some(AgingAction::DueUrgent));
        assert_eq!(aging_action(29), None);
        assert_eq!(aging_action(30), Some(AgingAction::Overdue));
        assert_eq!(aging_action(45), Some(AgingAction::Overdue));
    }

    #[test]
    fn test_bill_number_format() {
        assert_eq!(format_bill_number(2026, 7), "BILL-2026-0007");
        assert_eq!(format_bill_number(2026, 1234), "BILL-2026-1234");
    }
}
