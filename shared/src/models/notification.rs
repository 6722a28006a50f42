//! Notification events and message composition

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// Bill sent to the customer
    BillSent,
    /// Payment reminder, 20 days after sending
    BillDueSoon,
    /// Urgent reminder, 25 days after sending
    BillDueUrgent,
    /// Bill aged into Outstanding (30+ days)
    BillOverdue,
    /// Payment received
    BillPaid,
    /// Lot balance below threshold
    LowStock,
    /// Program wastage above threshold
    HighWastage,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::BillSent => "bill_sent",
            NotificationType::BillDueSoon => "bill_due_soon",
            NotificationType::BillDueUrgent => "bill_due_urgent",
            NotificationType::BillOverdue => "bill_overdue",
            NotificationType::BillPaid => "bill_paid",
            NotificationType::LowStock => "low_stock",
            NotificationType::HighWastage => "high_wastage",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "bill_sent" => Some(NotificationType::BillSent),
            "bill_due_soon" => Some(NotificationType::BillDueSoon),
            "bill_due_urgent" => Some(NotificationType::BillDueUrgent),
            "bill_overdue" => Some(NotificationType::BillOverdue),
            "bill_paid" => Some(NotificationType::BillPaid),
            "low_stock" => Some(NotificationType::LowStock),
            "high_wastage" => Some(NotificationType::HighWastage),
            _ => None,
        }
    }

    pub fn default_priority(&self) -> Priority {
        match self {
            NotificationType::BillSent => Priority::Low,
            NotificationType::BillDueSoon => Priority::Medium,
            NotificationType::BillDueUrgent => Priority::High,
            NotificationType::BillOverdue => Priority::Urgent,
            NotificationType::BillPaid => Priority::Low,
            NotificationType::LowStock => Priority::Medium,
            NotificationType::HighWastage => Priority::Medium,
        }
    }
}

/// Notification priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "urgent" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

/// An emitted notification event.
///
/// Append-only apart from the read/dismiss flags; never auto-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub notification_type: NotificationType,
    pub priority: Priority,
    pub title: String,
    pub message: String,
    pub bill_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub is_read: bool,
    pub is_dismissed: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// De-duplication window for repeated events of the same (bill, type) pair
pub const DEDUP_WINDOW_HOURS: i64 = 24;

/// Whether a prior event suppresses emitting a new one of the same
/// (bill, type) pair: it must be undismissed and created within the
/// de-duplication window.
pub fn suppresses_duplicate(
    prior_created_at: DateTime<Utc>,
    prior_dismissed: bool,
    now: DateTime<Utc>,
) -> bool {
    !prior_dismissed && now - prior_created_at < Duration::hours(DEDUP_WINDOW_HOURS)
}

/// Compose title and message for a bill-related notification.
///
/// Returns `None` for kinds that are not bill events (low stock, high
/// wastage have their own composers).
pub fn compose_bill_notice(
    kind: NotificationType,
    bill_number: &str,
    customer_name: &str,
    amount: &str,
    days_since_sent: i64,
) -> Option<(String, String)> {
    let notice = match kind {
        NotificationType::BillSent => (
            format!("Bill {} sent to {}", bill_number, customer_name),
            format!(
                "Bill #{} for {} has been sent to {}.",
                bill_number, amount, customer_name
            ),
        ),
        NotificationType::BillDueSoon => (
            format!("Payment due soon: {}", bill_number),
            format!(
                "Bill #{} for {} ({}) was sent {} days ago. Payment expected soon.",
                bill_number, customer_name, amount, days_since_sent
            ),
        ),
        NotificationType::BillDueUrgent => (
            format!("Payment overdue in 5 days: {}", bill_number),
            format!(
                "Bill #{} for {} ({}) was sent {} days ago. Payment overdue in 5 days.",
                bill_number, customer_name, amount, days_since_sent
            ),
        ),
        NotificationType::BillOverdue => (
            format!("Payment OVERDUE: {}", bill_number),
            format!(
                "Bill #{} for {} ({}) is now {} days overdue. Immediate action required.",
                bill_number, customer_name, amount, days_since_sent
            ),
        ),
        NotificationType::BillPaid => (
            format!("Payment received: {}", bill_number),
            format!(
                "Payment of {} received from {} for bill #{}.",
                amount, customer_name, bill_number
            ),
        ),
        NotificationType::LowStock | NotificationType::HighWastage => return None,
    };
    Some(notice)
}

/// Compose title and message for a low-stock alert on a lot
pub fn compose_low_stock(
    lot_number: &str,
    current_balance: Decimal,
    balance_percent: Decimal,
) -> (String, String) {
    (
        format!("Low stock: {}", lot_number),
        format!(
            "Lot {} is down to {} ({:.1}% of the received quantity).",
            lot_number,
            current_balance.round_dp(2),
            balance_percent.round_dp(1)
        ),
    )
}

/// Compose title and message for a high-wastage alert on a program
pub fn compose_high_wastage(
    program_number: &str,
    wastage_percent: Decimal,
    threshold_percent: Decimal,
) -> (String, String) {
    (
        format!("High wastage: {}", program_number),
        format!(
            "Program {} recorded {:.1}% wastage, above the {:.1}% threshold.",
            program_number,
            wastage_percent.round_dp(1),
            threshold_percent.round_dp(1)
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_priorities() {
        assert_eq!(NotificationType::BillSent.default_priority(), Priority::Low);
        assert_eq!(
            NotificationType::BillDueSoon.default_priority(),
            Priority::Medium
        );
        assert_eq!(
            NotificationType::BillDueUrgent.default_priority(),
            Priority::High
        );
        assert_eq!(
            NotificationType::BillOverdue.default_priority(),
            Priority::Urgent
        );
    }

    #[test]
    fn test_dedup_window() {
        let now = Utc::now();
        assert!(suppresses_duplicate(now - Duration::hours(1), false, now));
        assert!(suppresses_duplicate(
            now - Duration::hours(23) - Duration::minutes(59),
            false,
            now
        ));
        // Exactly at the window boundary the prior event no longer counts
        assert!(!suppresses_duplicate(now - Duration::hours(24), false, now));
        // Dismissed events never suppress
        assert!(!suppresses_duplicate(now - Duration::hours(1), true, now));
    }

    #[test]
    fn test_bill_notice_names_bill_and_amount() {
        let (title, message) = compose_bill_notice(
            NotificationType::BillOverdue,
            "BILL-2026-0004",
            "Shree Fabrics",
            "₹5250.00",
            31,
        )
        .unwrap();
        assert!(title.contains("BILL-2026-0004"));
        assert!(message.contains("₹5250.00"));
        assert!(message.contains("31 days"));
    }

    #[test]
    fn test_bill_notice_rejects_non_bill_kinds() {
        assert!(compose_bill_notice(NotificationType::LowStock, "x", "y", "z", 0).is_none());
    }
}
