//! Notification and aging tests
//!
//! The aging scenario is exercised against an in-memory sink that
//! mirrors the engine's emit semantics: the 24-hour (bill, type)
//! de-duplication window and the exact-day reminder thresholds.

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;

use shared::{
    aging_action, suppresses_duplicate, AgingAction, NotificationType, PaymentStatus, Priority,
    DUE_SOON_DAYS, DUE_URGENT_DAYS, OVERDUE_DAYS,
};

// ============================================================================
// In-memory sink mirroring the engine's de-duplication
// ============================================================================

struct RecordedEvent {
    kind: NotificationType,
    created_at: DateTime<Utc>,
    dismissed: bool,
}

#[derive(Default)]
struct FakeSink {
    events: Vec<RecordedEvent>,
}

impl FakeSink {
    /// Emit unless an undismissed event of the same kind sits within the
    /// de-duplication window; mirrors `NotificationService::emit`.
    fn emit(&mut self, kind: NotificationType, now: DateTime<Utc>) -> bool {
        let duplicate = self
            .events
            .iter()
            .any(|event| event.kind == kind && suppresses_duplicate(event.created_at, event.dismissed, now));
        if duplicate {
            return false;
        }
        self.events.push(RecordedEvent {
            kind,
            created_at: now,
            dismissed: false,
        });
        true
    }

    fn count(&self, kind: NotificationType) -> usize {
        self.events.iter().filter(|event| event.kind == kind).count()
    }
}

/// Mirror of the engine's aging check against the in-memory sink.
/// Returns whether the status transitioned.
fn check_aging(
    status: &mut PaymentStatus,
    sent_date: DateTime<Utc>,
    now: DateTime<Utc>,
    sink: &mut FakeSink,
) -> bool {
    if *status != PaymentStatus::Sent {
        return false;
    }
    let days = (now - sent_date).num_days();
    match aging_action(days) {
        None => false,
        Some(AgingAction::DueSoon) => {
            sink.emit(NotificationType::BillDueSoon, now);
            false
        }
        Some(AgingAction::DueUrgent) => {
            sink.emit(NotificationType::BillDueUrgent, now);
            false
        }
        Some(AgingAction::Overdue) => {
            assert!(status.can_transition(PaymentStatus::Outstanding));
            *status = PaymentStatus::Outstanding;
            sink.emit(NotificationType::BillOverdue, now);
            true
        }
    }
}

// ============================================================================
// Aging scenario
// ============================================================================

#[test]
fn test_aging_scenario_day_20_to_30() {
    let sent = Utc::now();
    let mut status = PaymentStatus::Sent;
    let mut sink = FakeSink::default();

    // Day 20: exactly one due-soon event
    let day_20 = sent + Duration::days(DUE_SOON_DAYS);
    assert!(!check_aging(&mut status, sent, day_20, &mut sink));
    assert_eq!(sink.count(NotificationType::BillDueSoon), 1);

    // Repeating the check the same day emits nothing new
    assert!(!check_aging(&mut status, sent, day_20 + Duration::hours(3), &mut sink));
    assert_eq!(sink.count(NotificationType::BillDueSoon), 1);

    // Day 25: one urgent event
    let day_25 = sent + Duration::days(DUE_URGENT_DAYS);
    assert!(!check_aging(&mut status, sent, day_25, &mut sink));
    assert_eq!(sink.count(NotificationType::BillDueUrgent), 1);

    // Day 30: status flips to Outstanding with one overdue event
    let day_30 = sent + Duration::days(OVERDUE_DAYS);
    assert!(check_aging(&mut status, sent, day_30, &mut sink));
    assert_eq!(status, PaymentStatus::Outstanding);
    assert_eq!(sink.count(NotificationType::BillOverdue), 1);

    // Once Outstanding, further checks are no-ops
    assert!(!check_aging(&mut status, sent, day_30 + Duration::days(1), &mut sink));
    assert_eq!(sink.count(NotificationType::BillOverdue), 1);
}

#[test]
fn test_aging_skips_days_between_thresholds() {
    let sent = Utc::now();
    let mut status = PaymentStatus::Sent;
    let mut sink = FakeSink::default();

    for days in [1, 10, 19, 21, 24, 26, 29] {
        let now = sent + Duration::days(days);
        assert!(!check_aging(&mut status, sent, now, &mut sink));
    }
    assert!(sink.events.is_empty());
    assert_eq!(status, PaymentStatus::Sent);
}

#[test]
fn test_aging_only_applies_to_sent_bills() {
    let sent = Utc::now();
    let mut sink = FakeSink::default();

    for status in [
        PaymentStatus::Draft,
        PaymentStatus::Paid,
        PaymentStatus::Outstanding,
        PaymentStatus::Scrap,
    ] {
        let mut current = status;
        let now = sent + Duration::days(OVERDUE_DAYS);
        assert!(!check_aging(&mut current, sent, now, &mut sink));
        assert_eq!(current, status);
    }
    assert!(sink.events.is_empty());
}

#[test]
fn test_dismissed_event_no_longer_suppresses() {
    let now = Utc::now();
    let mut sink = FakeSink::default();

    assert!(sink.emit(NotificationType::BillDueSoon, now));
    assert!(!sink.emit(NotificationType::BillDueSoon, now + Duration::hours(1)));

    sink.events[0].dismissed = true;
    assert!(sink.emit(NotificationType::BillDueSoon, now + Duration::hours(2)));
}

#[test]
fn test_dedup_window_expires_after_24_hours() {
    let now = Utc::now();
    let mut sink = FakeSink::default();

    assert!(sink.emit(NotificationType::BillSent, now));
    assert!(!sink.emit(NotificationType::BillSent, now + Duration::hours(23)));
    assert!(sink.emit(NotificationType::BillSent, now + Duration::hours(24)));
}

#[test]
fn test_different_types_do_not_suppress_each_other() {
    let now = Utc::now();
    let mut sink = FakeSink::default();

    assert!(sink.emit(NotificationType::BillDueSoon, now));
    assert!(sink.emit(NotificationType::BillDueUrgent, now));
    assert!(sink.emit(NotificationType::BillOverdue, now));
}

// ============================================================================
// Priorities
// ============================================================================

#[test]
fn test_reminder_priorities_escalate() {
    assert!(
        NotificationType::BillDueSoon.default_priority()
            < NotificationType::BillDueUrgent.default_priority()
    );
    assert!(
        NotificationType::BillDueUrgent.default_priority()
            < NotificationType::BillOverdue.default_priority()
    );
    assert_eq!(NotificationType::BillOverdue.default_priority(), Priority::Urgent);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// At most one action fires for any age, and reminders never fire
    /// past day 30.
    #[test]
    fn prop_aging_action_single_and_ordered(days in 0i64..120) {
        match aging_action(days) {
            Some(AgingAction::Overdue) => prop_assert!(days >= OVERDUE_DAYS),
            Some(AgingAction::DueUrgent) => prop_assert_eq!(days, DUE_URGENT_DAYS),
            Some(AgingAction::DueSoon) => prop_assert_eq!(days, DUE_SOON_DAYS),
            None => prop_assert!(
                days < OVERDUE_DAYS && days != DUE_SOON_DAYS && days != DUE_URGENT_DAYS
            ),
        }
    }

    /// Repeated same-day checks emit at most one event per type.
    #[test]
    fn prop_same_day_checks_idempotent(
        repeats in 1usize..10,
        hours_apart in 0i64..4,
    ) {
        let sent = Utc::now();
        let mut status = PaymentStatus::Sent;
        let mut sink = FakeSink::default();

        let base = sent + Duration::days(DUE_SOON_DAYS);
        for i in 0..repeats {
            check_aging(&mut status, sent, base + Duration::hours(hours_apart * i as i64), &mut sink);
        }

        prop_assert!(sink.count(NotificationType::BillDueSoon) <= 1);
    }
}
