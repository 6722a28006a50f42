//! Notification sink
//!
//! Append-only log of emitted events with read/dismiss state. Repeated
//! events of the same (bill, type) pair within 24 hours are silently
//! absorbed; that no-op is the idempotence guarantee the aging check
//! relies on, not an error.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use shared::{
    compose_high_wastage, compose_low_stock, Notification, NotificationType, Priority,
};

/// Notification service managing the event log
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
}

/// Database row for a notification
#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    notification_type: String,
    priority: String,
    title: String,
    message: String,
    bill_id: Option<Uuid>,
    customer_id: Option<Uuid>,
    is_read: bool,
    is_dismissed: bool,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            // The schema constrains both columns to known values
            notification_type: NotificationType::from_str(&row.notification_type)
                .unwrap_or(NotificationType::BillSent),
            priority: Priority::from_str(&row.priority).unwrap_or(Priority::Medium),
            title: row.title,
            message: row.message,
            bill_id: row.bill_id,
            customer_id: row.customer_id,
            is_read: row.is_read,
            is_dismissed: row.is_dismissed,
            read_at: row.read_at,
            created_at: row.created_at,
        }
    }
}

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Insert an event unless an undismissed event of the same
    /// (bill, type) pair was created within the last 24 hours, in which
    /// case the call is a silent no-op returning `None`.
    ///
    /// Events without a bill link de-duplicate per (customer, type)
    /// within the same window; events with neither link always insert.
    pub async fn emit(
        &self,
        kind: NotificationType,
        priority: Priority,
        title: &str,
        message: &str,
        bill_id: Option<Uuid>,
        customer_id: Option<Uuid>,
    ) -> LedgerResult<Option<Notification>> {
        let duplicate = if let Some(bill_id) = bill_id {
            sqlx::query_scalar::<_, bool>(
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM notifications
                    WHERE bill_id = $1
                      AND notification_type = $2
                      AND is_dismissed = FALSE
                      AND created_at >= NOW() - INTERVAL '24 hours'
                )
                "#,
            )
            .bind(bill_id)
            .bind(kind.as_str())
            .fetch_one(&self.db)
            .await?
        } else if let Some(customer_id) = customer_id {
            sqlx::query_scalar::<_, bool>(
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM notifications
                    WHERE customer_id = $1
                      AND bill_id IS NULL
                      AND notification_type = $2
                      AND is_dismissed = FALSE
                      AND created_at >= NOW() - INTERVAL '24 hours'
                )
                "#,
            )
            .bind(customer_id)
            .bind(kind.as_str())
            .fetch_one(&self.db)
            .await?
        } else {
            false
        };

        if duplicate {
            return Ok(None);
        }

        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            INSERT INTO notifications (notification_type, priority, title, message, bill_id, customer_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, notification_type, priority, title, message, bill_id, customer_id,
                      is_read, is_dismissed, read_at, created_at
            "#,
        )
        .bind(kind.as_str())
        .bind(priority.as_str())
        .bind(title)
        .bind(message)
        .bind(bill_id)
        .bind(customer_id)
        .fetch_one(&self.db)
        .await?;

        Ok(Some(row.into()))
    }

    /// Emit a low-stock alert for a lot, on behalf of an external
    /// inventory monitor
    pub async fn emit_low_stock(
        &self,
        lot_number: &str,
        customer_id: Uuid,
        current_balance: Decimal,
        balance_percent: Decimal,
    ) -> LedgerResult<Option<Notification>> {
        let (title, message) = compose_low_stock(lot_number, current_balance, balance_percent);
        self.emit(
            NotificationType::LowStock,
            NotificationType::LowStock.default_priority(),
            &title,
            &message,
            None,
            Some(customer_id),
        )
        .await
    }

    /// Emit a high-wastage alert for a program, on behalf of an external
    /// production monitor
    pub async fn emit_high_wastage(
        &self,
        program_number: &str,
        customer_id: Option<Uuid>,
        wastage_percent: Decimal,
        threshold_percent: Decimal,
    ) -> LedgerResult<Option<Notification>> {
        let (title, message) =
            compose_high_wastage(program_number, wastage_percent, threshold_percent);
        self.emit(
            NotificationType::HighWastage,
            NotificationType::HighWastage.default_priority(),
            &title,
            &message,
            None,
            customer_id,
        )
        .await
    }

    /// List undismissed notifications, newest first
    pub async fn list(&self, unread_only: bool, limit: i64) -> LedgerResult<Vec<Notification>> {
        let rows = if unread_only {
            sqlx::query_as::<_, NotificationRow>(
                r#"
                SELECT id, notification_type, priority, title, message, bill_id, customer_id,
                       is_read, is_dismissed, read_at, created_at
                FROM notifications
                WHERE is_read = FALSE AND is_dismissed = FALSE
                ORDER BY created_at DESC
                LIMIT $1
                "#,
            )
            .bind(limit)
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query_as::<_, NotificationRow>(
                r#"
                SELECT id, notification_type, priority, title, message, bill_id, customer_id,
                       is_read, is_dismissed, read_at, created_at
                FROM notifications
                WHERE is_dismissed = FALSE
                ORDER BY created_at DESC
                LIMIT $1
                "#,
            )
            .bind(limit)
            .fetch_all(&self.db)
            .await?
        };

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Count of unread, undismissed notifications
    pub async fn unread_count(&self) -> LedgerResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE is_read = FALSE AND is_dismissed = FALSE",
        )
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    /// Mark a notification as read
    pub async fn mark_read(&self, notification_id: i64) -> LedgerResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
            WHERE id = $1
            "#,
        )
        .bind(notification_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound("Notification".to_string()));
        }

        Ok(())
    }

    /// Mark all unread notifications as read, returning how many changed
    pub async fn mark_all_read(&self) -> LedgerResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = NOW()
            WHERE is_read = FALSE AND is_dismissed = FALSE
            "#,
        )
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Dismiss a notification; dismissed events no longer suppress
    /// duplicates
    pub async fn dismiss(&self, notification_id: i64) -> LedgerResult<()> {
        let result = sqlx::query("UPDATE notifications SET is_dismissed = TRUE WHERE id = $1")
            .bind(notification_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound("Notification".to_string()));
        }

        Ok(())
    }
}
