//! Billing service
//!
//! Groups completed programs of one customer into bills, computes
//! totals through rate resolution, and drives the payment-status state
//! machine with its notification side effects.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::LedgerSettings;
use crate::error::{LedgerError, LedgerResult};
use crate::render::{BillDocument, BillLineItem, DocumentRenderer};
use crate::services::allocation::billed_bill_number;
use crate::services::notification::NotificationService;
use crate::services::numbering::next_in_sequence;
use crate::services::rates::resolve_on;
use shared::{
    aging_action, bill_number_scope, calculate_bill_totals, compose_bill_notice, format_amount,
    format_bill_number, validate_tax_homogeneity, AgingAction, Bill, DateRange, NotificationType,
    PaymentStatus,
};

/// Billing service for invoices and their payment lifecycle
#[derive(Clone)]
pub struct BillingService {
    db: PgPool,
    settings: LedgerSettings,
    notifications: NotificationService,
    renderer: Option<Arc<dyn DocumentRenderer>>,
}

/// Database row for a bill
#[derive(Debug, sqlx::FromRow)]
struct BillRow {
    id: Uuid,
    bill_number: String,
    customer_id: Uuid,
    bill_date: NaiveDate,
    subtotal: Decimal,
    tax_total: Decimal,
    grand_total: Decimal,
    payment_status: String,
    sent_date: Option<DateTime<Utc>>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BillRow> for Bill {
    fn from(row: BillRow) -> Self {
        Bill {
            id: row.id,
            bill_number: row.bill_number,
            customer_id: row.customer_id,
            bill_date: row.bill_date,
            subtotal: row.subtotal,
            tax_total: row.tax_total,
            grand_total: row.grand_total,
            // The schema constrains status to known values
            payment_status: PaymentStatus::from_str(&row.payment_status)
                .unwrap_or(PaymentStatus::Draft),
            sent_date: row.sent_date,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for creating a bill
#[derive(Debug, Deserialize)]
pub struct CreateBillInput {
    pub customer_id: Uuid,
    /// Defaults to today when omitted
    pub bill_date: Option<NaiveDate>,
    pub program_ids: Vec<Uuid>,
    pub created_by: Option<Uuid>,
}

/// Filters for listing bills
#[derive(Debug, Default, Deserialize)]
pub struct BillFilter {
    pub customer_id: Option<Uuid>,
    pub payment_status: Option<PaymentStatus>,
    pub period: Option<DateRange>,
}

/// Result of an aging sweep over all Sent bills
#[derive(Debug, Clone, Copy)]
pub struct AgingSweep {
    pub checked: usize,
    pub transitioned: usize,
}

/// First allocation's lot for a program, which fixes the (customer,
/// grade) pair for rate resolution and the bill's tax status
#[derive(Debug, sqlx::FromRow)]
struct FirstLot {
    customer_id: Uuid,
    grade_id: Uuid,
    tax_registered: bool,
}

async fn first_lot(conn: &mut PgConnection, program_id: Uuid) -> LedgerResult<Option<FirstLot>> {
    let row = sqlx::query_as::<_, FirstLot>(
        r#"
        SELECT l.customer_id, l.grade_id, l.tax_registered
        FROM lot_allocations a
        JOIN material_lots l ON l.id = a.lot_id
        WHERE a.program_id = $1
        ORDER BY a.created_at, a.id
        LIMIT 1
        "#,
    )
    .bind(program_id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// The rate a program is billed at: its declared rate when non-zero,
/// otherwise the resolved (customer, grade) rate of its first lot.
async fn billed_rate(
    conn: &mut PgConnection,
    declared_rate: Option<Decimal>,
    lot: Option<&FirstLot>,
) -> LedgerResult<Decimal> {
    if let Some(rate) = declared_rate {
        if rate > Decimal::ZERO {
            return Ok(rate);
        }
    }
    match lot {
        Some(lot) => Ok(resolve_on(conn, lot.customer_id, lot.grade_id).await?.0),
        None => Ok(Decimal::ZERO),
    }
}

fn status_display(raw: &str) -> String {
    PaymentStatus::from_str(raw)
        .map(|status| status.to_string())
        .unwrap_or_else(|| raw.to_string())
}

impl BillingService {
    /// Create a new BillingService instance
    pub fn new(db: PgPool, settings: LedgerSettings) -> Self {
        let notifications = NotificationService::new(db.clone());
        Self {
            db,
            settings,
            notifications,
            renderer: None,
        }
    }

    /// Create with an injected document renderer
    pub fn with_renderer(
        db: PgPool,
        settings: LedgerSettings,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        let mut service = Self::new(db, settings);
        service.renderer = Some(renderer);
        service
    }

    /// Create a bill over a set of completed programs and compute its
    /// totals in the same transaction.
    ///
    /// Rejects program sets that are not all Completed, span customers
    /// or tax statuses, or contain a program already on a live bill
    /// (naming the conflicting bill).
    pub async fn create_bill(&self, input: CreateBillInput) -> LedgerResult<Bill> {
        if input.program_ids.is_empty() {
            return Err(LedgerError::validation(
                "program_ids",
                "At least one program is required",
            ));
        }

        let mut tx = self.db.begin().await?;

        let customer_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)")
                .bind(input.customer_id)
                .fetch_one(&mut *tx)
                .await?;
        if !customer_exists {
            return Err(LedgerError::NotFound("Customer".to_string()));
        }

        let programs = sqlx::query_as::<_, (Uuid, String, String, Decimal, Option<Decimal>)>(
            r#"
            SELECT id, program_number, status, output_quantity, declared_rate
            FROM production_programs
            WHERE id = ANY($1)
            ORDER BY program_number
            FOR UPDATE
            "#,
        )
        .bind(&input.program_ids)
        .fetch_all(&mut *tx)
        .await?;

        if programs.len() != input.program_ids.len() {
            return Err(LedgerError::NotFound("Program".to_string()));
        }

        for (_, program_number, status, _, _) in &programs {
            if status != "completed" {
                return Err(LedgerError::validation(
                    "program_ids",
                    format!("Program {} is not completed", program_number),
                ));
            }
        }

        let mut lots = Vec::with_capacity(programs.len());
        for (program_id, program_number, _, _, _) in &programs {
            match first_lot(&mut tx, *program_id).await? {
                Some(lot) => {
                    if lot.customer_id != input.customer_id {
                        return Err(LedgerError::validation(
                            "program_ids",
                            format!("Program {} belongs to a different customer", program_number),
                        ));
                    }
                    lots.push(lot);
                }
                None => {
                    return Err(LedgerError::validation(
                        "program_ids",
                        format!("Program {} has no lot allocations", program_number),
                    ));
                }
            }
        }

        // Every allocated lot across the program set must belong to the
        // billed customer, not just each program's first one
        let lot_customers = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT l.customer_id
            FROM lot_allocations a
            JOIN material_lots l ON l.id = a.lot_id
            WHERE a.program_id = ANY($1)
            "#,
        )
        .bind(&input.program_ids)
        .fetch_all(&mut *tx)
        .await?;
        if lot_customers.iter().any(|id| *id != input.customer_id) {
            return Err(LedgerError::validation(
                "program_ids",
                "All programs must belong to the billed customer",
            ));
        }

        let tax_flags: Vec<bool> = lots.iter().map(|lot| lot.tax_registered).collect();
        validate_tax_homogeneity(&tax_flags).map_err(|_| {
            LedgerError::TaxRegistrationMismatch(
                "All programs on a bill must share the same tax registration status".to_string(),
            )
        })?;

        for (program_id, program_number, _, _, _) in &programs {
            if let Some(bill_number) = billed_bill_number(&mut tx, *program_id).await? {
                return Err(LedgerError::AlreadyBilled {
                    program_number: program_number.clone(),
                    bill_number,
                });
            }
        }

        let mut line_amounts = Vec::with_capacity(programs.len());
        for ((_, _, _, output_quantity, declared_rate), lot) in programs.iter().zip(&lots) {
            let rate = billed_rate(&mut tx, *declared_rate, Some(lot)).await?;
            line_amounts.push(*output_quantity * rate);
        }

        let tax_registered = tax_flags.first().copied().unwrap_or(false);
        let totals = calculate_bill_totals(
            &line_amounts,
            tax_registered,
            self.settings.tax_rate_percent,
        );

        let year = Utc::now().year();
        let sequence = next_in_sequence(&mut tx, &bill_number_scope(year)).await?;
        let bill_number = format_bill_number(year, sequence);
        let bill_date = input.bill_date.unwrap_or_else(|| Utc::now().date_naive());

        let row = sqlx::query_as::<_, BillRow>(
            r#"
            INSERT INTO bills (
                bill_number, customer_id, bill_date, subtotal, tax_total, grand_total, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, bill_number, customer_id, bill_date, subtotal, tax_total, grand_total,
                      payment_status, sent_date, created_by, created_at, updated_at
            "#,
        )
        .bind(&bill_number)
        .bind(input.customer_id)
        .bind(bill_date)
        .bind(totals.subtotal)
        .bind(totals.tax_total)
        .bind(totals.grand_total)
        .bind(input.created_by)
        .fetch_one(&mut *tx)
        .await?;

        for (program_id, _, _, _, _) in &programs {
            sqlx::query("INSERT INTO bill_programs (bill_id, program_id) VALUES ($1, $2)")
                .bind(row.id)
                .bind(program_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "created bill {} over {} program(s)",
            row.bill_number,
            programs.len()
        );

        Ok(row.into())
    }

    /// Recompute and persist a bill's totals from its current program
    /// set. A bill with no programs or allocations is treated as not
    /// tax-registered.
    pub async fn recompute_totals(&self, bill_id: Uuid) -> LedgerResult<Bill> {
        let mut tx = self.db.begin().await?;

        sqlx::query_scalar::<_, Uuid>("SELECT id FROM bills WHERE id = $1 FOR UPDATE")
            .bind(bill_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| LedgerError::NotFound("Bill".to_string()))?;

        let programs = sqlx::query_as::<_, (Uuid, Decimal, Option<Decimal>)>(
            r#"
            SELECT p.id, p.output_quantity, p.declared_rate
            FROM production_programs p
            JOIN bill_programs bp ON bp.program_id = p.id
            WHERE bp.bill_id = $1
            ORDER BY p.program_number
            "#,
        )
        .bind(bill_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut line_amounts = Vec::with_capacity(programs.len());
        let mut tax_registered = false;
        for (index, (program_id, output_quantity, declared_rate)) in programs.iter().enumerate() {
            let lot = first_lot(&mut tx, *program_id).await?;
            if index == 0 {
                tax_registered = lot.as_ref().map(|l| l.tax_registered).unwrap_or(false);
            }
            let rate = billed_rate(&mut tx, *declared_rate, lot.as_ref()).await?;
            line_amounts.push(*output_quantity * rate);
        }

        let totals = calculate_bill_totals(
            &line_amounts,
            tax_registered,
            self.settings.tax_rate_percent,
        );

        let row = sqlx::query_as::<_, BillRow>(
            r#"
            UPDATE bills
            SET subtotal = $2, tax_total = $3, grand_total = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, bill_number, customer_id, bill_date, subtotal, tax_total, grand_total,
                      payment_status, sent_date, created_by, created_at, updated_at
            "#,
        )
        .bind(bill_id)
        .bind(totals.subtotal)
        .bind(totals.tax_total)
        .bind(totals.grand_total)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    /// Mark a bill Sent, stamping the sent date and emitting a
    /// `bill_sent` event. Allowed from Draft and Outstanding.
    pub async fn mark_sent(&self, bill_id: Uuid) -> LedgerResult<Bill> {
        let row = sqlx::query_as::<_, BillRow>(
            r#"
            UPDATE bills
            SET payment_status = 'sent', sent_date = NOW(), updated_at = NOW()
            WHERE id = $1 AND payment_status IN ('draft', 'outstanding')
            RETURNING id, bill_number, customer_id, bill_date, subtotal, tax_total, grand_total,
                      payment_status, sent_date, created_by, created_at, updated_at
            "#,
        )
        .bind(bill_id)
        .fetch_optional(&self.db)
        .await?;

        let bill: Bill = match row {
            Some(row) => row.into(),
            None => return Err(self.transition_error(bill_id, PaymentStatus::Sent).await?),
        };

        self.notify_bill(&bill, NotificationType::BillSent, 0).await?;

        tracing::info!("bill {} marked as sent", bill.bill_number);

        Ok(bill)
    }

    /// Mark a bill Paid, emitting a `bill_paid` event. Allowed from Sent
    /// and Outstanding; Paid is terminal.
    pub async fn mark_paid(&self, bill_id: Uuid) -> LedgerResult<Bill> {
        let row = sqlx::query_as::<_, BillRow>(
            r#"
            UPDATE bills
            SET payment_status = 'paid', updated_at = NOW()
            WHERE id = $1 AND payment_status IN ('sent', 'outstanding')
            RETURNING id, bill_number, customer_id, bill_date, subtotal, tax_total, grand_total,
                      payment_status, sent_date, created_by, created_at, updated_at
            "#,
        )
        .bind(bill_id)
        .fetch_optional(&self.db)
        .await?;

        let bill: Bill = match row {
            Some(row) => row.into(),
            None => return Err(self.transition_error(bill_id, PaymentStatus::Paid).await?),
        };

        self.notify_bill(&bill, NotificationType::BillPaid, 0).await?;

        tracing::info!("bill {} marked as paid", bill.bill_number);

        Ok(bill)
    }

    /// Mark a bill Scrap, releasing its programs for re-billing. Never
    /// allowed from Paid.
    pub async fn mark_scrap(&self, bill_id: Uuid) -> LedgerResult<Bill> {
        let row = sqlx::query_as::<_, BillRow>(
            r#"
            UPDATE bills
            SET payment_status = 'scrap', updated_at = NOW()
            WHERE id = $1 AND payment_status IN ('draft', 'sent', 'outstanding')
            RETURNING id, bill_number, customer_id, bill_date, subtotal, tax_total, grand_total,
                      payment_status, sent_date, created_by, created_at, updated_at
            "#,
        )
        .bind(bill_id)
        .fetch_optional(&self.db)
        .await?;

        let bill: Bill = match row {
            Some(row) => row.into(),
            None => return Err(self.transition_error(bill_id, PaymentStatus::Scrap).await?),
        };

        tracing::info!("bill {} marked as scrap", bill.bill_number);

        Ok(bill)
    }

    /// Re-evaluate a Sent bill's age. Emits the day-20 and day-25
    /// reminders and flips the bill to Outstanding from day 30, emitting
    /// `bill_overdue`. Returns whether the status changed. Safe to call
    /// repeatedly; the notification de-duplication window makes repeated
    /// same-day checks no-ops.
    pub async fn check_aging(&self, bill_id: Uuid) -> LedgerResult<bool> {
        let bill = self.get_bill(bill_id).await?;

        if bill.payment_status != PaymentStatus::Sent {
            return Ok(false);
        }
        let sent_date = match bill.sent_date {
            Some(date) => date,
            None => return Ok(false),
        };

        let days = (Utc::now() - sent_date).num_days();
        match aging_action(days) {
            None => Ok(false),
            Some(AgingAction::DueSoon) => {
                self.notify_bill(&bill, NotificationType::BillDueSoon, days)
                    .await?;
                Ok(false)
            }
            Some(AgingAction::DueUrgent) => {
                self.notify_bill(&bill, NotificationType::BillDueUrgent, days)
                    .await?;
                Ok(false)
            }
            Some(AgingAction::Overdue) => {
                let result = sqlx::query(
                    r#"
                    UPDATE bills
                    SET payment_status = 'outstanding', updated_at = NOW()
                    WHERE id = $1 AND payment_status = 'sent'
                    "#,
                )
                .bind(bill_id)
                .execute(&self.db)
                .await?;

                if result.rows_affected() == 0 {
                    return Ok(false);
                }

                self.notify_bill(&bill, NotificationType::BillOverdue, days)
                    .await?;

                tracing::info!("bill {} aged into outstanding", bill.bill_number);

                Ok(true)
            }
        }
    }

    /// Run the aging check over every Sent bill
    pub async fn check_all_aging(&self) -> LedgerResult<AgingSweep> {
        let bill_ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM bills WHERE payment_status = 'sent' AND sent_date IS NOT NULL ORDER BY sent_date",
        )
        .fetch_all(&self.db)
        .await?;

        let mut sweep = AgingSweep {
            checked: bill_ids.len(),
            transitioned: 0,
        };
        for bill_id in bill_ids {
            if self.check_aging(bill_id).await? {
                sweep.transitioned += 1;
            }
        }

        Ok(sweep)
    }

    /// Render the bill through the injected document renderer and store
    /// the returned blob on the bill.
    pub async fn render_document(&self, bill_id: Uuid) -> LedgerResult<Vec<u8>> {
        let renderer = match &self.renderer {
            Some(renderer) => renderer.clone(),
            None => {
                return Err(LedgerError::Configuration(
                    "No document renderer configured".to_string(),
                ))
            }
        };

        let bill = self.get_bill(bill_id).await?;

        let (customer_name, customer_address) = sqlx::query_as::<_, (String, Option<String>)>(
            "SELECT name, address FROM customers WHERE id = $1",
        )
        .bind(bill.customer_id)
        .fetch_one(&self.db)
        .await?;

        let mut conn = self.db.acquire().await?;

        let programs = sqlx::query_as::<_, (Uuid, String, Option<String>, Decimal, Option<Decimal>)>(
            r#"
            SELECT p.id, p.program_number, p.design_ref, p.output_quantity, p.declared_rate
            FROM production_programs p
            JOIN bill_programs bp ON bp.program_id = p.id
            WHERE bp.bill_id = $1
            ORDER BY p.program_number
            "#,
        )
        .bind(bill_id)
        .fetch_all(&mut *conn)
        .await?;

        let mut line_items = Vec::with_capacity(programs.len());
        let mut tax_registered = false;
        for (index, (program_id, program_number, design_ref, output_quantity, declared_rate)) in
            programs.iter().enumerate()
        {
            let lot_rows = sqlx::query_as::<_, (String, Uuid, Uuid, bool, String)>(
                r#"
                SELECT l.lot_number, l.customer_id, l.grade_id, l.tax_registered, g.name
                FROM lot_allocations a
                JOIN material_lots l ON l.id = a.lot_id
                JOIN material_grades g ON g.id = l.grade_id
                WHERE a.program_id = $1
                ORDER BY a.created_at, a.id
                "#,
            )
            .bind(program_id)
            .fetch_all(&mut *conn)
            .await?;

            if index == 0 {
                tax_registered = lot_rows.first().map(|row| row.3).unwrap_or(false);
            }

            let first = lot_rows.first().map(|row| FirstLot {
                customer_id: row.1,
                grade_id: row.2,
                tax_registered: row.3,
            });
            let rate = billed_rate(&mut conn, *declared_rate, first.as_ref()).await?;

            line_items.push(BillLineItem {
                program_number: program_number.clone(),
                design_ref: design_ref.clone(),
                grade_name: lot_rows
                    .first()
                    .map(|row| row.4.clone())
                    .unwrap_or_default(),
                lot_numbers: lot_rows.iter().map(|row| row.0.clone()).collect(),
                quantity: *output_quantity,
                rate,
                amount: *output_quantity * rate,
            });
        }

        let document = BillDocument {
            bill_number: bill.bill_number.clone(),
            bill_date: bill.bill_date,
            customer_name,
            customer_address,
            currency_symbol: self.settings.currency_symbol.clone(),
            tax_registered,
            line_items,
            subtotal: bill.subtotal,
            tax_total: bill.tax_total,
            grand_total: bill.grand_total,
        };

        let blob = renderer.render(&document)?;

        sqlx::query("UPDATE bills SET document = $2, updated_at = NOW() WHERE id = $1")
            .bind(bill_id)
            .bind(&blob)
            .execute(&self.db)
            .await?;

        Ok(blob)
    }

    /// Fetch the stored rendered document, if any
    pub async fn get_document(&self, bill_id: Uuid) -> LedgerResult<Option<Vec<u8>>> {
        let document = sqlx::query_scalar::<_, Option<Vec<u8>>>(
            "SELECT document FROM bills WHERE id = $1",
        )
        .bind(bill_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| LedgerError::NotFound("Bill".to_string()))?;

        Ok(document)
    }

    /// Get a bill by ID
    pub async fn get_bill(&self, bill_id: Uuid) -> LedgerResult<Bill> {
        let row = sqlx::query_as::<_, BillRow>(
            r#"
            SELECT id, bill_number, customer_id, bill_date, subtotal, tax_total, grand_total,
                   payment_status, sent_date, created_by, created_at, updated_at
            FROM bills
            WHERE id = $1
            "#,
        )
        .bind(bill_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| LedgerError::NotFound("Bill".to_string()))?;

        Ok(row.into())
    }

    /// List bills matching the filter, newest first
    pub async fn list_bills(&self, filter: BillFilter) -> LedgerResult<Vec<Bill>> {
        let rows = sqlx::query_as::<_, BillRow>(
            r#"
            SELECT id, bill_number, customer_id, bill_date, subtotal, tax_total, grand_total,
                   payment_status, sent_date, created_by, created_at, updated_at
            FROM bills
            WHERE ($1::uuid IS NULL OR customer_id = $1)
              AND ($2::text IS NULL OR payment_status = $2)
              AND ($3::date IS NULL OR bill_date >= $3)
              AND ($4::date IS NULL OR bill_date <= $4)
            ORDER BY bill_number DESC
            "#,
        )
        .bind(filter.customer_id)
        .bind(filter.payment_status.map(|status| status.as_str()))
        .bind(filter.period.as_ref().map(|period| period.start))
        .bind(filter.period.as_ref().map(|period| period.end))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The programs linked to a bill, by ID
    pub async fn bill_program_ids(&self, bill_id: Uuid) -> LedgerResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT p.id
            FROM production_programs p
            JOIN bill_programs bp ON bp.program_id = p.id
            WHERE bp.bill_id = $1
            ORDER BY p.program_number
            "#,
        )
        .bind(bill_id)
        .fetch_all(&self.db)
        .await?;

        Ok(ids)
    }

    /// Build the rejection for an illegal transition, distinguishing a
    /// missing bill from a state-machine violation.
    async fn transition_error(
        &self,
        bill_id: Uuid,
        to: PaymentStatus,
    ) -> LedgerResult<LedgerError> {
        let current =
            sqlx::query_scalar::<_, String>("SELECT payment_status FROM bills WHERE id = $1")
                .bind(bill_id)
                .fetch_optional(&self.db)
                .await?;

        Ok(match current {
            None => LedgerError::NotFound("Bill".to_string()),
            Some(status) => LedgerError::InvalidTransition {
                from: status_display(&status),
                to: to.to_string(),
            },
        })
    }

    /// Emit a bill lifecycle notification, subject to the 24-hour
    /// de-duplication window.
    async fn notify_bill(
        &self,
        bill: &Bill,
        kind: NotificationType,
        days_since_sent: i64,
    ) -> LedgerResult<()> {
        let customer_name =
            sqlx::query_scalar::<_, String>("SELECT name FROM customers WHERE id = $1")
                .bind(bill.customer_id)
                .fetch_one(&self.db)
                .await?;

        let amount = format_amount(&self.settings.currency_symbol, bill.grand_total);
        if let Some((title, message)) = compose_bill_notice(
            kind,
            &bill.bill_number,
            &customer_name,
            &amount,
            days_since_sent,
        ) {
            self.notifications
                .emit(
                    kind,
                    kind.default_priority(),
                    &title,
                    &message,
                    Some(bill.id),
                    Some(bill.customer_id),
                )
                .await?;
        }

        Ok(())
    }
}
