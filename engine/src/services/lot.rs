//! Inward lot service
//!
//! Owns lot creation, numbering and the running balance. Balance
//! mutations happen only through the debit/credit helpers, which run
//! inside the allocation transaction that triggered them and lock the
//! lot row for the duration.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{on_unique_violation, LedgerError, LedgerResult};
use crate::services::numbering::next_in_sequence;
use shared::{
    format_lot_number, lot_number_scope, validate_positive_quantity, MaterialLot,
};

/// Lot service for managing inward material lots
#[derive(Clone)]
pub struct LotService {
    db: PgPool,
}

/// Database row for a material lot
#[derive(Debug, sqlx::FromRow)]
struct LotRow {
    id: Uuid,
    lot_number: String,
    customer_id: Uuid,
    grade_id: Uuid,
    total_quantity: Decimal,
    current_balance: Decimal,
    received_date: NaiveDate,
    fiscal_year: i32,
    tax_registered: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LotRow> for MaterialLot {
    fn from(row: LotRow) -> Self {
        MaterialLot {
            id: row.id,
            lot_number: row.lot_number,
            customer_id: row.customer_id,
            grade_id: row.grade_id,
            total_quantity: row.total_quantity,
            current_balance: row.current_balance,
            received_date: row.received_date,
            fiscal_year: row.fiscal_year,
            tax_registered: row.tax_registered,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for creating a lot
#[derive(Debug, Deserialize)]
pub struct CreateLotInput {
    pub customer_id: Uuid,
    pub grade_id: Uuid,
    pub total_quantity: Decimal,
    /// Defaults to today when omitted
    pub received_date: Option<NaiveDate>,
    pub fiscal_year: i32,
    pub tax_registered: bool,
    pub notes: Option<String>,
}

impl LotService {
    /// Create a new LotService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a lot with its balance equal to the received quantity.
    ///
    /// The lot number is drawn from the fiscal-year sequence inside the
    /// creating transaction, so concurrent creators cannot collide.
    pub async fn create_lot(&self, input: CreateLotInput) -> LedgerResult<MaterialLot> {
        validate_positive_quantity(input.total_quantity)
            .map_err(|msg| LedgerError::validation("total_quantity", msg))?;

        let customer_active = sqlx::query_scalar::<_, bool>(
            "SELECT is_active FROM customers WHERE id = $1",
        )
        .bind(input.customer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| LedgerError::NotFound("Customer".to_string()))?;
        if !customer_active {
            return Err(LedgerError::validation(
                "customer_id",
                "Customer is deactivated",
            ));
        }

        let grade_active = sqlx::query_scalar::<_, bool>(
            "SELECT is_active FROM material_grades WHERE id = $1",
        )
        .bind(input.grade_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| LedgerError::NotFound("Grade".to_string()))?;
        if !grade_active {
            return Err(LedgerError::validation("grade_id", "Grade is disabled"));
        }

        let received_date = input
            .received_date
            .unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;

        let sequence = next_in_sequence(&mut tx, &lot_number_scope(input.fiscal_year)).await?;
        let lot_number = format_lot_number(input.fiscal_year, sequence);

        let row = sqlx::query_as::<_, LotRow>(
            r#"
            INSERT INTO material_lots (
                lot_number, customer_id, grade_id, total_quantity, current_balance,
                received_date, fiscal_year, tax_registered, notes
            )
            VALUES ($1, $2, $3, $4, $4, $5, $6, $7, $8)
            RETURNING id, lot_number, customer_id, grade_id, total_quantity, current_balance,
                      received_date, fiscal_year, tax_registered, notes, created_at, updated_at
            "#,
        )
        .bind(&lot_number)
        .bind(input.customer_id)
        .bind(input.grade_id)
        .bind(input.total_quantity)
        .bind(received_date)
        .bind(input.fiscal_year)
        .bind(input.tax_registered)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| on_unique_violation(e, "lot number"))?;

        tx.commit().await?;

        tracing::info!("created lot {}", row.lot_number);

        Ok(row.into())
    }

    /// Get a lot by ID
    pub async fn get_lot(&self, lot_id: Uuid) -> LedgerResult<MaterialLot> {
        let row = sqlx::query_as::<_, LotRow>(
            r#"
            SELECT id, lot_number, customer_id, grade_id, total_quantity, current_balance,
                   received_date, fiscal_year, tax_registered, notes, created_at, updated_at
            FROM material_lots
            WHERE id = $1
            "#,
        )
        .bind(lot_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| LedgerError::NotFound("Lot".to_string()))?;

        Ok(row.into())
    }

    /// List lots, optionally filtered by customer and fiscal year
    pub async fn list_lots(
        &self,
        customer_id: Option<Uuid>,
        fiscal_year: Option<i32>,
    ) -> LedgerResult<Vec<MaterialLot>> {
        let rows = sqlx::query_as::<_, LotRow>(
            r#"
            SELECT id, lot_number, customer_id, grade_id, total_quantity, current_balance,
                   received_date, fiscal_year, tax_registered, notes, created_at, updated_at
            FROM material_lots
            WHERE ($1::uuid IS NULL OR customer_id = $1)
              AND ($2::int4 IS NULL OR fiscal_year = $2)
            ORDER BY lot_number DESC
            "#,
        )
        .bind(customer_id)
        .bind(fiscal_year)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// List lots with usable balance, largest balance first
    pub async fn available_lots(
        &self,
        min_balance: Decimal,
        grade_id: Option<Uuid>,
    ) -> LedgerResult<Vec<MaterialLot>> {
        let rows = sqlx::query_as::<_, LotRow>(
            r#"
            SELECT id, lot_number, customer_id, grade_id, total_quantity, current_balance,
                   received_date, fiscal_year, tax_registered, notes, created_at, updated_at
            FROM material_lots
            WHERE current_balance > $1
              AND ($2::uuid IS NULL OR grade_id = $2)
            ORDER BY current_balance DESC
            "#,
        )
        .bind(min_balance)
        .bind(grade_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Remaining balance as a percentage of the received quantity
    pub async fn balance_percentage(&self, lot_id: Uuid) -> LedgerResult<Decimal> {
        let lot = self.get_lot(lot_id).await?;
        Ok(lot.balance_percentage())
    }

    /// Delete a lot. Refused while any allocation references it.
    pub async fn delete_lot(&self, lot_id: Uuid) -> LedgerResult<()> {
        let mut tx = self.db.begin().await?;

        let lot = lock_lot(&mut tx, lot_id).await?;

        let allocation_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM lot_allocations WHERE lot_id = $1")
                .bind(lot_id)
                .fetch_one(&mut *tx)
                .await?;

        if allocation_count > 0 {
            return Err(LedgerError::Conflict {
                resource: "lot".to_string(),
                message: format!(
                    "Lot {} has {} allocation(s) and cannot be deleted",
                    lot.lot_number, allocation_count
                ),
            });
        }

        sqlx::query("DELETE FROM material_lots WHERE id = $1")
            .bind(lot_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}

/// Lot fields needed while its row is locked during a balance mutation
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LockedLot {
    pub id: Uuid,
    pub lot_number: String,
    pub current_balance: Decimal,
    pub tax_registered: bool,
}

/// Lock a lot row for the remainder of the transaction
pub(crate) async fn lock_lot(conn: &mut PgConnection, lot_id: Uuid) -> LedgerResult<LockedLot> {
    sqlx::query_as::<_, LockedLot>(
        r#"
        SELECT id, lot_number, current_balance, tax_registered
        FROM material_lots
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(lot_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| LedgerError::NotFound("Lot".to_string()))
}

/// Debit a locked lot's balance. Fails with `InsufficientBalance` when
/// the remaining balance cannot cover the quantity.
pub(crate) async fn debit_balance(
    conn: &mut PgConnection,
    lot: &LockedLot,
    quantity: Decimal,
) -> LedgerResult<()> {
    validate_positive_quantity(quantity)
        .map_err(|msg| LedgerError::validation("quantity", msg))?;

    if lot.current_balance < quantity {
        return Err(LedgerError::InsufficientBalance {
            lot_number: lot.lot_number.clone(),
            available: lot.current_balance,
            requested: quantity,
        });
    }

    sqlx::query(
        "UPDATE material_lots SET current_balance = current_balance - $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(quantity)
    .bind(lot.id)
    .execute(conn)
    .await?;

    Ok(())
}

/// Credit quantity back to a lot. Credits only restore previously
/// debited quantity under caller discipline; the schema's balance check
/// still bounds the result.
pub(crate) async fn credit_balance(
    conn: &mut PgConnection,
    lot_id: Uuid,
    quantity: Decimal,
) -> LedgerResult<()> {
    sqlx::query(
        "UPDATE material_lots SET current_balance = current_balance + $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(quantity)
    .bind(lot_id)
    .execute(conn)
    .await?;

    Ok(())
}
