//! Allocation engine
//!
//! Creates, adjusts and removes the links between production programs
//! and inward lots. Every operation couples the allocation row write
//! with the matching lot debit or credit inside one transaction; either
//! both land or neither does.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{on_unique_violation, LedgerError, LedgerResult};
use crate::services::lot::{credit_balance, debit_balance, lock_lot};
use shared::{
    validate_allocation_total, validate_positive_quantity, LotAllocation, ProgramStatus,
};

/// Allocation service linking programs to lots
#[derive(Clone)]
pub struct AllocationService {
    db: PgPool,
}

/// Database row for a lot allocation
#[derive(Debug, sqlx::FromRow)]
struct AllocationRow {
    id: Uuid,
    program_id: Uuid,
    lot_id: Uuid,
    quantity: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AllocationRow> for LotAllocation {
    fn from(row: AllocationRow) -> Self {
        LotAllocation {
            id: row.id,
            program_id: row.program_id,
            lot_id: row.lot_id,
            quantity: row.quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Program fields needed while its row is locked during allocation work
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProgramGuard {
    pub id: Uuid,
    pub program_number: String,
    pub status: String,
    pub input_quantity: Decimal,
}

impl ProgramGuard {
    pub(crate) fn is_completed(&self) -> bool {
        self.status == ProgramStatus::Completed.as_str()
    }
}

/// Lock a program row for the remainder of the transaction
pub(crate) async fn lock_program(
    conn: &mut PgConnection,
    program_id: Uuid,
) -> LedgerResult<ProgramGuard> {
    sqlx::query_as::<_, ProgramGuard>(
        r#"
        SELECT id, program_number, status, input_quantity
        FROM production_programs
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(program_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| LedgerError::NotFound("Program".to_string()))
}

/// Number of the live (non-Scrap) bill holding this program, if any
pub(crate) async fn billed_bill_number(
    conn: &mut PgConnection,
    program_id: Uuid,
) -> LedgerResult<Option<String>> {
    let bill_number = sqlx::query_scalar::<_, String>(
        r#"
        SELECT b.bill_number
        FROM bills b
        JOIN bill_programs bp ON bp.bill_id = b.id
        WHERE bp.program_id = $1 AND b.payment_status <> 'scrap'
        ORDER BY b.created_at
        LIMIT 1
        "#,
    )
    .bind(program_id)
    .fetch_optional(conn)
    .await?;

    Ok(bill_number)
}

/// Reject allocation changes on billed or completed programs
async fn ensure_allocations_mutable(
    conn: &mut PgConnection,
    program: &ProgramGuard,
) -> LedgerResult<()> {
    if let Some(bill_number) = billed_bill_number(conn, program.id).await? {
        return Err(LedgerError::AlreadyBilled {
            program_number: program.program_number.clone(),
            bill_number,
        });
    }
    if program.is_completed() {
        return Err(LedgerError::Conflict {
            resource: "program".to_string(),
            message: format!(
                "Program {} is completed; its allocations can no longer change",
                program.program_number
            ),
        });
    }
    Ok(())
}

/// Insert an allocation and debit the lot on an existing transaction.
///
/// Enforces the positive-quantity, balance and tax-homogeneity rules;
/// the caller owns the program guards and the commit.
pub(crate) async fn insert_allocation(
    conn: &mut PgConnection,
    program: &ProgramGuard,
    lot_id: Uuid,
    quantity: Decimal,
) -> LedgerResult<LotAllocation> {
    validate_positive_quantity(quantity)
        .map_err(|msg| LedgerError::validation("quantity", msg))?;

    let lot = lock_lot(&mut *conn, lot_id).await?;

    let existing_flag = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT l.tax_registered
        FROM lot_allocations a
        JOIN material_lots l ON l.id = a.lot_id
        WHERE a.program_id = $1
        ORDER BY a.created_at, a.id
        LIMIT 1
        "#,
    )
    .bind(program.id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(flag) = existing_flag {
        if flag != lot.tax_registered {
            return Err(LedgerError::TaxRegistrationMismatch(format!(
                "Lot {} is {} but program {}'s existing lots are {}",
                lot.lot_number,
                tax_label(lot.tax_registered),
                program.program_number,
                tax_label(flag)
            )));
        }
    }

    debit_balance(&mut *conn, &lot, quantity).await?;

    let row = sqlx::query_as::<_, AllocationRow>(
        r#"
        INSERT INTO lot_allocations (program_id, lot_id, quantity)
        VALUES ($1, $2, $3)
        RETURNING id, program_id, lot_id, quantity, created_at, updated_at
        "#,
    )
    .bind(program.id)
    .bind(lot_id)
    .bind(quantity)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| on_unique_violation(e, "allocation for this program and lot"))?;

    Ok(row.into())
}

fn tax_label(tax_registered: bool) -> &'static str {
    if tax_registered {
        "tax-registered"
    } else {
        "unregistered"
    }
}

impl AllocationService {
    /// Create a new AllocationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Allocate quantity from a lot to a program, debiting the lot's
    /// balance in the same transaction.
    pub async fn create_allocation(
        &self,
        program_id: Uuid,
        lot_id: Uuid,
        quantity: Decimal,
    ) -> LedgerResult<LotAllocation> {
        let mut tx = self.db.begin().await?;

        let program = lock_program(&mut tx, program_id).await?;
        ensure_allocations_mutable(&mut tx, &program).await?;

        let allocation = insert_allocation(&mut tx, &program, lot_id, quantity).await?;

        tx.commit().await?;

        tracing::info!(
            "allocated {} from lot to program {}",
            allocation.quantity,
            program.program_number
        );

        Ok(allocation)
    }

    /// Change an allocation's quantity, adjusting the lot balance by the
    /// delta. A further debit is checked against the remaining balance;
    /// a reduction credits the difference back.
    pub async fn update_allocation(
        &self,
        allocation_id: Uuid,
        new_quantity: Decimal,
    ) -> LedgerResult<LotAllocation> {
        validate_positive_quantity(new_quantity)
            .map_err(|msg| LedgerError::validation("quantity", msg))?;

        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_as::<_, AllocationRow>(
            r#"
            SELECT id, program_id, lot_id, quantity, created_at, updated_at
            FROM lot_allocations
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(allocation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| LedgerError::NotFound("Allocation".to_string()))?;

        let program = lock_program(&mut tx, existing.program_id).await?;
        ensure_allocations_mutable(&mut tx, &program).await?;

        let lot = lock_lot(&mut tx, existing.lot_id).await?;

        let delta = new_quantity - existing.quantity;
        if delta > Decimal::ZERO {
            debit_balance(&mut tx, &lot, delta).await?;
        } else if delta < Decimal::ZERO {
            credit_balance(&mut tx, lot.id, -delta).await?;
        }

        let row = sqlx::query_as::<_, AllocationRow>(
            r#"
            UPDATE lot_allocations
            SET quantity = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, program_id, lot_id, quantity, created_at, updated_at
            "#,
        )
        .bind(allocation_id)
        .bind(new_quantity)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    /// Remove an allocation, crediting its quantity back to the lot
    pub async fn delete_allocation(&self, allocation_id: Uuid) -> LedgerResult<()> {
        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_as::<_, AllocationRow>(
            r#"
            SELECT id, program_id, lot_id, quantity, created_at, updated_at
            FROM lot_allocations
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(allocation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| LedgerError::NotFound("Allocation".to_string()))?;

        let program = lock_program(&mut tx, existing.program_id).await?;
        ensure_allocations_mutable(&mut tx, &program).await?;

        let lot = lock_lot(&mut tx, existing.lot_id).await?;
        credit_balance(&mut tx, lot.id, existing.quantity).await?;

        sqlx::query("DELETE FROM lot_allocations WHERE id = $1")
            .bind(allocation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Check that a program's allocations reconcile with its declared
    /// input quantity. The check only applies once at least one
    /// allocation exists.
    pub async fn validate_program_allocations(&self, program_id: Uuid) -> LedgerResult<()> {
        let input_quantity = sqlx::query_scalar::<_, Decimal>(
            "SELECT input_quantity FROM production_programs WHERE id = $1",
        )
        .bind(program_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| LedgerError::NotFound("Program".to_string()))?;

        let quantities = sqlx::query_scalar::<_, Decimal>(
            "SELECT quantity FROM lot_allocations WHERE program_id = $1",
        )
        .bind(program_id)
        .fetch_all(&self.db)
        .await?;

        check_allocation_total(&quantities, input_quantity)
    }

    /// Get an allocation by ID
    pub async fn get_allocation(&self, allocation_id: Uuid) -> LedgerResult<LotAllocation> {
        let row = sqlx::query_as::<_, AllocationRow>(
            r#"
            SELECT id, program_id, lot_id, quantity, created_at, updated_at
            FROM lot_allocations
            WHERE id = $1
            "#,
        )
        .bind(allocation_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| LedgerError::NotFound("Allocation".to_string()))?;

        Ok(row.into())
    }

    /// List a program's allocations in creation order
    pub async fn list_for_program(&self, program_id: Uuid) -> LedgerResult<Vec<LotAllocation>> {
        let rows = sqlx::query_as::<_, AllocationRow>(
            r#"
            SELECT id, program_id, lot_id, quantity, created_at, updated_at
            FROM lot_allocations
            WHERE program_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(program_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// List the allocations drawing on a lot
    pub async fn list_for_lot(&self, lot_id: Uuid) -> LedgerResult<Vec<LotAllocation>> {
        let rows = sqlx::query_as::<_, AllocationRow>(
            r#"
            SELECT id, program_id, lot_id, quantity, created_at, updated_at
            FROM lot_allocations
            WHERE lot_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(lot_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Reconcile allocated quantities against the program input within the
/// 0.01 tolerance.
pub(crate) fn check_allocation_total(
    quantities: &[Decimal],
    input_quantity: Decimal,
) -> LedgerResult<()> {
    validate_allocation_total(quantities, input_quantity).map_err(|_| {
        LedgerError::AllocationMismatch {
            allocated: quantities.iter().sum(),
            input: input_quantity,
        }
    })
}
