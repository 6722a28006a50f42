//! Production program service

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::LedgerSettings;
use crate::error::{on_unique_violation, LedgerError, LedgerResult};
use crate::services::allocation::{
    billed_bill_number, check_allocation_total, insert_allocation, lock_program, ProgramGuard,
};
use crate::services::lot::{credit_balance, lock_lot};
use crate::services::numbering::next_in_sequence;
use shared::{
    format_program_number, program_number_scope, validate_output_within_input,
    validate_positive_quantity, ProductionProgram, ProgramStatus,
};

/// Program service for managing production runs
#[derive(Clone)]
pub struct ProgramService {
    db: PgPool,
    settings: LedgerSettings,
}

/// Database row for a production program
#[derive(Debug, sqlx::FromRow)]
struct ProgramRow {
    id: Uuid,
    program_number: String,
    design_ref: Option<String>,
    document_ref: Option<String>,
    input_quantity: Decimal,
    output_quantity: Decimal,
    status: String,
    declared_rate: Option<Decimal>,
    tax_amount: Decimal,
    design_image_name: Option<String>,
    notes: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<ProgramRow> for ProductionProgram {
    fn from(row: ProgramRow) -> Self {
        ProductionProgram {
            id: row.id,
            program_number: row.program_number,
            design_ref: row.design_ref,
            document_ref: row.document_ref,
            input_quantity: row.input_quantity,
            output_quantity: row.output_quantity,
            // The schema constrains status to known values
            status: ProgramStatus::from_str(&row.status).unwrap_or(ProgramStatus::Pending),
            declared_rate: row.declared_rate,
            tax_amount: row.tax_amount,
            design_image_name: row.design_image_name,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
        }
    }
}

/// One requested allocation when creating a program
#[derive(Debug, Deserialize)]
pub struct AllocationInput {
    pub lot_id: Uuid,
    pub quantity: Decimal,
}

/// Input for creating a program
#[derive(Debug, Deserialize)]
pub struct CreateProgramInput {
    pub design_ref: Option<String>,
    /// External document reference; must be globally unique when present
    pub document_ref: Option<String>,
    pub input_quantity: Decimal,
    pub declared_rate: Option<Decimal>,
    pub tax_amount: Option<Decimal>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    /// Initial allocations; may be empty, but when present their sum
    /// must reconcile with the input quantity
    pub allocations: Vec<AllocationInput>,
}

/// A stored design image
#[derive(Debug, Clone)]
pub struct DesignImage {
    pub file_name: Option<String>,
    pub content: Vec<u8>,
}

const PROGRAM_COLUMNS: &str = r#"id, program_number, design_ref, document_ref, input_quantity,
           output_quantity, status, declared_rate, tax_amount, design_image_name, notes,
           created_by, created_at, updated_at, completed_at"#;

impl ProgramService {
    /// Create a new ProgramService instance
    pub fn new(db: PgPool, settings: LedgerSettings) -> Self {
        Self { db, settings }
    }

    /// Create a program, applying any initial allocations in the same
    /// transaction.
    pub async fn create_program(&self, input: CreateProgramInput) -> LedgerResult<ProductionProgram> {
        validate_positive_quantity(input.input_quantity)
            .map_err(|msg| LedgerError::validation("input_quantity", msg))?;

        if let Some(rate) = input.declared_rate {
            if rate < Decimal::ZERO {
                return Err(LedgerError::validation(
                    "declared_rate",
                    "Declared rate cannot be negative",
                ));
            }
        }

        let tax_amount = input.tax_amount.unwrap_or(Decimal::ZERO);
        if tax_amount < Decimal::ZERO {
            return Err(LedgerError::validation(
                "tax_amount",
                "Tax amount cannot be negative",
            ));
        }

        let quantities: Vec<Decimal> = input.allocations.iter().map(|a| a.quantity).collect();
        for quantity in &quantities {
            validate_positive_quantity(*quantity)
                .map_err(|msg| LedgerError::validation("allocations", msg))?;
        }
        check_allocation_total(&quantities, input.input_quantity)?;

        let mut tx = self.db.begin().await?;

        let year = Utc::now().year();
        let sequence = next_in_sequence(&mut tx, &program_number_scope(year)).await?;
        let program_number = format_program_number(year, sequence);

        let row = sqlx::query_as::<_, ProgramRow>(&format!(
            r#"
            INSERT INTO production_programs (
                program_number, design_ref, document_ref, input_quantity,
                declared_rate, tax_amount, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            PROGRAM_COLUMNS
        ))
        .bind(&program_number)
        .bind(&input.design_ref)
        .bind(&input.document_ref)
        .bind(input.input_quantity)
        .bind(input.declared_rate)
        .bind(tax_amount)
        .bind(&input.notes)
        .bind(input.created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| on_unique_violation(e, "document reference"))?;

        let guard = ProgramGuard {
            id: row.id,
            program_number: row.program_number.clone(),
            status: row.status.clone(),
            input_quantity: row.input_quantity,
        };
        for allocation in &input.allocations {
            insert_allocation(&mut tx, &guard, allocation.lot_id, allocation.quantity).await?;
        }

        tx.commit().await?;

        tracing::info!("created program {}", row.program_number);

        Ok(row.into())
    }

    /// Record a program's output quantity; wastage follows as the
    /// difference from input.
    pub async fn set_program_output(
        &self,
        program_id: Uuid,
        output_quantity: Decimal,
    ) -> LedgerResult<ProductionProgram> {
        let mut tx = self.db.begin().await?;

        let program = lock_program(&mut tx, program_id).await?;

        if let Some(bill_number) = billed_bill_number(&mut tx, program_id).await? {
            return Err(LedgerError::AlreadyBilled {
                program_number: program.program_number,
                bill_number,
            });
        }

        validate_output_within_input(program.input_quantity, output_quantity)
            .map_err(|msg| LedgerError::validation("output_quantity", msg))?;

        let row = sqlx::query_as::<_, ProgramRow>(&format!(
            r#"
            UPDATE production_programs
            SET output_quantity = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROGRAM_COLUMNS
        ))
        .bind(program_id)
        .bind(output_quantity)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    /// Attach a design image to a pending program. The bytes are stored
    /// verbatim; any compression happens before they reach the engine.
    pub async fn attach_design_image(
        &self,
        program_id: Uuid,
        file_name: &str,
        content: Vec<u8>,
    ) -> LedgerResult<()> {
        let mut tx = self.db.begin().await?;

        let program = lock_program(&mut tx, program_id).await?;

        if program.is_completed() {
            return Err(LedgerError::Conflict {
                resource: "program".to_string(),
                message: format!(
                    "Cannot attach a design image to completed program {}",
                    program.program_number
                ),
            });
        }
        if let Some(bill_number) = billed_bill_number(&mut tx, program_id).await? {
            return Err(LedgerError::AlreadyBilled {
                program_number: program.program_number,
                bill_number,
            });
        }

        sqlx::query(
            r#"
            UPDATE production_programs
            SET design_image = $2, design_image_name = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(program_id)
        .bind(&content)
        .bind(file_name)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Fetch a program's stored design image, if any
    pub async fn get_design_image(&self, program_id: Uuid) -> LedgerResult<Option<DesignImage>> {
        let row = sqlx::query_as::<_, (Option<String>, Option<Vec<u8>>)>(
            "SELECT design_image_name, design_image FROM production_programs WHERE id = $1",
        )
        .bind(program_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| LedgerError::NotFound("Program".to_string()))?;

        Ok(row.1.map(|content| DesignImage {
            file_name: row.0,
            content,
        }))
    }

    /// Mark a program Completed.
    ///
    /// Requires its allocations to reconcile with the declared input.
    /// The transition is irreversible; there is no path back to Pending.
    pub async fn complete_program(&self, program_id: Uuid) -> LedgerResult<ProductionProgram> {
        let mut tx = self.db.begin().await?;

        let program = lock_program(&mut tx, program_id).await?;

        if program.is_completed() {
            return Err(LedgerError::Conflict {
                resource: "program".to_string(),
                message: format!("Program {} is already completed", program.program_number),
            });
        }

        let quantities = sqlx::query_scalar::<_, Decimal>(
            "SELECT quantity FROM lot_allocations WHERE program_id = $1",
        )
        .bind(program_id)
        .fetch_all(&mut *tx)
        .await?;
        check_allocation_total(&quantities, program.input_quantity)?;

        let row = sqlx::query_as::<_, ProgramRow>(&format!(
            r#"
            UPDATE production_programs
            SET status = 'completed', completed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PROGRAM_COLUMNS
        ))
        .bind(program_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!("program {} completed", row.program_number);

        Ok(row.into())
    }

    /// Delete a pending program, crediting its allocations back to their
    /// lots in the same transaction. Completed programs cannot be
    /// deleted.
    pub async fn delete_program(&self, program_id: Uuid) -> LedgerResult<()> {
        let mut tx = self.db.begin().await?;

        let program = lock_program(&mut tx, program_id).await?;

        if program.is_completed() {
            return Err(LedgerError::Conflict {
                resource: "program".to_string(),
                message: format!(
                    "Completed program {} cannot be deleted",
                    program.program_number
                ),
            });
        }

        let allocations = sqlx::query_as::<_, (Uuid, Decimal)>(
            "SELECT lot_id, quantity FROM lot_allocations WHERE program_id = $1",
        )
        .bind(program_id)
        .fetch_all(&mut *tx)
        .await?;

        for (lot_id, quantity) in allocations {
            let lot = lock_lot(&mut tx, lot_id).await?;
            credit_balance(&mut tx, lot.id, quantity).await?;
        }

        sqlx::query("DELETE FROM lot_allocations WHERE program_id = $1")
            .bind(program_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM production_programs WHERE id = $1")
            .bind(program_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Whether the program sits on a live (non-Scrap) bill
    pub async fn is_billed(&self, program_id: Uuid) -> LedgerResult<bool> {
        Ok(self.billed_bill_number(program_id).await?.is_some())
    }

    /// Number of the live bill holding this program, if any
    pub async fn billed_bill_number(&self, program_id: Uuid) -> LedgerResult<Option<String>> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM production_programs WHERE id = $1)",
        )
        .bind(program_id)
        .fetch_one(&self.db)
        .await?;
        if !exists {
            return Err(LedgerError::NotFound("Program".to_string()));
        }

        let mut conn = self.db.acquire().await?;
        billed_bill_number(&mut conn, program_id).await
    }

    /// Get a program by ID
    pub async fn get_program(&self, program_id: Uuid) -> LedgerResult<ProductionProgram> {
        let row = sqlx::query_as::<_, ProgramRow>(&format!(
            "SELECT {} FROM production_programs WHERE id = $1",
            PROGRAM_COLUMNS
        ))
        .bind(program_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| LedgerError::NotFound("Program".to_string()))?;

        Ok(row.into())
    }

    /// List programs, optionally filtered by status
    pub async fn list_programs(
        &self,
        status: Option<ProgramStatus>,
    ) -> LedgerResult<Vec<ProductionProgram>> {
        let rows = sqlx::query_as::<_, ProgramRow>(&format!(
            r#"
            SELECT {}
            FROM production_programs
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY program_number DESC
            "#,
            PROGRAM_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Programs whose wastage exceeds the configured threshold
    pub async fn list_high_wastage(&self) -> LedgerResult<Vec<ProductionProgram>> {
        let rows = sqlx::query_as::<_, ProgramRow>(&format!(
            r#"
            SELECT {}
            FROM production_programs
            WHERE input_quantity > 0
              AND ((input_quantity - output_quantity) / input_quantity) * 100 > $1
            ORDER BY program_number DESC
            "#,
            PROGRAM_COLUMNS
        ))
        .bind(self.settings.wastage_threshold_percent)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The configured wastage threshold in percent
    pub fn wastage_threshold_percent(&self) -> Decimal {
        self.settings.wastage_threshold_percent
    }
}
