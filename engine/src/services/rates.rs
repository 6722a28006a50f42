//! Rate resolution service
//!
//! Resolves the price per unit for a (customer, grade) pair through the
//! layered override scheme: customer-specific override, then the grade's
//! default rate, then zero. Resolution never fails; missing data
//! degrades to a zero rate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use shared::{resolve_rate_with_source, RateOverride, RateSource};

/// Rate service for managing overrides and resolving effective rates
#[derive(Clone)]
pub struct RateService {
    db: PgPool,
}

/// Database row for a rate override
#[derive(Debug, sqlx::FromRow)]
struct RateOverrideRow {
    id: Uuid,
    customer_id: Uuid,
    grade_id: Uuid,
    rate: Decimal,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RateOverrideRow> for RateOverride {
    fn from(row: RateOverrideRow) -> Self {
        RateOverride {
            id: row.id,
            customer_id: row.customer_id,
            grade_id: row.grade_id,
            rate: row.rate,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl RateService {
    /// Create a new RateService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create or replace the override for a (customer, grade) pair.
    ///
    /// At most one override exists per pair; setting it again replaces
    /// the rate.
    pub async fn set_override(
        &self,
        customer_id: Uuid,
        grade_id: Uuid,
        rate: Decimal,
        notes: Option<String>,
    ) -> LedgerResult<RateOverride> {
        if rate <= Decimal::ZERO {
            return Err(LedgerError::validation(
                "rate",
                "Rate must be greater than zero",
            ));
        }

        let customer_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)")
                .bind(customer_id)
                .fetch_one(&self.db)
                .await?;
        if !customer_exists {
            return Err(LedgerError::NotFound("Customer".to_string()));
        }

        let grade_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM material_grades WHERE id = $1)",
        )
        .bind(grade_id)
        .fetch_one(&self.db)
        .await?;
        if !grade_exists {
            return Err(LedgerError::NotFound("Grade".to_string()));
        }

        let row = sqlx::query_as::<_, RateOverrideRow>(
            r#"
            INSERT INTO rate_overrides (customer_id, grade_id, rate, notes)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (customer_id, grade_id)
            DO UPDATE SET rate = EXCLUDED.rate, notes = EXCLUDED.notes, updated_at = NOW()
            RETURNING id, customer_id, grade_id, rate, notes, created_at, updated_at
            "#,
        )
        .bind(customer_id)
        .bind(grade_id)
        .bind(rate)
        .bind(&notes)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Remove the override for a (customer, grade) pair
    pub async fn remove_override(&self, customer_id: Uuid, grade_id: Uuid) -> LedgerResult<()> {
        let result =
            sqlx::query("DELETE FROM rate_overrides WHERE customer_id = $1 AND grade_id = $2")
                .bind(customer_id)
                .bind(grade_id)
                .execute(&self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound("Rate override".to_string()));
        }

        Ok(())
    }

    /// Get the override for a (customer, grade) pair, if one exists
    pub async fn get_override(
        &self,
        customer_id: Uuid,
        grade_id: Uuid,
    ) -> LedgerResult<Option<RateOverride>> {
        let row = sqlx::query_as::<_, RateOverrideRow>(
            r#"
            SELECT id, customer_id, grade_id, rate, notes, created_at, updated_at
            FROM rate_overrides
            WHERE customer_id = $1 AND grade_id = $2
            "#,
        )
        .bind(customer_id)
        .bind(grade_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    /// List overrides for a customer
    pub async fn list_overrides(&self, customer_id: Uuid) -> LedgerResult<Vec<RateOverride>> {
        let rows = sqlx::query_as::<_, RateOverrideRow>(
            r#"
            SELECT id, customer_id, grade_id, rate, notes, created_at, updated_at
            FROM rate_overrides
            WHERE customer_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Resolve the rate for a (customer, grade) pair
    pub async fn resolve(&self, customer_id: Uuid, grade_id: Uuid) -> LedgerResult<Decimal> {
        let (rate, _) = self.resolve_with_source(customer_id, grade_id).await?;
        Ok(rate)
    }

    /// Resolve the rate for a (customer, grade) pair, reporting which
    /// layer supplied it
    pub async fn resolve_with_source(
        &self,
        customer_id: Uuid,
        grade_id: Uuid,
    ) -> LedgerResult<(Decimal, RateSource)> {
        let mut conn = self.db.acquire().await?;
        resolve_on(&mut conn, customer_id, grade_id).await
    }

    /// Effective rate for a program: the program's own declared rate when
    /// non-zero, otherwise the resolved rate for the (customer, grade) of
    /// its first allocation's lot, otherwise zero.
    pub async fn effective_rate(&self, program_id: Uuid) -> LedgerResult<Decimal> {
        let declared = sqlx::query_scalar::<_, Option<Decimal>>(
            "SELECT declared_rate FROM production_programs WHERE id = $1",
        )
        .bind(program_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| LedgerError::NotFound("Program".to_string()))?;

        if let Some(rate) = declared {
            if rate > Decimal::ZERO {
                return Ok(rate);
            }
        }

        let first_lot = sqlx::query_as::<_, (Uuid, Uuid)>(
            r#"
            SELECT l.customer_id, l.grade_id
            FROM lot_allocations a
            JOIN material_lots l ON l.id = a.lot_id
            WHERE a.program_id = $1
            ORDER BY a.created_at, a.id
            LIMIT 1
            "#,
        )
        .bind(program_id)
        .fetch_optional(&self.db)
        .await?;

        match first_lot {
            Some((customer_id, grade_id)) => self.resolve(customer_id, grade_id).await,
            None => Ok(Decimal::ZERO),
        }
    }
}

/// Resolve a (customer, grade) rate on an existing connection; used by
/// the billing service inside its totals transaction.
pub(crate) async fn resolve_on(
    conn: &mut PgConnection,
    customer_id: Uuid,
    grade_id: Uuid,
) -> LedgerResult<(Decimal, RateSource)> {
    let override_rate = sqlx::query_scalar::<_, Decimal>(
        "SELECT rate FROM rate_overrides WHERE customer_id = $1 AND grade_id = $2",
    )
    .bind(customer_id)
    .bind(grade_id)
    .fetch_optional(&mut *conn)
    .await?;

    let default_rate = sqlx::query_scalar::<_, Decimal>(
        "SELECT default_rate FROM material_grades WHERE id = $1",
    )
    .bind(grade_id)
    .fetch_optional(&mut *conn)
    .await?
    .unwrap_or(Decimal::ZERO);

    Ok(resolve_rate_with_source(override_rate, default_rate))
}
