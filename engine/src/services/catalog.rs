//! Catalog service for customers and material grades

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{on_unique_violation, LedgerError, LedgerResult};
use shared::{Customer, MaterialGrade};

/// Catalog service for managing customers and grades
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

/// Database row for a customer
#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: Uuid,
    name: String,
    contact: Option<String>,
    address: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            name: row.name,
            contact: row.contact,
            address: row.address,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Database row for a material grade
#[derive(Debug, sqlx::FromRow)]
struct GradeRow {
    id: Uuid,
    name: String,
    default_rate: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<GradeRow> for MaterialGrade {
    fn from(row: GradeRow) -> Self {
        MaterialGrade {
            id: row.id,
            name: row.name,
            default_rate: row.default_rate,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for creating a customer
#[derive(Debug, Deserialize)]
pub struct CreateCustomerInput {
    pub name: String,
    pub contact: Option<String>,
    pub address: Option<String>,
}

/// Input for updating a customer
#[derive(Debug, Deserialize)]
pub struct UpdateCustomerInput {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
}

/// Input for creating a material grade
#[derive(Debug, Deserialize)]
pub struct CreateGradeInput {
    pub name: String,
    pub default_rate: Decimal,
}

impl CatalogService {
    /// Create a new CatalogService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a customer
    pub async fn create_customer(&self, input: CreateCustomerInput) -> LedgerResult<Customer> {
        if input.name.trim().is_empty() {
            return Err(LedgerError::validation("name", "Customer name is required"));
        }

        let row = sqlx::query_as::<_, CustomerRow>(
            r#"
            INSERT INTO customers (name, contact, address)
            VALUES ($1, $2, $3)
            RETURNING id, name, contact, address, is_active, created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.contact)
        .bind(&input.address)
        .fetch_one(&self.db)
        .await
        .map_err(|e| on_unique_violation(e, "customer name"))?;

        Ok(row.into())
    }

    /// Update a customer's details
    pub async fn update_customer(
        &self,
        customer_id: Uuid,
        input: UpdateCustomerInput,
    ) -> LedgerResult<Customer> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r#"
            UPDATE customers
            SET name = COALESCE($2, name),
                contact = COALESCE($3, contact),
                address = COALESCE($4, address),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, contact, address, is_active, created_at, updated_at
            "#,
        )
        .bind(customer_id)
        .bind(&input.name)
        .bind(&input.contact)
        .bind(&input.address)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| on_unique_violation(e, "customer name"))?
        .ok_or_else(|| LedgerError::NotFound("Customer".to_string()))?;

        Ok(row.into())
    }

    /// Soft-deactivate a customer; lots and bills keep referencing it
    pub async fn deactivate_customer(&self, customer_id: Uuid) -> LedgerResult<()> {
        let result =
            sqlx::query("UPDATE customers SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(customer_id)
                .execute(&self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound("Customer".to_string()));
        }

        Ok(())
    }

    /// Get a customer by ID
    pub async fn get_customer(&self, customer_id: Uuid) -> LedgerResult<Customer> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r#"
            SELECT id, name, contact, address, is_active, created_at, updated_at
            FROM customers
            WHERE id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| LedgerError::NotFound("Customer".to_string()))?;

        Ok(row.into())
    }

    /// List customers, optionally restricted to active ones
    pub async fn list_customers(&self, active_only: bool) -> LedgerResult<Vec<Customer>> {
        let rows = if active_only {
            sqlx::query_as::<_, CustomerRow>(
                r#"
                SELECT id, name, contact, address, is_active, created_at, updated_at
                FROM customers
                WHERE is_active = TRUE
                ORDER BY name
                "#,
            )
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query_as::<_, CustomerRow>(
                r#"
                SELECT id, name, contact, address, is_active, created_at, updated_at
                FROM customers
                ORDER BY name
                "#,
            )
            .fetch_all(&self.db)
            .await?
        };

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Create a material grade with its default rate
    pub async fn create_grade(&self, input: CreateGradeInput) -> LedgerResult<MaterialGrade> {
        if input.name.trim().is_empty() {
            return Err(LedgerError::validation("name", "Grade name is required"));
        }
        if input.default_rate < Decimal::ZERO {
            return Err(LedgerError::validation(
                "default_rate",
                "Default rate cannot be negative",
            ));
        }

        let row = sqlx::query_as::<_, GradeRow>(
            r#"
            INSERT INTO material_grades (name, default_rate)
            VALUES ($1, $2)
            RETURNING id, name, default_rate, is_active, created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(input.default_rate)
        .fetch_one(&self.db)
        .await
        .map_err(|e| on_unique_violation(e, "grade name"))?;

        Ok(row.into())
    }

    /// Change a grade's default rate
    pub async fn set_grade_default_rate(
        &self,
        grade_id: Uuid,
        default_rate: Decimal,
    ) -> LedgerResult<MaterialGrade> {
        if default_rate < Decimal::ZERO {
            return Err(LedgerError::validation(
                "default_rate",
                "Default rate cannot be negative",
            ));
        }

        let row = sqlx::query_as::<_, GradeRow>(
            r#"
            UPDATE material_grades
            SET default_rate = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, default_rate, is_active, created_at, updated_at
            "#,
        )
        .bind(grade_id)
        .bind(default_rate)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| LedgerError::NotFound("Grade".to_string()))?;

        Ok(row.into())
    }

    /// Soft-disable a grade; referencing lots are unaffected
    pub async fn disable_grade(&self, grade_id: Uuid) -> LedgerResult<()> {
        let result = sqlx::query(
            "UPDATE material_grades SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(grade_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound("Grade".to_string()));
        }

        Ok(())
    }

    /// Get a grade by ID
    pub async fn get_grade(&self, grade_id: Uuid) -> LedgerResult<MaterialGrade> {
        let row = sqlx::query_as::<_, GradeRow>(
            r#"
            SELECT id, name, default_rate, is_active, created_at, updated_at
            FROM material_grades
            WHERE id = $1
            "#,
        )
        .bind(grade_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| LedgerError::NotFound("Grade".to_string()))?;

        Ok(row.into())
    }

    /// List grades, optionally restricted to active ones
    pub async fn list_grades(&self, active_only: bool) -> LedgerResult<Vec<MaterialGrade>> {
        let rows = if active_only {
            sqlx::query_as::<_, GradeRow>(
                r#"
                SELECT id, name, default_rate, is_active, created_at, updated_at
                FROM material_grades
                WHERE is_active = TRUE
                ORDER BY name
                "#,
            )
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query_as::<_, GradeRow>(
                r#"
                SELECT id, name, default_rate, is_active, created_at, updated_at
                FROM material_grades
                ORDER BY name
                "#,
            )
            .fetch_all(&self.db)
            .await?
        };

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
