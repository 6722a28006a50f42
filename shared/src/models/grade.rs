//! Material grades and rate overrides

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A material grade with its default price per unit.
///
/// Grades are soft-disabled once referenced by lots; they are never
/// hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialGrade {
    pub id: Uuid,
    pub name: String,
    pub default_rate: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A customer-specific rate for one material grade.
///
/// At most one override exists per (customer, grade) pair; it supersedes
/// the grade's default rate during resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateOverride {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub grade_id: Uuid,
    pub rate: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where a resolved rate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    CustomerSpecific,
    GradeDefault,
    Fallback,
}

/// Resolve the effective rate for a (customer, grade) pair.
///
/// Priority: the customer-specific override if one exists, then the
/// grade's default rate when non-zero, then zero. Absence of data
/// degrades to zero rather than failing.
pub fn resolve_rate(override_rate: Option<Decimal>, default_rate: Decimal) -> Decimal {
    resolve_rate_with_source(override_rate, default_rate).0
}

/// Same as [`resolve_rate`], also reporting which layer supplied the rate
pub fn resolve_rate_with_source(
    override_rate: Option<Decimal>,
    default_rate: Decimal,
) -> (Decimal, RateSource) {
    if let Some(rate) = override_rate {
        return (rate, RateSource::CustomerSpecific);
    }
    if default_rate > Decimal::ZERO {
        return (default_rate, RateSource::GradeDefault);
    }
    (Decimal::ZERO, RateSource::Fallback)
}

/// Pick the rate to charge a program: an explicit non-zero declared rate
/// always wins over the resolved (customer, grade) rate.
pub fn effective_rate(declared_rate: Option<Decimal>, resolved_rate: Decimal) -> Decimal {
    match declared_rate {
        Some(rate) if rate > Decimal::ZERO => rate,
        _ => resolved_rate,
    }
}
