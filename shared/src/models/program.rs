//! Production program and lot allocation models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a production program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramStatus {
    Pending,
    Completed,
}

impl ProgramStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramStatus::Pending => "pending",
            ProgramStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ProgramStatus::Pending),
            "completed" => Some(ProgramStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProgramStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgramStatus::Pending => write!(f, "Pending"),
            ProgramStatus::Completed => write!(f, "Completed"),
        }
    }
}

/// A production run converting allocated input quantity into output
/// quantity, with wastage as the difference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionProgram {
    pub id: Uuid,
    /// Human-readable number, unique and sequential per calendar year
    /// (e.g. "PRG-2026-0001")
    pub program_number: String,
    pub design_ref: Option<String>,
    /// External document reference; globally unique when present
    pub document_ref: Option<String>,
    pub input_quantity: Decimal,
    pub output_quantity: Decimal,
    pub status: ProgramStatus,
    /// Operator-declared rate; overrides rate resolution when non-zero
    pub declared_rate: Option<Decimal>,
    pub tax_amount: Decimal,
    pub design_image_name: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProductionProgram {
    /// Wastage is always derived as input minus output, never stored
    /// independently.
    pub fn wastage(&self) -> Decimal {
        self.input_quantity - self.output_quantity
    }

    /// Wastage as a percentage of input (zero when input is zero)
    pub fn wastage_percentage(&self) -> Decimal {
        wastage_percentage(self.input_quantity, self.output_quantity)
    }

    /// Amount chargeable for this program at the given rate
    pub fn total_amount(&self, rate: Decimal) -> Decimal {
        self.output_quantity * rate + self.tax_amount
    }

    pub fn is_high_wastage(&self, threshold_percent: Decimal) -> bool {
        self.wastage_percentage() > threshold_percent
    }
}

/// Wastage as a percentage of input quantity
pub fn wastage_percentage(input_quantity: Decimal, output_quantity: Decimal) -> Decimal {
    if input_quantity > Decimal::ZERO {
        ((input_quantity - output_quantity) / input_quantity) * Decimal::from(100)
    } else {
        Decimal::ZERO
    }
}

/// The claim a production program places on a specific lot's balance.
///
/// One allocation exists per (program, lot) pair. Creating it debits the
/// lot, deleting it credits the quantity back; both writes happen in the
/// same transaction as the allocation row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotAllocation {
    pub id: Uuid,
    pub program_id: Uuid,
    pub lot_id: Uuid,
    pub quantity: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sequence scope key for program numbers within one calendar year
pub fn program_number_scope(year: i32) -> String {
    format!("PRG-{}", year)
}

/// Format a program number (e.g. "PRG-2026-0001")
pub fn format_program_number(year: i32, sequence: i64) -> String {
    format!("{}-{:04}", program_number_scope(year), sequence)
}
