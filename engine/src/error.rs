//! Error handling for the Textile Processing Ledger engine
//!
//! Domain errors are surfaced synchronously to the caller and carry the
//! identifiers needed to act on them (lot numbers, bill numbers,
//! quantities). Store failures propagate separately as `Database` errors
//! and are never retried by the engine itself.

use rust_decimal::Decimal;
use thiserror::Error;

/// Engine error types
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Input fails a precondition that protects an invariant
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// A debit would take the lot balance below zero; recoverable by
    /// choosing a smaller quantity or a different lot
    #[error(
        "Insufficient balance in lot {lot_number}: available {available}, requested {requested}"
    )]
    InsufficientBalance {
        lot_number: String,
        available: Decimal,
        requested: Decimal,
    },

    /// Allocated quantities do not reconcile with the program's input
    #[error("Total allocated quantity ({allocated}) must equal input quantity ({input})")]
    AllocationMismatch { allocated: Decimal, input: Decimal },

    /// Mixing tax-registered and unregistered lots in one program or bill
    #[error("Tax registration mismatch: {0}")]
    TaxRegistrationMismatch(String),

    /// Illegal payment-status change; fatal to the request
    #[error("Cannot transition bill from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// The program sits on a live bill; scrap that bill first
    #[error("Program {program_number} is already included in bill {bill_number}")]
    AlreadyBilled {
        program_number: String,
        bill_number: String,
    },

    #[error("Conflict on {resource}: {message}")]
    Conflict { resource: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl LedgerError {
    /// Stable machine-readable code for callers mapping errors onto an
    /// API surface
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::Validation { .. } => "VALIDATION_ERROR",
            LedgerError::NotFound(_) => "NOT_FOUND",
            LedgerError::DuplicateEntry(_) => "DUPLICATE_ENTRY",
            LedgerError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            LedgerError::AllocationMismatch { .. } => "ALLOCATION_MISMATCH",
            LedgerError::TaxRegistrationMismatch(_) => "TAX_REGISTRATION_MISMATCH",
            LedgerError::InvalidTransition { .. } => "INVALID_TRANSITION",
            LedgerError::AlreadyBilled { .. } => "ALREADY_BILLED",
            LedgerError::Conflict { .. } => "CONFLICT",
            LedgerError::Configuration(_) => "CONFIGURATION_ERROR",
            LedgerError::Database(_) => "DATABASE_ERROR",
            LedgerError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        LedgerError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Map a unique-constraint violation onto a `DuplicateEntry` for the
/// given field, passing other database errors through unchanged.
pub(crate) fn on_unique_violation(err: sqlx::Error, field: &str) -> LedgerError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return LedgerError::DuplicateEntry(field.to_string());
        }
    }
    LedgerError::Database(err)
}

/// Result type alias for engine operations
pub type LedgerResult<T> = Result<T, LedgerError>;
