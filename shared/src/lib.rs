//! Shared types and models for the Textile Processing Ledger
//!
//! This crate contains the pure domain layer: entity models, derived-value
//! calculations, validation rules and notification message composition,
//! shared between the ledger engine and its callers.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
