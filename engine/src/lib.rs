//! Textile Processing Ledger - Inventory Allocation & Billing Engine
//!
//! Tracks inward material lots, their allocation to production programs,
//! and the bills raised for completed work. The engine owns the running
//! lot balances, rate resolution, bill totals and the payment-status
//! state machine; HTTP routing, authentication and document rendering
//! live in the calling layers.

pub mod config;
pub mod error;
pub mod render;
pub mod services;

pub use config::{Config, LedgerSettings};
pub use error::{LedgerError, LedgerResult};

/// Apply the engine's schema migrations.
///
/// The caller owns process bootstrap; this is typically run once at
/// startup or from a deployment job.
pub async fn run_migrations(db: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(db).await
}
