//! Per-scope sequence numbers for human-readable identifiers
//!
//! Lot, program and bill numbers are sequential within a year scope
//! (e.g. "LOT-2025"). The counter row is upserted atomically, so
//! concurrent creators within the same scope cannot draw the same
//! number; the call must run inside the creating transaction so an
//! aborted insert rolls the counter back with it.

use sqlx::PgConnection;

use crate::error::LedgerResult;

/// Claim the next number in the given scope
pub(crate) async fn next_in_sequence(conn: &mut PgConnection, scope: &str) -> LedgerResult<i64> {
    let next = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO number_sequences (scope, last_value)
        VALUES ($1, 1)
        ON CONFLICT (scope) DO UPDATE SET last_value = number_sequences.last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(scope)
    .fetch_one(conn)
    .await?;

    Ok(next)
}
