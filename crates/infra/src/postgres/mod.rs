//! Postgres-backed adapters for the routing seams.
//!
//! The routing engine is synchronous; each adapter keeps the handle of the
//! tokio runtime it was built on and drives its async queries with
//! `Handle::block_on`. Callers therefore must not invoke them from an async
//! task directly: the HTTP layer goes through `spawn_blocking` and the expiry
//! sweeper runs on its own OS thread.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | Mapped to |
//! |------------|----------------------|-----------|
//! | Database (unique violation) | `23505` | `StoreError::Duplicate` on insert, backend otherwise |
//! | Database (check violation) | `23514` | backend (a stock invariant was about to break) |
//! | PoolClosed | N/A | backend |
//! | Other | N/A | backend |

pub mod inventory;
pub mod orders;
pub mod schema;
pub mod sellers;

use anyhow::Context;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use inventory::PostgresInventoryLedger;
pub use orders::PostgresOrderStore;
pub use schema::ensure_schema;
pub use sellers::PostgresSellerDirectory;

/// Open a pool and make sure the routing tables exist.
pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")?;
    ensure_schema(&pool).await?;
    Ok(pool)
}

/// Human-readable description of a SQLx failure for `operation`.
pub(crate) fn describe_sqlx_error(operation: &str, err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) => format!("database error in {operation} ({code}): {}", db_err.message()),
            None => format!("database error in {operation}: {}", db_err.message()),
        },
        sqlx::Error::PoolClosed => format!("connection pool closed in {operation}"),
        sqlx::Error::RowNotFound => format!("unexpected row not found in {operation}"),
        other => format!("sqlx error in {operation}: {other}"),
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

/// Stock counters are stored as BIGINT; anything outside `u32` is clamped.
pub(crate) fn to_u32(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}
