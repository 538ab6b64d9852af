//! PostgreSQL adapters.

pub mod repositories;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::{MovieError, Result};

pub use repositories::{
    PostgresCatalogRepository, PostgresMembershipTransaction, PostgresMovieStatsRepository,
    PostgresWishlistRepository,
};

/// Open a pool and bring the schema up to date.
pub async fn connect(database_url: &str, config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(database_url)
        .await
        .map_err(|e| MovieError::Internal(format!("Failed to connect to database: {e}")))?;

    crate::MIGRATOR
        .run(&pool)
        .await
        .map_err(|e| MovieError::Internal(format!("Failed to run migrations: {e}")))?;

    info!(max_connections = config.max_connections, "database pool ready");
    Ok(pool)
}

pub(crate) fn to_count(value: i64, column: &str) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| MovieError::Internal(format!("Negative {column} stored: {value}")))
}

pub(crate) fn to_column(value: u64, column: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| MovieError::Internal(format!("{column} overflows BIGINT: {value}")))
}
