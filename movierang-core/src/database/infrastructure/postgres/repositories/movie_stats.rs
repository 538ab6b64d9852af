use async_trait::async_trait;
use movierang_model::{MovieId, StatsAggregate};
use sqlx::{PgExecutor, PgPool};

use crate::database::infrastructure::postgres::{to_column, to_count};
use crate::database::ports::{MovieStatsRepository, VersionedWrite};
use crate::error::{MovieError, Result};

#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    movie_id: i64,
    view_count: i64,
    wishlist_count: i64,
    version: i64,
}

impl StatsRow {
    fn into_aggregate(self) -> Result<StatsAggregate> {
        Ok(StatsAggregate {
            movie_id: MovieId(self.movie_id),
            view_count: to_count(self.view_count, "view_count")?,
            wishlist_count: to_count(self.wishlist_count, "wishlist_count")?,
            version: self.version,
        })
    }
}

/// Counter rows in `movie_stats`. Conflict detection is entirely in the
/// `WHERE version = $n` predicate; no row locks are taken.
#[derive(Debug, Clone)]
pub struct PostgresMovieStatsRepository {
    pool: PgPool,
}

impl PostgresMovieStatsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MovieStatsRepository for PostgresMovieStatsRepository {
    async fn fetch(&self, movie_id: MovieId) -> Result<Option<StatsAggregate>> {
        fetch_stats(self.pool(), movie_id).await
    }

    async fn write_if_version(
        &self,
        next: &StatsAggregate,
        expected_version: Option<i64>,
    ) -> Result<VersionedWrite> {
        write_stats_if_version(self.pool(), next, expected_version).await
    }
}

fn map_write_error(e: sqlx::Error, movie_id: MovieId) -> MovieError {
    if let Some(db_err) = e.as_database_error()
        && db_err.is_foreign_key_violation()
    {
        return MovieError::not_found(format!("movie {movie_id}"));
    }
    MovieError::Internal(format!("Failed to write movie stats: {e}"))
}

/// Shared by the pool-backed repository and toggle transactions.
pub(crate) async fn fetch_stats<'e, E>(
    executor: E,
    movie_id: MovieId,
) -> Result<Option<StatsAggregate>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, StatsRow>(
        r#"
        SELECT movie_id, view_count, wishlist_count, version
        FROM movie_stats
        WHERE movie_id = $1
        "#,
    )
    .bind(movie_id)
    .fetch_optional(executor)
    .await
    .map_err(|e| MovieError::Internal(format!("Failed to load movie stats: {e}")))?;

    row.map(StatsRow::into_aggregate).transpose()
}

pub(crate) async fn write_stats_if_version<'e, E>(
    executor: E,
    next: &StatsAggregate,
    expected_version: Option<i64>,
) -> Result<VersionedWrite>
where
    E: PgExecutor<'e>,
{
    let view_count = to_column(next.view_count, "view_count")?;
    let wishlist_count = to_column(next.wishlist_count, "wishlist_count")?;

    let row = match expected_version {
        None => sqlx::query_as::<_, StatsRow>(
            r#"
            INSERT INTO movie_stats (movie_id, view_count, wishlist_count, version)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (movie_id) DO NOTHING
            RETURNING movie_id, view_count, wishlist_count, version
            "#,
        )
        .bind(next.movie_id)
        .bind(view_count)
        .bind(wishlist_count)
        .bind(next.version)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_write_error(e, next.movie_id))?,

        Some(expected) => sqlx::query_as::<_, StatsRow>(
            r#"
            UPDATE movie_stats
            SET view_count = $2,
                wishlist_count = $3,
                version = $4,
                updated_at = NOW()
            WHERE movie_id = $1 AND version = $5
            RETURNING movie_id, view_count, wishlist_count, version
            "#,
        )
        .bind(next.movie_id)
        .bind(view_count)
        .bind(wishlist_count)
        .bind(next.version)
        .bind(expected)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_write_error(e, next.movie_id))?,
    };

    match row {
        Some(row) => Ok(VersionedWrite::Applied(row.into_aggregate()?)),
        None => Ok(VersionedWrite::StaleVersion),
    }
}
