use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use movierang_model::{MovieId, StatsAggregate, UserId, WishlistEntry};
use sqlx::{PgPool, PgTransaction};
use tokio::sync::Mutex;

use super::movie_stats::{fetch_stats, write_stats_if_version};
use crate::database::ports::{
    MembershipInsert, MembershipTransaction, MovieStatsRepository, VersionedWrite,
    WishlistRepository, WishlistUnitOfWork,
};
use crate::error::{MovieError, Result};

const UNIQUE_USER_MOVIE: &str = "uk_wishlist_user_movie";
const FK_USER: &str = "fk_wishlist_user";

#[derive(Debug, sqlx::FromRow)]
struct WishlistRow {
    id: i64,
    user_id: i64,
    movie_id: i64,
    created_at: DateTime<Utc>,
}

impl From<WishlistRow> for WishlistEntry {
    fn from(row: WishlistRow) -> Self {
        WishlistEntry {
            id: row.id,
            user_id: UserId(row.user_id),
            movie_id: MovieId(row.movie_id),
            created_at: row.created_at,
        }
    }
}

fn map_insert_error(
    e: sqlx::Error,
    user_id: UserId,
    movie_id: MovieId,
) -> Result<MembershipInsert> {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() && db_err.constraint() == Some(UNIQUE_USER_MOVIE) {
            return Ok(MembershipInsert::UniquenessConflict);
        }
        if db_err.is_foreign_key_violation() {
            return Err(if db_err.constraint() == Some(FK_USER) {
                MovieError::not_found(format!("user {user_id}"))
            } else {
                MovieError::not_found(format!("movie {movie_id}"))
            });
        }
    }
    Err(MovieError::Internal(format!("Failed to insert wishlist entry: {e}")))
}

#[derive(Debug, Clone)]
pub struct PostgresWishlistRepository {
    pool: PgPool,
}

impl PostgresWishlistRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl WishlistRepository for PostgresWishlistRepository {
    async fn exists(&self, user_id: UserId, movie_id: MovieId) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM wishlist WHERE user_id = $1 AND movie_id = $2)",
        )
        .bind(user_id)
        .bind(movie_id)
        .fetch_one(self.pool())
        .await
        .map_err(|e| MovieError::Internal(format!("Failed to check wishlist: {e}")))
    }

    async fn insert(&self, user_id: UserId, movie_id: MovieId) -> Result<MembershipInsert> {
        let result = sqlx::query_as::<_, WishlistRow>(
            r#"
            INSERT INTO wishlist (user_id, movie_id)
            VALUES ($1, $2)
            RETURNING id, user_id, movie_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(movie_id)
        .fetch_one(self.pool())
        .await;

        match result {
            Ok(row) => Ok(MembershipInsert::Inserted(row.into())),
            Err(e) => map_insert_error(e, user_id, movie_id),
        }
    }

    async fn delete(&self, user_id: UserId, movie_id: MovieId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM wishlist WHERE user_id = $1 AND movie_id = $2")
            .bind(user_id)
            .bind(movie_id)
            .execute(self.pool())
            .await
            .map_err(|e| MovieError::Internal(format!("Failed to delete wishlist entry: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<WishlistEntry>> {
        let rows = sqlx::query_as::<_, WishlistRow>(
            r#"
            SELECT id, user_id, movie_id, created_at
            FROM wishlist
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(|e| MovieError::Internal(format!("Failed to list wishlist: {e}")))?;

        Ok(rows.into_iter().map(WishlistEntry::from).collect())
    }
}

#[async_trait]
impl WishlistUnitOfWork for PostgresWishlistRepository {
    type Transaction = PostgresMembershipTransaction;

    /// Opens a transaction and takes a transaction-scoped advisory lock on
    /// the pair, released by commit or rollback.
    async fn begin(&self, user_id: UserId, movie_id: MovieId) -> Result<Self::Transaction> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| MovieError::Internal(format!("Failed to start transaction: {e}")))?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("wishlist:{user_id}:{movie_id}"))
            .execute(&mut *tx)
            .await
            .map_err(|e| MovieError::Internal(format!("Failed to lock wishlist pair: {e}")))?;

        Ok(PostgresMembershipTransaction {
            tx: Mutex::new(Some(tx)),
            user_id,
            movie_id,
        })
    }
}

/// Toggle unit of work over one database transaction. Dropping it unfinished
/// lets sqlx roll the transaction back.
pub struct PostgresMembershipTransaction {
    tx: Mutex<Option<PgTransaction<'static>>>,
    user_id: UserId,
    movie_id: MovieId,
}

impl fmt::Debug for PostgresMembershipTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresMembershipTransaction")
            .field("user_id", &self.user_id)
            .field("movie_id", &self.movie_id)
            .finish_non_exhaustive()
    }
}

fn open<'a>(slot: &'a mut Option<PgTransaction<'static>>) -> Result<&'a mut PgTransaction<'static>> {
    slot.as_mut()
        .ok_or_else(|| MovieError::Internal("transaction already finished".into()))
}

impl PostgresMembershipTransaction {
    async fn take(&self) -> Result<PgTransaction<'static>> {
        self.tx
            .lock()
            .await
            .take()
            .ok_or_else(|| MovieError::Internal("transaction already finished".into()))
    }
}

#[async_trait]
impl MovieStatsRepository for PostgresMembershipTransaction {
    async fn fetch(&self, movie_id: MovieId) -> Result<Option<StatsAggregate>> {
        let mut slot = self.tx.lock().await;
        let tx = open(&mut slot)?;
        fetch_stats(&mut **tx, movie_id).await
    }

    async fn write_if_version(
        &self,
        next: &StatsAggregate,
        expected_version: Option<i64>,
    ) -> Result<VersionedWrite> {
        let mut slot = self.tx.lock().await;
        let tx = open(&mut slot)?;
        write_stats_if_version(&mut **tx, next, expected_version).await
    }
}

#[async_trait]
impl MembershipTransaction for PostgresMembershipTransaction {
    async fn exists(&self) -> Result<bool> {
        let mut slot = self.tx.lock().await;
        let tx = open(&mut slot)?;
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM wishlist WHERE user_id = $1 AND movie_id = $2)",
        )
        .bind(self.user_id)
        .bind(self.movie_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| MovieError::Internal(format!("Failed to check wishlist: {e}")))
    }

    async fn insert(&self) -> Result<MembershipInsert> {
        let mut slot = self.tx.lock().await;
        let tx = open(&mut slot)?;
        // A unique violation would abort the transaction, so the conflict is
        // reported as an empty RETURNING instead.
        let result = sqlx::query_as::<_, WishlistRow>(
            r#"
            INSERT INTO wishlist (user_id, movie_id)
            VALUES ($1, $2)
            ON CONFLICT ON CONSTRAINT uk_wishlist_user_movie DO NOTHING
            RETURNING id, user_id, movie_id, created_at
            "#,
        )
        .bind(self.user_id)
        .bind(self.movie_id)
        .fetch_optional(&mut **tx)
        .await;

        match result {
            Ok(Some(row)) => Ok(MembershipInsert::Inserted(row.into())),
            Ok(None) => Ok(MembershipInsert::UniquenessConflict),
            Err(e) => map_insert_error(e, self.user_id, self.movie_id),
        }
    }

    async fn delete(&self) -> Result<bool> {
        let mut slot = self.tx.lock().await;
        let tx = open(&mut slot)?;
        let result = sqlx::query("DELETE FROM wishlist WHERE user_id = $1 AND movie_id = $2")
            .bind(self.user_id)
            .bind(self.movie_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| MovieError::Internal(format!("Failed to delete wishlist entry: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(&self) -> Result<()> {
        let tx = self.take().await?;
        tx.commit()
            .await
            .map_err(|e| MovieError::Internal(format!("Failed to commit transaction: {e}")))
    }

    async fn rollback(&self) -> Result<()> {
        let tx = self.take().await?;
        tx.rollback()
            .await
            .map_err(|e| MovieError::Internal(format!("Failed to roll back transaction: {e}")))
    }
}
