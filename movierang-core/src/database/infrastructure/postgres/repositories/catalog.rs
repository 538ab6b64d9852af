use std::collections::HashSet;

use async_trait::async_trait;
use movierang_model::{MovieId, MovieIdentity};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::database::ports::CatalogRepository;
use crate::error::{MovieError, Result};

const MOVIE_COLUMNS: &str = "id, doc_id, title, title_eng, title_etc, rep_rls_date, genre, poster_url";

#[derive(Debug, Clone)]
pub struct PostgresCatalogRepository {
    pool: PgPool,
}

impl PostgresCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_row(row: &PgRow) -> Result<MovieIdentity> {
        let read = |column: &str, e: sqlx::Error| {
            MovieError::Internal(format!("Failed to read movie {column}: {e}"))
        };

        Ok(MovieIdentity {
            id: MovieId(row.try_get("id").map_err(|e| read("id", e))?),
            doc_id: row.try_get("doc_id").map_err(|e| read("doc_id", e))?,
            title: row.try_get("title").map_err(|e| read("title", e))?,
            title_eng: row.try_get("title_eng").map_err(|e| read("title_eng", e))?,
            alternate_titles: row.try_get("title_etc").map_err(|e| read("title_etc", e))?,
            release_date: row
                .try_get("rep_rls_date")
                .map_err(|e| read("rep_rls_date", e))?,
            genre: row.try_get("genre").map_err(|e| read("genre", e))?,
            poster_url: row.try_get("poster_url").map_err(|e| read("poster_url", e))?,
        })
    }

    fn map_rows(rows: &[PgRow]) -> Result<Vec<MovieIdentity>> {
        rows.iter().map(Self::map_row).collect()
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    async fn find_by_exact_titles(&self, titles: &HashSet<String>) -> Result<Vec<MovieIdentity>> {
        if titles.is_empty() {
            return Ok(Vec::new());
        }
        let titles: Vec<String> = titles.iter().cloned().collect();

        let rows = sqlx::query(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE title = ANY($1) ORDER BY id"
        ))
        .bind(titles)
        .fetch_all(self.pool())
        .await
        .map_err(|e| MovieError::Internal(format!("Failed to look up exact titles: {e}")))?;

        Self::map_rows(&rows)
    }

    async fn find_by_alternate_title_contains(&self, fragment: &str) -> Result<Vec<MovieIdentity>> {
        // strpos keeps feed text containing LIKE metacharacters literal.
        let rows = sqlx::query(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE strpos(title_etc, $1) > 0 ORDER BY id"
        ))
        .bind(fragment)
        .fetch_all(self.pool())
        .await
        .map_err(|e| MovieError::Internal(format!("Failed to search alternate titles: {e}")))?;

        Self::map_rows(&rows)
    }

    async fn find_by_id(&self, id: MovieId) -> Result<Option<MovieIdentity>> {
        let row = sqlx::query(&format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| MovieError::Internal(format!("Failed to get movie by id: {e}")))?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn find_by_ids(&self, ids: &[MovieId]) -> Result<Vec<MovieIdentity>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = ids.iter().map(MovieId::as_i64).collect();

        let rows = sqlx::query(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE id = ANY($1) ORDER BY id"
        ))
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(|e| MovieError::Internal(format!("Failed to get movies by id: {e}")))?;

        Self::map_rows(&rows)
    }

    async fn exists(&self, id: MovieId) -> Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM movies WHERE id = $1)")
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(|e| MovieError::Internal(format!("Failed to check movie existence: {e}")))
    }
}
