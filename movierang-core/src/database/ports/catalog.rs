use std::collections::HashSet;

use async_trait::async_trait;
use movierang_model::{MovieId, MovieIdentity};

use crate::error::Result;

/// Read-only access to canonical movie records.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Every record whose primary title equals one of `titles`. Duplicate
    /// titles (remakes, reissues) all come back.
    async fn find_by_exact_titles(&self, titles: &HashSet<String>) -> Result<Vec<MovieIdentity>>;

    /// Records whose alternate-titles field contains `fragment` verbatim.
    async fn find_by_alternate_title_contains(&self, fragment: &str) -> Result<Vec<MovieIdentity>>;

    async fn find_by_id(&self, id: MovieId) -> Result<Option<MovieIdentity>>;

    async fn find_by_ids(&self, ids: &[MovieId]) -> Result<Vec<MovieIdentity>>;

    async fn exists(&self, id: MovieId) -> Result<bool>;
}
