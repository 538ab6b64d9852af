use async_trait::async_trait;
use movierang_model::{MovieId, UserId, WishlistEntry};

use super::MovieStatsRepository;
use crate::error::Result;

/// Outcome of a membership insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipInsert {
    Inserted(WishlistEntry),
    /// The `(user, movie)` row already exists.
    UniquenessConflict,
}

#[async_trait]
pub trait WishlistRepository: Send + Sync {
    async fn exists(&self, user_id: UserId, movie_id: MovieId) -> Result<bool>;

    async fn insert(&self, user_id: UserId, movie_id: MovieId) -> Result<MembershipInsert>;

    /// Returns whether a row was removed.
    async fn delete(&self, user_id: UserId, movie_id: MovieId) -> Result<bool>;

    /// Newest first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<WishlistEntry>>;
}

/// Starts toggle units of work.
///
/// A unit of work covers one `(user, movie)` pair. Units on the same pair are
/// serialized: a second `begin` for the pair waits until the first commits or
/// rolls back, so no toggler observes a membership change whose counter
/// update has not been committed with it.
#[async_trait]
pub trait WishlistUnitOfWork: WishlistRepository {
    type Transaction: MembershipTransaction;

    async fn begin(&self, user_id: UserId, movie_id: MovieId) -> Result<Self::Transaction>;
}

/// One open unit of work: membership changes for its pair plus counter
/// writes (through [`MovieStatsRepository`]) that commit or roll back
/// together.
///
/// Dropping an unfinished transaction rolls it back.
#[async_trait]
pub trait MembershipTransaction: MovieStatsRepository {
    async fn exists(&self) -> Result<bool>;

    async fn insert(&self) -> Result<MembershipInsert>;

    /// Returns whether a row was removed.
    async fn delete(&self) -> Result<bool>;

    async fn commit(&self) -> Result<()>;

    async fn rollback(&self) -> Result<()>;
}
