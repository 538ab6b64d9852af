use std::collections::HashMap;
use std::{any::type_name_of_val, fmt, sync::Arc};

use movierang_model::{MovieId, MovieIdentity, StatCounter, UserId, WishlistEntry};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{CounterRetryConfig, ToggleConfig};
use crate::database::ports::{
    CatalogRepository, MembershipInsert, MembershipTransaction, WishlistUnitOfWork,
};
use crate::domain::stats::apply_versioned;
use crate::error::{MovieError, Result};

/// Membership row joined with its catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WishlistItem {
    pub entry: WishlistEntry,
    pub movie: MovieIdentity,
}

/// Flips `(user, movie)` membership and drives exactly one counter update
/// per flip.
///
/// Each evaluation runs in one unit of work: the membership change and the
/// wishlist counter write commit together or not at all. An insert that
/// still meets a uniqueness conflict takes the removal path in the same
/// unit; a row that vanished before its delete costs one evaluation.
/// Evaluations are bounded by [`ToggleConfig::max_attempts`].
pub struct WishlistService<C, W>
where
    C: CatalogRepository + ?Sized,
    W: WishlistUnitOfWork + ?Sized,
{
    catalog: Arc<C>,
    memberships: Arc<W>,
    retry: CounterRetryConfig,
    config: ToggleConfig,
}

impl<C, W> fmt::Debug for WishlistService<C, W>
where
    C: CatalogRepository + ?Sized,
    W: WishlistUnitOfWork + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WishlistService")
            .field("catalog", &type_name_of_val(self.catalog.as_ref()))
            .field("memberships", &type_name_of_val(self.memberships.as_ref()))
            .field("retry", &self.retry)
            .field("config", &self.config)
            .finish()
    }
}

impl<C, W> WishlistService<C, W>
where
    C: CatalogRepository + ?Sized,
    W: WishlistUnitOfWork + ?Sized,
{
    pub fn new(
        catalog: Arc<C>,
        memberships: Arc<W>,
        retry: CounterRetryConfig,
        config: ToggleConfig,
    ) -> Self {
        Self {
            catalog,
            memberships,
            retry,
            config,
        }
    }

    /// Flip membership and return the state after the call.
    ///
    /// On error nothing has changed: neither the membership row nor the
    /// counter.
    pub async fn toggle(&self, user_id: UserId, movie_id: MovieId) -> Result<bool> {
        if !self.catalog.exists(movie_id).await? {
            return Err(MovieError::not_found(format!("movie {movie_id}")));
        }

        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let tx = self.memberships.begin(user_id, movie_id).await?;

            match self.evaluate(&tx, user_id, movie_id, attempt).await {
                Ok(Some(wishlisted)) => {
                    tx.commit().await?;
                    if wishlisted {
                        info!(user_id = %user_id, movie_id = %movie_id, "added to wishlist");
                    } else {
                        info!(user_id = %user_id, movie_id = %movie_id, "removed from wishlist");
                    }
                    return Ok(wishlisted);
                }
                Ok(None) => {
                    tx.rollback().await?;
                    debug!(
                        user_id = %user_id,
                        movie_id = %movie_id,
                        attempt,
                        "wishlist row vanished before delete, re-evaluating"
                    );
                }
                Err(err) => {
                    if let Err(rollback) = tx.rollback().await {
                        error!(
                            user_id = %user_id,
                            movie_id = %movie_id,
                            error = %rollback,
                            "failed to roll back wishlist toggle"
                        );
                    }
                    return Err(err);
                }
            }
        }

        warn!(
            user_id = %user_id,
            movie_id = %movie_id,
            attempts = max_attempts,
            "wishlist toggle did not settle"
        );
        Err(MovieError::RetriesExhausted {
            operation: "wishlist toggle",
            attempts: max_attempts,
        })
    }

    /// One evaluation inside `tx`. `None` means the pair changed under us and
    /// nothing should be committed.
    async fn evaluate(
        &self,
        tx: &W::Transaction,
        user_id: UserId,
        movie_id: MovieId,
        attempt: u16,
    ) -> Result<Option<bool>> {
        if !tx.exists().await? {
            match tx.insert().await? {
                MembershipInsert::Inserted(_) => {
                    apply_versioned(tx, self.retry, movie_id, StatCounter::Wishlists, 1).await?;
                    return Ok(Some(true));
                }
                MembershipInsert::UniquenessConflict => warn!(
                    user_id = %user_id,
                    movie_id = %movie_id,
                    attempt,
                    "concurrent wishlist insert, taking removal path"
                ),
            }
        }

        if !tx.delete().await? {
            return Ok(None);
        }
        apply_versioned(tx, self.retry, movie_id, StatCounter::Wishlists, -1).await?;
        Ok(Some(false))
    }

    pub async fn is_wishlisted(&self, user_id: UserId, movie_id: MovieId) -> Result<bool> {
        self.memberships.exists(user_id, movie_id).await
    }

    /// Memberships of `user_id`, newest first. Rows whose movie has left the
    /// catalog are skipped.
    pub async fn wishlist_for(&self, user_id: UserId) -> Result<Vec<WishlistItem>> {
        let entries = self.memberships.list_for_user(user_id).await?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<MovieId> = entries.iter().map(|entry| entry.movie_id).collect();
        let mut movies: HashMap<MovieId, MovieIdentity> = self
            .catalog
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|movie| (movie.id, movie))
            .collect();

        let items: Vec<WishlistItem> = entries
            .into_iter()
            .filter_map(|entry| {
                // A movie can be listed once per user, so taking is safe.
                let movie = movies.remove(&entry.movie_id)?;
                Some(WishlistItem { entry, movie })
            })
            .collect();

        debug!(user_id = %user_id, count = items.len(), "wishlist listed");
        Ok(items)
    }
}
