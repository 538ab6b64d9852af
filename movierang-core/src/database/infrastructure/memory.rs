//! In-process store implementing every repository port.
//!
//! Mirrors the relational semantics the services depend on: stats writes
//! are version-conditioned, the `(user, movie)` membership pair is unique,
//! and rows referencing an unknown movie are rejected the way a foreign key
//! would reject them. Toggle units of work hold a per-pair lock and keep an
//! undo log, so a rolled-back toggle leaves neither its membership change
//! nor its counter write behind. Used by the test suites and by tooling that
//! wants the services without a database.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use movierang_model::{MovieId, MovieIdentity, StatsAggregate, UserId, WishlistEntry};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::database::ports::{
    CatalogRepository, MembershipInsert, MembershipTransaction, MovieStatsRepository,
    VersionedWrite, WishlistRepository, WishlistUnitOfWork,
};
use crate::error::{MovieError, Result};

type PairKey = (UserId, MovieId);

struct Tables {
    movies: RwLock<BTreeMap<MovieId, MovieIdentity>>,
    stats: DashMap<MovieId, StatsAggregate>,
    wishlist: DashMap<PairKey, WishlistEntry>,
    next_wishlist_id: AtomicI64,
    pair_locks: DashMap<PairKey, Arc<AsyncMutex<()>>>,
}

impl Tables {
    fn ensure_movie(&self, movie_id: MovieId) -> Result<()> {
        if self.movies.read().contains_key(&movie_id) {
            Ok(())
        } else {
            Err(MovieError::not_found(format!("movie {movie_id}")))
        }
    }

    fn write_if_version(
        &self,
        next: &StatsAggregate,
        expected_version: Option<i64>,
    ) -> Result<VersionedWrite> {
        self.ensure_movie(next.movie_id)?;

        match expected_version {
            None => match self.stats.entry(next.movie_id) {
                Entry::Occupied(_) => Ok(VersionedWrite::StaleVersion),
                Entry::Vacant(slot) => {
                    slot.insert(*next);
                    Ok(VersionedWrite::Applied(*next))
                }
            },
            Some(expected) => match self.stats.get_mut(&next.movie_id) {
                Some(mut row) if row.version == expected => {
                    *row = *next;
                    Ok(VersionedWrite::Applied(*next))
                }
                _ => Ok(VersionedWrite::StaleVersion),
            },
        }
    }

    fn insert_membership(&self, user_id: UserId, movie_id: MovieId) -> Result<MembershipInsert> {
        self.ensure_movie(movie_id)?;

        match self.wishlist.entry((user_id, movie_id)) {
            Entry::Occupied(_) => Ok(MembershipInsert::UniquenessConflict),
            Entry::Vacant(slot) => {
                let entry = WishlistEntry {
                    id: self.next_wishlist_id.fetch_add(1, Ordering::Relaxed),
                    user_id,
                    movie_id,
                    created_at: Utc::now(),
                };
                slot.insert(entry.clone());
                Ok(MembershipInsert::Inserted(entry))
            }
        }
    }

    /// Subtract a rolled-back write's delta. Versions only move forward, so a
    /// writer that read the rolled-back state can never match again.
    fn revert_stats(&self, before: Option<StatsAggregate>, after: &StatsAggregate) {
        let Some(mut row) = self.stats.get_mut(&after.movie_id) else {
            return;
        };
        let base = before.unwrap_or_else(|| StatsAggregate::fresh(after.movie_id));
        row.view_count = row
            .view_count
            .saturating_add_signed(base.view_count as i64 - after.view_count as i64);
        row.wishlist_count = row
            .wishlist_count
            .saturating_add_signed(base.wishlist_count as i64 - after.wishlist_count as i64);
        row.version += 1;
    }
}

pub struct InMemoryMovieStore {
    tables: Arc<Tables>,
}

impl Default for InMemoryMovieStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryMovieStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryMovieStore")
            .field("movies", &self.tables.movies.read().len())
            .field("stats_rows", &self.tables.stats.len())
            .field("wishlist_rows", &self.tables.wishlist.len())
            .finish()
    }
}

impl InMemoryMovieStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Tables {
                movies: RwLock::new(BTreeMap::new()),
                stats: DashMap::new(),
                wishlist: DashMap::new(),
                next_wishlist_id: AtomicI64::new(1),
                pair_locks: DashMap::new(),
            }),
        }
    }

    pub fn with_movies(movies: impl IntoIterator<Item = MovieIdentity>) -> Self {
        let store = Self::new();
        for movie in movies {
            store.insert_movie(movie);
        }
        store
    }

    /// Insert or replace a catalog record.
    pub fn insert_movie(&self, movie: MovieIdentity) {
        self.tables.movies.write().insert(movie.id, movie);
    }

    /// Remove a catalog record, leaving any counters or memberships behind.
    pub fn remove_movie(&self, id: MovieId) -> Option<MovieIdentity> {
        self.tables.movies.write().remove(&id)
    }

    /// Current stored aggregate, bypassing the port.
    pub fn stats_snapshot(&self, movie_id: MovieId) -> Option<StatsAggregate> {
        self.tables.stats.get(&movie_id).map(|row| *row)
    }

    pub fn membership_count(&self, movie_id: MovieId) -> usize {
        self.tables
            .wishlist
            .iter()
            .filter(|row| row.key().1 == movie_id)
            .count()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryMovieStore {
    async fn find_by_exact_titles(&self, titles: &HashSet<String>) -> Result<Vec<MovieIdentity>> {
        let movies = self.tables.movies.read();
        Ok(movies
            .values()
            .filter(|movie| titles.contains(&movie.title))
            .cloned()
            .collect())
    }

    async fn find_by_alternate_title_contains(&self, fragment: &str) -> Result<Vec<MovieIdentity>> {
        let movies = self.tables.movies.read();
        Ok(movies
            .values()
            .filter(|movie| {
                movie
                    .alternate_titles
                    .as_deref()
                    .is_some_and(|alternates| alternates.contains(fragment))
            })
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: MovieId) -> Result<Option<MovieIdentity>> {
        Ok(self.tables.movies.read().get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[MovieId]) -> Result<Vec<MovieIdentity>> {
        let movies = self.tables.movies.read();
        Ok(ids.iter().filter_map(|id| movies.get(id).cloned()).collect())
    }

    async fn exists(&self, id: MovieId) -> Result<bool> {
        Ok(self.tables.movies.read().contains_key(&id))
    }
}

#[async_trait]
impl MovieStatsRepository for InMemoryMovieStore {
    async fn fetch(&self, movie_id: MovieId) -> Result<Option<StatsAggregate>> {
        Ok(self.stats_snapshot(movie_id))
    }

    async fn write_if_version(
        &self,
        next: &StatsAggregate,
        expected_version: Option<i64>,
    ) -> Result<VersionedWrite> {
        self.tables.write_if_version(next, expected_version)
    }
}

#[async_trait]
impl WishlistRepository for InMemoryMovieStore {
    async fn exists(&self, user_id: UserId, movie_id: MovieId) -> Result<bool> {
        Ok(self.tables.wishlist.contains_key(&(user_id, movie_id)))
    }

    async fn insert(&self, user_id: UserId, movie_id: MovieId) -> Result<MembershipInsert> {
        self.tables.insert_membership(user_id, movie_id)
    }

    async fn delete(&self, user_id: UserId, movie_id: MovieId) -> Result<bool> {
        Ok(self.tables.wishlist.remove(&(user_id, movie_id)).is_some())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<WishlistEntry>> {
        let mut entries: Vec<WishlistEntry> = self
            .tables
            .wishlist
            .iter()
            .filter(|row| row.key().0 == user_id)
            .map(|row| row.value().clone())
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(entries)
    }
}

#[async_trait]
impl WishlistUnitOfWork for InMemoryMovieStore {
    type Transaction = InMemoryMembershipTransaction;

    async fn begin(&self, user_id: UserId, movie_id: MovieId) -> Result<Self::Transaction> {
        let key = (user_id, movie_id);
        let lock = self.tables.pair_locks.entry(key).or_default().clone();
        let guard = lock.lock_owned().await;

        Ok(InMemoryMembershipTransaction {
            key,
            tables: Arc::clone(&self.tables),
            state: Mutex::new(TransactionState {
                guard: Some(guard),
                undo: Vec::new(),
            }),
        })
    }
}

enum Undo {
    /// Remove the row with this id if it is still the stored one.
    Inserted { id: i64 },
    /// Restore the removed row.
    Deleted(WishlistEntry),
    Stats {
        before: Option<StatsAggregate>,
        after: StatsAggregate,
    },
}

struct TransactionState {
    /// `None` once committed or rolled back.
    guard: Option<OwnedMutexGuard<()>>,
    undo: Vec<Undo>,
}

/// Toggle unit of work over [`InMemoryMovieStore`].
///
/// Writes land in the shared tables at once and are recorded for undo. A
/// counter row created by the unit survives a rollback at zero.
/// The pair lock keeps other units on the same pair waiting until this one
/// finishes.
pub struct InMemoryMembershipTransaction {
    key: PairKey,
    tables: Arc<Tables>,
    state: Mutex<TransactionState>,
}

impl fmt::Debug for InMemoryMembershipTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("InMemoryMembershipTransaction")
            .field("user_id", &self.key.0)
            .field("movie_id", &self.key.1)
            .field("open", &state.guard.is_some())
            .field("pending_writes", &state.undo.len())
            .finish()
    }
}

impl InMemoryMembershipTransaction {
    fn ensure_open(&self) -> Result<()> {
        if self.state.lock().guard.is_some() {
            Ok(())
        } else {
            Err(MovieError::Internal("transaction already finished".into()))
        }
    }

    fn record(&self, undo: Undo) {
        self.state.lock().undo.push(undo);
    }

    fn undo_all(&self, undo: Vec<Undo>) {
        for step in undo.into_iter().rev() {
            match step {
                Undo::Inserted { id } => {
                    self.tables.wishlist.remove_if(&self.key, |_, row| row.id == id);
                }
                Undo::Deleted(entry) => {
                    if let Entry::Vacant(slot) = self.tables.wishlist.entry(self.key) {
                        slot.insert(entry);
                    }
                }
                Undo::Stats { before, after } => self.tables.revert_stats(before, &after),
            }
        }
    }

    /// Release the pair lock, discarding any undo log. `false` when the unit
    /// was already finished.
    fn finish(&self) -> bool {
        let Some(guard) = self.state.lock().guard.take() else {
            return false;
        };
        drop(guard);
        self.tables
            .pair_locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
        true
    }

    fn roll_back_now(&self) {
        // Undo before the lock is released so the next unit on this pair
        // never sees the rolled-back writes.
        let steps = {
            let mut state = self.state.lock();
            if state.guard.is_none() {
                return;
            }
            std::mem::take(&mut state.undo)
        };
        if !steps.is_empty() {
            debug!(
                user_id = %self.key.0,
                movie_id = %self.key.1,
                steps = steps.len(),
                "rolling back wishlist unit of work"
            );
        }
        self.undo_all(steps);
        self.finish();
    }
}

impl Drop for InMemoryMembershipTransaction {
    fn drop(&mut self) {
        self.roll_back_now();
    }
}

#[async_trait]
impl MovieStatsRepository for InMemoryMembershipTransaction {
    async fn fetch(&self, movie_id: MovieId) -> Result<Option<StatsAggregate>> {
        self.ensure_open()?;
        Ok(self.tables.stats.get(&movie_id).map(|row| *row))
    }

    async fn write_if_version(
        &self,
        next: &StatsAggregate,
        expected_version: Option<i64>,
    ) -> Result<VersionedWrite> {
        self.ensure_open()?;
        let before = self.tables.stats.get(&next.movie_id).map(|row| *row);
        let outcome = self.tables.write_if_version(next, expected_version)?;
        if let VersionedWrite::Applied(after) = outcome {
            // `before` is only trusted when it is the row the CAS replaced.
            let before = before.filter(|row| Some(row.version) == expected_version);
            self.record(Undo::Stats { before, after });
        }
        Ok(outcome)
    }
}

#[async_trait]
impl MembershipTransaction for InMemoryMembershipTransaction {
    async fn exists(&self) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.tables.wishlist.contains_key(&self.key))
    }

    async fn insert(&self) -> Result<MembershipInsert> {
        self.ensure_open()?;
        let outcome = self.tables.insert_membership(self.key.0, self.key.1)?;
        if let MembershipInsert::Inserted(entry) = &outcome {
            self.record(Undo::Inserted { id: entry.id });
        }
        Ok(outcome)
    }

    async fn delete(&self) -> Result<bool> {
        self.ensure_open()?;
        match self.tables.wishlist.remove(&self.key) {
            Some((_, entry)) => {
                self.record(Undo::Deleted(entry));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn commit(&self) -> Result<()> {
        if self.finish() {
            Ok(())
        } else {
            Err(MovieError::Internal("transaction already finished".into()))
        }
    }

    async fn rollback(&self) -> Result<()> {
        self.ensure_open()?;
        self.roll_back_now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use movierang_model::StatCounter;

    use super::*;

    fn store() -> InMemoryMovieStore {
        InMemoryMovieStore::with_movies([MovieIdentity::new(MovieId(1), "K00001", "Held")])
    }

    #[tokio::test]
    async fn dropping_an_open_unit_undoes_its_writes() {
        let store = store();
        {
            let tx = store.begin(UserId(1), MovieId(1)).await.unwrap();
            assert!(matches!(tx.insert().await.unwrap(), MembershipInsert::Inserted(_)));
            let next = StatsAggregate::fresh(MovieId(1)).applied(StatCounter::Wishlists, 1);
            tx.write_if_version(&next, None).await.unwrap();
            assert_eq!(store.membership_count(MovieId(1)), 1);
        }

        assert_eq!(store.membership_count(MovieId(1)), 0);
        let stats = store.stats_snapshot(MovieId(1)).unwrap();
        assert_eq!(stats.wishlist_count, 0);
        assert_eq!(stats.version, 2);
    }

    #[tokio::test]
    async fn rollback_keeps_writes_made_by_others_since() {
        let store = store();
        let tx = store.begin(UserId(1), MovieId(1)).await.unwrap();
        let ours = StatsAggregate::fresh(MovieId(1)).applied(StatCounter::Wishlists, 1);
        tx.write_if_version(&ours, None).await.unwrap();

        // Another user's toggle commits on top of ours.
        let theirs = ours.applied(StatCounter::Wishlists, 1);
        let written = store.write_if_version(&theirs, Some(ours.version)).await.unwrap();
        assert_eq!(written, VersionedWrite::Applied(theirs));

        tx.rollback().await.unwrap();

        let stored = store.stats_snapshot(MovieId(1)).unwrap();
        assert_eq!(stored.wishlist_count, 1);
        assert_eq!(stored.version, theirs.version + 1);
    }

    #[tokio::test]
    async fn second_unit_on_a_pair_waits_for_the_first() {
        let store = store();
        let first = store.begin(UserId(1), MovieId(1)).await.unwrap();

        let blocked = store.begin(UserId(1), MovieId(1));
        assert!(tokio::time::timeout(Duration::from_millis(20), blocked).await.is_err());
        // Other pairs are not held up.
        store.begin(UserId(2), MovieId(1)).await.unwrap();

        first.insert().await.unwrap();
        first.commit().await.unwrap();
        assert!(first.exists().await.is_err());

        let second = store.begin(UserId(1), MovieId(1)).await.unwrap();
        assert!(second.exists().await.unwrap());
    }
}
