//! Shared builders and scripted port doubles for the core integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use movierang_core::config::CounterRetryConfig;
use movierang_core::database::infrastructure::memory::{
    InMemoryMembershipTransaction, InMemoryMovieStore,
};
use movierang_core::database::ports::{
    CatalogRepository, MembershipInsert, MembershipTransaction, MovieStatsRepository,
    VersionedWrite, WishlistRepository, WishlistUnitOfWork,
};
use movierang_core::error::{MovieError, Result};
use movierang_model::{MovieId, MovieIdentity, StatsAggregate, UserId, WishlistEntry};
use tokio::sync::Notify;

pub fn movie(id: i64, title: &str, release_date: &str) -> MovieIdentity {
    MovieIdentity::new(MovieId(id), format!("K{id:05}"), title).with_release_date(release_date)
}

pub fn store_with(movies: impl IntoIterator<Item = MovieIdentity>) -> Arc<InMemoryMovieStore> {
    Arc::new(InMemoryMovieStore::with_movies(movies))
}

pub fn empty_store() -> Arc<InMemoryMovieStore> {
    Arc::new(InMemoryMovieStore::new())
}

/// Retry policy with a short delay so contention tests stay fast.
pub fn quick_retry(max_attempts: u16) -> CounterRetryConfig {
    CounterRetryConfig {
        max_attempts,
        retry_delay_ms: 1,
    }
}

/// Catalog whose lookups always fail.
#[derive(Debug, Default)]
pub struct FailingCatalog {
    pub calls: AtomicUsize,
}

#[async_trait]
impl CatalogRepository for FailingCatalog {
    async fn find_by_exact_titles(&self, _titles: &HashSet<String>) -> Result<Vec<MovieIdentity>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(MovieError::Internal("Failed to query movies: connection reset".into()))
    }

    async fn find_by_alternate_title_contains(
        &self,
        _fragment: &str,
    ) -> Result<Vec<MovieIdentity>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(MovieError::Internal("Failed to query movies: connection reset".into()))
    }

    async fn find_by_id(&self, _id: MovieId) -> Result<Option<MovieIdentity>> {
        Err(MovieError::Internal("Failed to query movie".into()))
    }

    async fn find_by_ids(&self, _ids: &[MovieId]) -> Result<Vec<MovieIdentity>> {
        Err(MovieError::Internal("Failed to query movies".into()))
    }

    async fn exists(&self, _id: MovieId) -> Result<bool> {
        Err(MovieError::Internal("Failed to query movie".into()))
    }
}

/// Stats store that never accepts a conditioned write.
#[derive(Debug, Default)]
pub struct AlwaysStaleStats {
    pub writes: AtomicUsize,
}

#[async_trait]
impl MovieStatsRepository for AlwaysStaleStats {
    async fn fetch(&self, _movie_id: MovieId) -> Result<Option<StatsAggregate>> {
        Ok(None)
    }

    async fn write_if_version(
        &self,
        _next: &StatsAggregate,
        _expected_version: Option<i64>,
    ) -> Result<VersionedWrite> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(VersionedWrite::StaleVersion)
    }
}

/// Holds the first counter write of a toggle until released, then reports it
/// stale. Lets a test park one toggle between its membership change and its
/// counter update.
#[derive(Debug, Default)]
pub struct CounterGate {
    armed: AtomicBool,
    pub reached: Notify,
    pub release: Notify,
}

impl CounterGate {
    pub fn armed() -> Arc<Self> {
        Arc::new(Self {
            armed: AtomicBool::new(true),
            ..Self::default()
        })
    }
}

#[derive(Debug, Default)]
struct Script {
    /// How many upcoming membership reads report ABSENT regardless.
    stale_reads: AtomicUsize,
    stale_counter: AtomicBool,
    gate: Option<Arc<CounterGate>>,
}

/// Wraps the in-memory store and misbehaves on request inside its units of
/// work: stale "absent" reads reproduce the window in which two togglers both
/// observe ABSENT; a stale counter rejects every stats write.
#[derive(Debug)]
pub struct ScriptedMemberships {
    pub inner: Arc<InMemoryMovieStore>,
    script: Arc<Script>,
}

impl ScriptedMemberships {
    pub fn stale_reads(inner: Arc<InMemoryMovieStore>, stale_reads: usize) -> Self {
        Self::with_script(
            inner,
            Script {
                stale_reads: AtomicUsize::new(stale_reads),
                ..Script::default()
            },
        )
    }

    pub fn stale_counter(inner: Arc<InMemoryMovieStore>) -> Self {
        Self::with_script(
            inner,
            Script {
                stale_counter: AtomicBool::new(true),
                ..Script::default()
            },
        )
    }

    pub fn gated(inner: Arc<InMemoryMovieStore>, gate: Arc<CounterGate>) -> Self {
        Self::with_script(
            inner,
            Script {
                gate: Some(gate),
                ..Script::default()
            },
        )
    }

    fn with_script(inner: Arc<InMemoryMovieStore>, script: Script) -> Self {
        Self {
            inner,
            script: Arc::new(script),
        }
    }
}

#[async_trait]
impl WishlistRepository for ScriptedMemberships {
    async fn exists(&self, user_id: UserId, movie_id: MovieId) -> Result<bool> {
        WishlistRepository::exists(self.inner.as_ref(), user_id, movie_id).await
    }

    async fn insert(&self, user_id: UserId, movie_id: MovieId) -> Result<MembershipInsert> {
        self.inner.insert(user_id, movie_id).await
    }

    async fn delete(&self, user_id: UserId, movie_id: MovieId) -> Result<bool> {
        self.inner.delete(user_id, movie_id).await
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<WishlistEntry>> {
        self.inner.list_for_user(user_id).await
    }
}

#[async_trait]
impl WishlistUnitOfWork for ScriptedMemberships {
    type Transaction = ScriptedTransaction;

    async fn begin(&self, user_id: UserId, movie_id: MovieId) -> Result<Self::Transaction> {
        Ok(ScriptedTransaction {
            inner: self.inner.begin(user_id, movie_id).await?,
            script: Arc::clone(&self.script),
        })
    }
}

#[derive(Debug)]
pub struct ScriptedTransaction {
    inner: InMemoryMembershipTransaction,
    script: Arc<Script>,
}

#[async_trait]
impl MovieStatsRepository for ScriptedTransaction {
    async fn fetch(&self, movie_id: MovieId) -> Result<Option<StatsAggregate>> {
        self.inner.fetch(movie_id).await
    }

    async fn write_if_version(
        &self,
        next: &StatsAggregate,
        expected_version: Option<i64>,
    ) -> Result<VersionedWrite> {
        if let Some(gate) = &self.script.gate
            && gate.armed.swap(false, Ordering::SeqCst)
        {
            gate.reached.notify_one();
            gate.release.notified().await;
            return Ok(VersionedWrite::StaleVersion);
        }
        if self.script.stale_counter.load(Ordering::SeqCst) {
            return Ok(VersionedWrite::StaleVersion);
        }
        self.inner.write_if_version(next, expected_version).await
    }
}

#[async_trait]
impl MembershipTransaction for ScriptedTransaction {
    async fn exists(&self) -> Result<bool> {
        let lie = self
            .script
            .stale_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lie {
            return Ok(false);
        }
        self.inner.exists().await
    }

    async fn insert(&self) -> Result<MembershipInsert> {
        self.inner.insert().await
    }

    async fn delete(&self) -> Result<bool> {
        self.inner.delete().await
    }

    async fn commit(&self) -> Result<()> {
        self.inner.commit().await
    }

    async fn rollback(&self) -> Result<()> {
        self.inner.rollback().await
    }
}

/// Every insert conflicts and every delete finds nothing.
#[derive(Debug, Default)]
pub struct PhantomMemberships {
    pub begins: AtomicUsize,
}

#[async_trait]
impl WishlistRepository for PhantomMemberships {
    async fn exists(&self, _user_id: UserId, _movie_id: MovieId) -> Result<bool> {
        Ok(false)
    }

    async fn insert(&self, _user_id: UserId, _movie_id: MovieId) -> Result<MembershipInsert> {
        Ok(MembershipInsert::UniquenessConflict)
    }

    async fn delete(&self, _user_id: UserId, _movie_id: MovieId) -> Result<bool> {
        Ok(false)
    }

    async fn list_for_user(&self, _user_id: UserId) -> Result<Vec<WishlistEntry>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl WishlistUnitOfWork for PhantomMemberships {
    type Transaction = PhantomTransaction;

    async fn begin(&self, _user_id: UserId, _movie_id: MovieId) -> Result<Self::Transaction> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        Ok(PhantomTransaction)
    }
}

#[derive(Debug)]
pub struct PhantomTransaction;

#[async_trait]
impl MovieStatsRepository for PhantomTransaction {
    async fn fetch(&self, _movie_id: MovieId) -> Result<Option<StatsAggregate>> {
        Ok(None)
    }

    async fn write_if_version(
        &self,
        next: &StatsAggregate,
        _expected_version: Option<i64>,
    ) -> Result<VersionedWrite> {
        Ok(VersionedWrite::Applied(*next))
    }
}

#[async_trait]
impl MembershipTransaction for PhantomTransaction {
    async fn exists(&self) -> Result<bool> {
        Ok(false)
    }

    async fn insert(&self) -> Result<MembershipInsert> {
        Ok(MembershipInsert::UniquenessConflict)
    }

    async fn delete(&self) -> Result<bool> {
        Ok(false)
    }

    async fn commit(&self) -> Result<()> {
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        Ok(())
    }
}
