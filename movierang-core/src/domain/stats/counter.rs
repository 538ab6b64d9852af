use std::{any::type_name_of_val, fmt, sync::Arc};

use movierang_model::{MovieId, StatCounter, StatsAggregate};
use tracing::{debug, warn};

use crate::config::CounterRetryConfig;
use crate::database::ports::{MovieStatsRepository, VersionedWrite};
use crate::error::{MovieError, Result};

/// Applies counter deltas with a version-checked compare-and-swap.
///
/// Each attempt reads the row (or starts from a fresh aggregate), computes
/// the next state, and writes it conditioned on the version it read. A lost
/// race costs one attempt; after `max_attempts` the caller gets
/// [`MovieError::RetriesExhausted`] and no delta has been applied.
pub struct StatsCounter<S>
where
    S: MovieStatsRepository + ?Sized,
{
    repository: Arc<S>,
    config: CounterRetryConfig,
}

impl<S> Clone for StatsCounter<S>
where
    S: MovieStatsRepository + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            config: self.config,
        }
    }
}

impl<S> fmt::Debug for StatsCounter<S>
where
    S: MovieStatsRepository + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatsCounter")
            .field("repository", &type_name_of_val(self.repository.as_ref()))
            .field("config", &self.config)
            .finish()
    }
}

impl<S> StatsCounter<S>
where
    S: MovieStatsRepository + ?Sized,
{
    pub fn new(repository: Arc<S>, config: CounterRetryConfig) -> Self {
        Self { repository, config }
    }

    /// Add `delta` to one counter of `movie_id`. Decrements clamp at zero.
    pub async fn apply(
        &self,
        movie_id: MovieId,
        counter: StatCounter,
        delta: i64,
    ) -> Result<StatsAggregate> {
        apply_versioned(self.repository.as_ref(), self.config, movie_id, counter, delta).await
    }

    pub async fn increment_views(&self, movie_id: MovieId) -> Result<StatsAggregate> {
        self.apply(movie_id, StatCounter::Views, 1).await
    }

    /// Stored aggregate, or a fresh one when the movie was never counted.
    /// Does not create a row.
    pub async fn snapshot(&self, movie_id: MovieId) -> Result<StatsAggregate> {
        Ok(self
            .repository
            .fetch(movie_id)
            .await?
            .unwrap_or_else(|| StatsAggregate::fresh(movie_id)))
    }
}

/// The compare-and-swap loop behind [`StatsCounter::apply`], usable against
/// any stats writer, including one bound to an open transaction.
pub(crate) async fn apply_versioned<S>(
    repository: &S,
    config: CounterRetryConfig,
    movie_id: MovieId,
    counter: StatCounter,
    delta: i64,
) -> Result<StatsAggregate>
where
    S: MovieStatsRepository + ?Sized,
{
    let max_attempts = config.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let current = repository.fetch(movie_id).await?;
        let expected_version = current.map(|stats| stats.version);
        let next = current
            .unwrap_or_else(|| StatsAggregate::fresh(movie_id))
            .applied(counter, delta);

        match repository.write_if_version(&next, expected_version).await? {
            VersionedWrite::Applied(stored) => {
                debug!(
                    movie_id = %movie_id,
                    %counter,
                    delta,
                    attempt,
                    value = stored.count(counter),
                    version = stored.version,
                    "stats updated"
                );
                return Ok(stored);
            }
            VersionedWrite::StaleVersion => {
                debug!(movie_id = %movie_id, %counter, attempt, "stale stats version");
                if attempt < max_attempts {
                    tokio::time::sleep(config.retry_delay()).await;
                }
            }
        }
    }

    warn!(
        movie_id = %movie_id,
        %counter,
        delta,
        attempts = max_attempts,
        "stats update gave up after repeated version conflicts"
    );
    Err(MovieError::RetriesExhausted {
        operation: "stats update",
        attempts: max_attempts,
    })
}
