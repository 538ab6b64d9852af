use std::{any::type_name_of_val, fmt, sync::Arc};

use movierang_model::{MovieId, MovieIdentity, StatsAggregate};
use serde::Serialize;
use tracing::debug;

use super::StatsCounter;
use crate::database::ports::{CatalogRepository, MovieStatsRepository};
use crate::error::{MovieError, Result};

/// Catalog record together with its popularity counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovieDetail {
    pub movie: MovieIdentity,
    pub stats: StatsAggregate,
}

/// Movie detail lookups. Opening a detail page counts as one view.
pub struct MovieDetailService<C, S>
where
    C: CatalogRepository + ?Sized,
    S: MovieStatsRepository + ?Sized,
{
    catalog: Arc<C>,
    counter: StatsCounter<S>,
}

impl<C, S> fmt::Debug for MovieDetailService<C, S>
where
    C: CatalogRepository + ?Sized,
    S: MovieStatsRepository + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MovieDetailService")
            .field("catalog", &type_name_of_val(self.catalog.as_ref()))
            .field("counter", &self.counter)
            .finish()
    }
}

impl<C, S> MovieDetailService<C, S>
where
    C: CatalogRepository + ?Sized,
    S: MovieStatsRepository + ?Sized,
{
    pub fn new(catalog: Arc<C>, counter: StatsCounter<S>) -> Self {
        Self { catalog, counter }
    }

    /// Load the movie and record a view. An unknown movie is not counted.
    pub async fn view(&self, movie_id: MovieId) -> Result<MovieDetail> {
        let movie = self
            .catalog
            .find_by_id(movie_id)
            .await?
            .ok_or_else(|| MovieError::not_found(format!("movie {movie_id}")))?;

        let stats = self.counter.increment_views(movie_id).await?;
        debug!(movie_id = %movie_id, views = stats.view_count, "movie viewed");

        Ok(MovieDetail { movie, stats })
    }

    /// Current counters without recording a view.
    pub async fn stats(&self, movie_id: MovieId) -> Result<StatsAggregate> {
        if !self.catalog.exists(movie_id).await? {
            return Err(MovieError::not_found(format!("movie {movie_id}")));
        }
        self.counter.snapshot(movie_id).await
    }
}
