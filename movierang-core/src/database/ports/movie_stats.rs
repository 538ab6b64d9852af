use async_trait::async_trait;
use movierang_model::{MovieId, StatsAggregate};

use crate::error::Result;

/// Outcome of a version-conditioned write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionedWrite {
    /// The row now holds exactly the submitted aggregate.
    Applied(StatsAggregate),
    /// Another writer got there first; nothing was written.
    StaleVersion,
}

#[async_trait]
pub trait MovieStatsRepository: Send + Sync {
    async fn fetch(&self, movie_id: MovieId) -> Result<Option<StatsAggregate>>;

    /// Store `next` only if the stored row is still at `expected_version`.
    ///
    /// `expected_version == None` means the caller read no row; the write
    /// then creates it and reports [`VersionedWrite::StaleVersion`] if a row
    /// appeared in the meantime.
    async fn write_if_version(
        &self,
        next: &StatsAggregate,
        expected_version: Option<i64>,
    ) -> Result<VersionedWrite>;
}
