use crate::ids::MovieId;

/// Which popularity counter of a [`StatsAggregate`] an update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StatCounter {
    Views,
    Wishlists,
}

impl StatCounter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatCounter::Views => "views",
            StatCounter::Wishlists => "wishlists",
        }
    }
}

impl std::fmt::Display for StatCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Versioned per-movie counter row.
///
/// `version` is the only concurrency-control token: every successful write
/// stores `version + 1`, and a write is accepted only when the stored
/// version still equals the one that was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatsAggregate {
    pub movie_id: MovieId,
    pub view_count: u64,
    pub wishlist_count: u64,
    pub version: i64,
}

impl StatsAggregate {
    /// Zero-valued aggregate for a movie that has never been counted.
    /// Version 0 means "not yet written".
    pub fn fresh(movie_id: MovieId) -> Self {
        Self {
            movie_id,
            view_count: 0,
            wishlist_count: 0,
            version: 0,
        }
    }

    pub fn count(&self, counter: StatCounter) -> u64 {
        match counter {
            StatCounter::Views => self.view_count,
            StatCounter::Wishlists => self.wishlist_count,
        }
    }

    /// Next state after adding `delta` to `counter`. Decrements saturate at
    /// zero; the version is bumped.
    pub fn applied(&self, counter: StatCounter, delta: i64) -> Self {
        let mut next = *self;
        let slot = match counter {
            StatCounter::Views => &mut next.view_count,
            StatCounter::Wishlists => &mut next.wishlist_count,
        };
        *slot = slot.saturating_add_signed(delta);
        next.version = self.version + 1;
        next
    }
}
