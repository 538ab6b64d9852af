//! Per-movie popularity counters.

mod counter;
mod detail;

pub use counter::StatsCounter;
pub(crate) use counter::apply_versioned;
pub use detail::{MovieDetail, MovieDetailService};
