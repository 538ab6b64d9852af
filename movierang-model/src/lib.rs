//! Core data model definitions shared across Movierang crates.
#![allow(missing_docs)]

pub mod box_office;
pub mod ids;
pub mod movie;
pub mod prelude;
pub mod release_date;
pub mod stats;
pub mod wishlist;

// Re-exports for downstream consumers.
pub use box_office::{BoxOfficeEntry, BoxOfficeMetrics};
pub use ids::{MovieId, UserId};
pub use movie::MovieIdentity;
pub use release_date::ReleaseDate;
pub use stats::{StatCounter, StatsAggregate};
pub use wishlist::WishlistEntry;
