//! PostgreSQL-backed repository implementations.

pub mod catalog;
pub mod movie_stats;
pub mod wishlist;

pub use catalog::PostgresCatalogRepository;
pub use movie_stats::PostgresMovieStatsRepository;
pub use wishlist::{PostgresMembershipTransaction, PostgresWishlistRepository};
