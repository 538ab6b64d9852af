//! Repository ports (interfaces) grouped by bounded context.

pub mod catalog;
pub mod movie_stats;
pub mod wishlist;

pub use catalog::CatalogRepository;
pub use movie_stats::{MovieStatsRepository, VersionedWrite};
pub use wishlist::{MembershipInsert, MembershipTransaction, WishlistRepository, WishlistUnitOfWork};
