pub use crate::box_office::{BoxOfficeEntry, BoxOfficeMetrics};
pub use crate::ids::{MovieId, UserId};
pub use crate::movie::MovieIdentity;
pub use crate::release_date::ReleaseDate;
pub use crate::stats::{StatCounter, StatsAggregate};
pub use crate::wishlist::WishlistEntry;
