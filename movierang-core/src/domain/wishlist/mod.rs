//! Wishlist membership toggles kept in step with the wishlist counter.

mod toggle;

pub use toggle::{WishlistItem, WishlistService};
