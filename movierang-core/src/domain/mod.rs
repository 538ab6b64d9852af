pub mod reconcile;
pub mod stats;
pub mod wishlist;
