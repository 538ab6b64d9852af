use chrono::{DateTime, Utc};

use crate::ids::{MovieId, UserId};

/// Membership row: its existence is what "wishlisted" means. The
/// `(user_id, movie_id)` pair is unique in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WishlistEntry {
    pub id: i64,
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub created_at: DateTime<Utc>,
}
