//! Cart entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{ListingId, UserId};

/// One listing saved in a user's cart.
///
/// Cart entries referencing a listing are deleted inside the checkout
/// transaction that sells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    pub user_id: UserId,
    pub listing_id: ListingId,
    pub added_at: DateTime<Utc>,
}

impl CartEntry {
    /// Creates a cart entry timestamped now.
    pub fn new(user_id: UserId, listing_id: ListingId) -> Self {
        Self {
            user_id,
            listing_id,
            added_at: Utc::now(),
        }
    }
}
