//! Shared types for the marketplace core.
//!
//! Identifier newtypes keep user, listing, offer, and order ids from being
//! mixed up at compile time. `Money` is a fixed-point currency amount in
//! integer cents.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{ListingId, NotificationId, OfferId, OrderId, UserId};
