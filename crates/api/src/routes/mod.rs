//! HTTP route handlers.

pub mod cart;
pub mod health;
pub mod listings;
pub mod metrics;
pub mod notifications;
pub mod offers;
pub mod orders;
pub mod payments;
pub mod shipping;
