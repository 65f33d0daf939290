//! Domain layer for the marketplace core.
//!
//! Pure types and rules, no I/O:
//! - Listing availability and discount rules
//! - Offer negotiation state machine
//! - Order and order-item records with commission pricing
//! - Shipping selection sum type and the static agency directory
//! - Notification records and delivery preferences

pub mod cart;
pub mod listing;
pub mod notification;
pub mod offer;
pub mod order;
pub mod pricing;
pub mod shipping;

pub use cart::CartEntry;
pub use common::{ListingId, Money, NotificationId, OfferId, OrderId, UserId};
pub use listing::{Listing, ListingError, ListingStatus};
pub use notification::{
    Notification, NotificationKind, NotificationPreferences, PreferenceKey,
};
pub use offer::{Offer, OfferError, OfferResponse, OfferStatus};
pub use order::{Order, OrderItem, OrderStatus};
pub use pricing::{CommissionRate, DEFAULT_COMMISSION_BPS, PriceBreakdown};
pub use shipping::{
    Address, Agency, AgencyDirectory, AgencyPickup, HomeDelivery, ShippingError,
    ShippingSelection,
};
