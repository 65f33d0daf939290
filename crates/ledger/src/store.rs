use async_trait::async_trait;

use common::{ListingId, NotificationId, OfferId, OrderId, UserId};
use domain::{
    CartEntry, Listing, Notification, NotificationPreferences, Offer, OfferStatus, Order,
};

use crate::Result;

/// Core trait for ledger store implementations.
///
/// The ledger owns every Listing/Offer/Order/Notification row; in-memory
/// values are transient views, never cached across requests. All
/// implementations must be thread-safe (Send + Sync).
///
/// Multi-row writes that must be atomic go through a [`LedgerTx`] obtained
/// from [`begin`](Ledger::begin). Single-row writes on this trait are atomic
/// on their own and enforce the store-level constraints:
/// [`insert_offer`](Ledger::insert_offer) rejects a second open offer per
/// (buyer, listing), and [`update_offer`](Ledger::update_offer) is a
/// compare-and-set on the offer's status so concurrent transitions resolve
/// to a typed conflict instead of a lost update.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// The transaction type produced by this store.
    type Tx: LedgerTx;

    /// Opens an atomic multi-statement transaction.
    ///
    /// Dropping the transaction without committing rolls back every write
    /// made through it.
    async fn begin(&self) -> Result<Self::Tx>;

    // -- listings --

    /// Persists a new listing.
    async fn insert_listing(&self, listing: &Listing) -> Result<()>;

    /// Fetches one listing.
    async fn listing(&self, id: ListingId) -> Result<Option<Listing>>;

    /// Fetches the listings with the given ids; absent ids are simply not
    /// returned.
    async fn listings(&self, ids: &[ListingId]) -> Result<Vec<Listing>>;

    /// Lists a seller's listings, newest first.
    async fn listings_by_seller(&self, seller_id: UserId) -> Result<Vec<Listing>>;

    // -- offers --

    /// Persists a new offer, enforcing open-offer exclusivity
    /// ([`LedgerError::OpenOfferExists`](crate::LedgerError::OpenOfferExists)).
    async fn insert_offer(&self, offer: &Offer) -> Result<()>;

    /// Fetches one offer.
    async fn offer(&self, id: OfferId) -> Result<Option<Offer>>;

    /// Conditionally updates an offer: the write applies only if the stored
    /// status still equals `expected`, otherwise
    /// [`LedgerError::StaleStatus`](crate::LedgerError::StaleStatus).
    async fn update_offer(&self, offer: &Offer, expected: OfferStatus) -> Result<()>;

    /// Lists the offers a buyer has made, newest first.
    async fn offers_by_buyer(&self, buyer_id: UserId) -> Result<Vec<Offer>>;

    /// Lists the offers a seller has received, newest first.
    async fn offers_by_seller(&self, seller_id: UserId) -> Result<Vec<Offer>>;

    // -- orders --

    /// Fetches one order with its items.
    async fn order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists a buyer's orders, newest first.
    async fn orders_by_buyer(&self, buyer_id: UserId) -> Result<Vec<Order>>;

    /// Looks up the order created for an external payment, if any.
    async fn order_by_payment_reference(&self, reference: &str) -> Result<Option<Order>>;

    // -- cart --

    /// Adds a listing to a user's cart (idempotent per user/listing pair).
    async fn upsert_cart_entry(&self, entry: &CartEntry) -> Result<()>;

    /// Lists a user's cart entries, oldest first.
    async fn cart_for_user(&self, user_id: UserId) -> Result<Vec<CartEntry>>;

    /// Removes one cart entry; returns false if it was not present.
    async fn remove_cart_entry(&self, user_id: UserId, listing_id: ListingId) -> Result<bool>;

    // -- notifications --

    /// Persists a notification row.
    async fn insert_notification(&self, notification: &Notification) -> Result<()>;

    /// Lists a user's notifications, newest first.
    async fn notifications_for_user(&self, user_id: UserId) -> Result<Vec<Notification>>;

    /// Marks a notification read; returns false if it does not exist or
    /// belongs to another user.
    async fn mark_notification_read(&self, user_id: UserId, id: NotificationId) -> Result<bool>;

    /// Fetches a user's delivery preferences, if they have saved any.
    async fn preferences(&self, user_id: UserId) -> Result<Option<NotificationPreferences>>;

    /// Creates or replaces a user's delivery preferences.
    async fn upsert_preferences(&self, prefs: &NotificationPreferences) -> Result<()>;
}

/// One atomic multi-statement transaction against the ledger.
///
/// Writes are visible to other callers only after [`commit`](LedgerTx::commit);
/// dropping the transaction rolls everything back. This is the unit of
/// mutual exclusion for checkout: the conditional
/// [`reserve_listings`](LedgerTx::reserve_listings) update inside it is what
/// prevents a double sale.
#[async_trait]
pub trait LedgerTx: Send {
    /// Fetches listings for subsequent mutation within this transaction.
    async fn listings_for_update(&mut self, ids: &[ListingId]) -> Result<Vec<Listing>>;

    /// Attempts to flip every named listing from `available` to `sold` with
    /// a conditional update (a row matches only while still available).
    /// Returns the number of rows actually flipped; the caller must abort
    /// the transaction when the count is short of the request.
    async fn reserve_listings(&mut self, ids: &[ListingId]) -> Result<u64>;

    /// Persists an order and its items, enforcing payment-reference
    /// uniqueness
    /// ([`LedgerError::DuplicatePaymentReference`](crate::LedgerError::DuplicatePaymentReference)).
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Deletes every cart entry (any user's) referencing the given
    /// listings. Returns the number of entries deleted.
    async fn delete_cart_entries(&mut self, listing_ids: &[ListingId]) -> Result<u64>;

    /// Bulk-transitions all open offers (pending, countered, or accepted)
    /// on the given listings to expired, clearing any captured accepted
    /// price. Already-terminal offers are untouched. Returns the number of
    /// offers expired.
    async fn expire_open_offers(&mut self, listing_ids: &[ListingId]) -> Result<u64>;

    /// Commits the transaction, making its writes visible atomically.
    async fn commit(self) -> Result<()>;
}
