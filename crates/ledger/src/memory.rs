use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use common::{ListingId, NotificationId, OfferId, OrderId, UserId};
use domain::{
    CartEntry, Listing, ListingStatus, Notification, NotificationPreferences, Offer, OfferStatus,
    Order,
};

use crate::{
    LedgerError, Result,
    store::{Ledger, LedgerTx},
};

#[derive(Debug, Clone, Default)]
struct LedgerState {
    listings: HashMap<ListingId, Listing>,
    offers: HashMap<OfferId, Offer>,
    orders: HashMap<OrderId, Order>,
    cart: BTreeMap<(UserId, ListingId), CartEntry>,
    notifications: Vec<Notification>,
    preferences: HashMap<UserId, NotificationPreferences>,
}

impl LedgerState {
    fn has_open_offer(&self, buyer_id: UserId, listing_id: ListingId) -> bool {
        self.offers.values().any(|o| {
            o.buyer_id == buyer_id && o.listing_id == listing_id && o.status.is_open()
        })
    }
}

/// In-memory ledger store implementation for testing.
///
/// Stores all rows in plain collections behind one async mutex and provides
/// the same interface and constraint behavior as the PostgreSQL
/// implementation. A transaction takes the mutex for its whole lifetime and
/// mutates a working copy of the state; commit swaps the copy in, drop
/// discards it. Holding the lock per transaction serializes all access,
/// which is exactly the isolation the tests rely on.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedger {
    /// Creates a new empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Returns the total number of notification rows stored.
    pub async fn notification_count(&self) -> usize {
        self.state.lock().await.notifications.len()
    }

    /// Clears all stored rows.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        *state = LedgerState::default();
    }
}

/// An open transaction against an [`InMemoryLedger`].
pub struct InMemoryTx {
    guard: OwnedMutexGuard<LedgerState>,
    working: LedgerState,
}

#[async_trait]
impl Ledger for InMemoryLedger {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<Self::Tx> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryTx { guard, working })
    }

    async fn insert_listing(&self, listing: &Listing) -> Result<()> {
        let mut state = self.state.lock().await;
        state.listings.insert(listing.id, listing.clone());
        Ok(())
    }

    async fn listing(&self, id: ListingId) -> Result<Option<Listing>> {
        Ok(self.state.lock().await.listings.get(&id).cloned())
    }

    async fn listings(&self, ids: &[ListingId]) -> Result<Vec<Listing>> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.listings.get(id).cloned())
            .collect())
    }

    async fn listings_by_seller(&self, seller_id: UserId) -> Result<Vec<Listing>> {
        let state = self.state.lock().await;
        let mut listings: Vec<_> = state
            .listings
            .values()
            .filter(|l| l.seller_id == seller_id)
            .cloned()
            .collect();
        listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listings)
    }

    async fn insert_offer(&self, offer: &Offer) -> Result<()> {
        let mut state = self.state.lock().await;
        // Simulates the partial unique index on open offers.
        if state.has_open_offer(offer.buyer_id, offer.listing_id) {
            return Err(LedgerError::OpenOfferExists {
                buyer_id: offer.buyer_id,
                listing_id: offer.listing_id,
            });
        }
        state.offers.insert(offer.id, offer.clone());
        Ok(())
    }

    async fn offer(&self, id: OfferId) -> Result<Option<Offer>> {
        Ok(self.state.lock().await.offers.get(&id).cloned())
    }

    async fn update_offer(&self, offer: &Offer, expected: OfferStatus) -> Result<()> {
        let mut state = self.state.lock().await;
        match state.offers.get_mut(&offer.id) {
            Some(stored) if stored.status == expected => {
                *stored = offer.clone();
                Ok(())
            }
            // A missing row means the caller's snapshot is stale too.
            _ => Err(LedgerError::StaleStatus {
                offer_id: offer.id,
                expected,
            }),
        }
    }

    async fn offers_by_buyer(&self, buyer_id: UserId) -> Result<Vec<Offer>> {
        let state = self.state.lock().await;
        let mut offers: Vec<_> = state
            .offers
            .values()
            .filter(|o| o.buyer_id == buyer_id)
            .cloned()
            .collect();
        offers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(offers)
    }

    async fn offers_by_seller(&self, seller_id: UserId) -> Result<Vec<Offer>> {
        let state = self.state.lock().await;
        let mut offers: Vec<_> = state
            .offers
            .values()
            .filter(|o| o.seller_id == seller_id)
            .cloned()
            .collect();
        offers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(offers)
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.lock().await.orders.get(&id).cloned())
    }

    async fn orders_by_buyer(&self, buyer_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.lock().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.buyer_id == buyer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn order_by_payment_reference(&self, reference: &str) -> Result<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .values()
            .find(|o| o.payment_reference.as_deref() == Some(reference))
            .cloned())
    }

    async fn upsert_cart_entry(&self, entry: &CartEntry) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .cart
            .insert((entry.user_id, entry.listing_id), *entry);
        Ok(())
    }

    async fn cart_for_user(&self, user_id: UserId) -> Result<Vec<CartEntry>> {
        let state = self.state.lock().await;
        let mut entries: Vec<_> = state
            .cart
            .values()
            .filter(|e| e.user_id == user_id)
            .copied()
            .collect();
        entries.sort_by_key(|e| e.added_at);
        Ok(entries)
    }

    async fn remove_cart_entry(&self, user_id: UserId, listing_id: ListingId) -> Result<bool> {
        let mut state = self.state.lock().await;
        Ok(state.cart.remove(&(user_id, listing_id)).is_some())
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        let mut state = self.state.lock().await;
        state.notifications.push(notification.clone());
        Ok(())
    }

    async fn notifications_for_user(&self, user_id: UserId) -> Result<Vec<Notification>> {
        let state = self.state.lock().await;
        let mut notifications: Vec<_> = state
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_notification_read(&self, user_id: UserId, id: NotificationId) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        {
            Some(n) => {
                n.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn preferences(&self, user_id: UserId) -> Result<Option<NotificationPreferences>> {
        Ok(self.state.lock().await.preferences.get(&user_id).cloned())
    }

    async fn upsert_preferences(&self, prefs: &NotificationPreferences) -> Result<()> {
        let mut state = self.state.lock().await;
        state.preferences.insert(prefs.user_id, prefs.clone());
        Ok(())
    }
}

#[async_trait]
impl LedgerTx for InMemoryTx {
    async fn listings_for_update(&mut self, ids: &[ListingId]) -> Result<Vec<Listing>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.working.listings.get(id).cloned())
            .collect())
    }

    async fn reserve_listings(&mut self, ids: &[ListingId]) -> Result<u64> {
        let mut flipped = 0;
        for id in ids {
            if let Some(listing) = self.working.listings.get_mut(id)
                && listing.status == ListingStatus::Available
            {
                listing.status = ListingStatus::Sold;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        // Simulates the unique index on payment_reference.
        if let Some(reference) = &order.payment_reference
            && self
                .working
                .orders
                .values()
                .any(|o| o.payment_reference.as_deref() == Some(reference))
        {
            return Err(LedgerError::DuplicatePaymentReference(reference.clone()));
        }
        self.working.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn delete_cart_entries(&mut self, listing_ids: &[ListingId]) -> Result<u64> {
        let before = self.working.cart.len();
        self.working
            .cart
            .retain(|(_, listing_id), _| !listing_ids.contains(listing_id));
        Ok((before - self.working.cart.len()) as u64)
    }

    async fn expire_open_offers(&mut self, listing_ids: &[ListingId]) -> Result<u64> {
        let mut expired = 0;
        for offer in self.working.offers.values_mut() {
            if listing_ids.contains(&offer.listing_id) && offer.expire() {
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn commit(self) -> Result<()> {
        let InMemoryTx { mut guard, working } = self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;

    fn listing(seller: UserId, cents: i64) -> Listing {
        Listing::new(seller, "Test listing", Money::from_cents(cents), None).unwrap()
    }

    #[tokio::test]
    async fn reserve_flips_only_available_listings() {
        let store = InMemoryLedger::new();
        let seller = UserId::new();
        let a = listing(seller, 1000);
        let mut b = listing(seller, 2000);
        b.status = ListingStatus::Sold;
        store.insert_listing(&a).await.unwrap();
        store.insert_listing(&b).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let flipped = tx.reserve_listings(&[a.id, b.id]).await.unwrap();
        assert_eq!(flipped, 1);
        tx.commit().await.unwrap();

        assert_eq!(
            store.listing(a.id).await.unwrap().unwrap().status,
            ListingStatus::Sold
        );
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = InMemoryLedger::new();
        let a = listing(UserId::new(), 1000);
        store.insert_listing(&a).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            assert_eq!(tx.reserve_listings(&[a.id]).await.unwrap(), 1);
            // dropped without commit
        }

        assert_eq!(
            store.listing(a.id).await.unwrap().unwrap().status,
            ListingStatus::Available
        );
    }

    #[tokio::test]
    async fn open_offer_exclusivity() {
        let store = InMemoryLedger::new();
        let buyer = UserId::new();
        let seller = UserId::new();
        let l = listing(seller, 1000);
        store.insert_listing(&l).await.unwrap();

        let first = Offer::new(l.id, buyer, seller, Money::from_cents(800)).unwrap();
        store.insert_offer(&first).await.unwrap();

        let second = Offer::new(l.id, buyer, seller, Money::from_cents(900)).unwrap();
        let err = store.insert_offer(&second).await.unwrap_err();
        assert!(matches!(err, LedgerError::OpenOfferExists { .. }));

        // A rejected offer no longer blocks a new one.
        let mut rejected = first.clone();
        rejected.reject().unwrap();
        store
            .update_offer(&rejected, OfferStatus::Pending)
            .await
            .unwrap();
        store.insert_offer(&second).await.unwrap();
    }

    #[tokio::test]
    async fn update_offer_is_compare_and_set() {
        let store = InMemoryLedger::new();
        let buyer = UserId::new();
        let seller = UserId::new();
        let l = listing(seller, 1000);
        store.insert_listing(&l).await.unwrap();

        let mut offer = Offer::new(l.id, buyer, seller, Money::from_cents(800)).unwrap();
        store.insert_offer(&offer).await.unwrap();

        offer.accept().unwrap();
        store
            .update_offer(&offer, OfferStatus::Pending)
            .await
            .unwrap();

        // Second writer expecting the old status loses.
        let mut stale = Offer::new(l.id, UserId::new(), seller, Money::from_cents(700)).unwrap();
        stale.id = offer.id;
        let err = store
            .update_offer(&stale, OfferStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::StaleStatus { .. }));
    }

    #[tokio::test]
    async fn expire_open_offers_skips_terminal() {
        let store = InMemoryLedger::new();
        let seller = UserId::new();
        let l = listing(seller, 1000);
        store.insert_listing(&l).await.unwrap();

        let pending = Offer::new(l.id, UserId::new(), seller, Money::from_cents(800)).unwrap();
        let mut rejected = Offer::new(l.id, UserId::new(), seller, Money::from_cents(700)).unwrap();
        rejected.reject().unwrap();
        store.insert_offer(&pending).await.unwrap();
        store.insert_offer(&rejected).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let expired = tx.expire_open_offers(&[l.id]).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(expired, 1);
        assert_eq!(
            store.offer(pending.id).await.unwrap().unwrap().status,
            OfferStatus::Expired
        );
        assert_eq!(
            store.offer(rejected.id).await.unwrap().unwrap().status,
            OfferStatus::Rejected
        );
    }

    #[tokio::test]
    async fn duplicate_payment_reference_rejected_in_tx() {
        use domain::{CommissionRate, OrderItem, PriceBreakdown};
        use domain::{Address, HomeDelivery, ShippingSelection};

        let store = InMemoryLedger::new();
        let shipping = ShippingSelection::Home(HomeDelivery {
            recipient_name: "Ana".to_string(),
            phone: "099".to_string(),
            address: Address {
                street: "Calle 1".to_string(),
                city: "Montevideo".to_string(),
                region: "Montevideo".to_string(),
                postal_code: None,
            },
        });
        let pricing = PriceBreakdown::for_prices(
            [Money::from_cents(1000)].into_iter(),
            CommissionRate::default(),
        );
        let item = OrderItem {
            listing_id: ListingId::new(),
            price: Money::from_cents(1000),
        };

        let first = Order::new(
            UserId::new(),
            UserId::new(),
            pricing,
            shipping.clone(),
            vec![item],
            Some("PAY-1".to_string()),
        );
        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&first).await.unwrap();
        tx.commit().await.unwrap();

        let second = Order::new(
            UserId::new(),
            UserId::new(),
            pricing,
            shipping,
            vec![item],
            Some("PAY-1".to_string()),
        );
        let mut tx = store.begin().await.unwrap();
        let err = tx.insert_order(&second).await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicatePaymentReference(_)));
    }

    #[tokio::test]
    async fn cart_entries_deleted_for_sold_listings() {
        let store = InMemoryLedger::new();
        let l = listing(UserId::new(), 1000);
        store.insert_listing(&l).await.unwrap();

        let user_a = UserId::new();
        let user_b = UserId::new();
        store
            .upsert_cart_entry(&CartEntry::new(user_a, l.id))
            .await
            .unwrap();
        store
            .upsert_cart_entry(&CartEntry::new(user_b, l.id))
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.delete_cart_entries(&[l.id]).await.unwrap(), 2);
        tx.commit().await.unwrap();

        assert!(store.cart_for_user(user_a).await.unwrap().is_empty());
        assert!(store.cart_for_user(user_b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_notification_read_checks_owner() {
        let store = InMemoryLedger::new();
        let user = UserId::new();
        let n = Notification::new(
            user,
            domain::NotificationKind::Sale,
            "Sold",
            "Your listing sold",
            serde_json::json!({}),
            false,
        );
        store.insert_notification(&n).await.unwrap();

        assert!(!store
            .mark_notification_read(UserId::new(), n.id)
            .await
            .unwrap());
        assert!(store.mark_notification_read(user, n.id).await.unwrap());
        let stored = store.notifications_for_user(user).await.unwrap();
        assert!(stored[0].read);
    }
}
