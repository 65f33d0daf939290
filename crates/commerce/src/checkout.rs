//! Checkout orchestrator.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use common::{ListingId, UserId};
use domain::{
    AgencyDirectory, CommissionRate, Listing, Order, OrderItem, PriceBreakdown, ShippingSelection,
};
use ledger::{Ledger, LedgerError, LedgerTx};
use notify::{EmailSender, NotificationDispatcher, NotificationRequest};

use crate::availability;
use crate::error::{CommerceError, Result};
use crate::services::{PaymentGateway, PaymentIntent, PaymentMetadata, PaymentStatus};

/// Composes listing reservation, pricing, shipping validation, and order
/// persistence into one atomic unit, and reconciles asynchronous external
/// payment confirmations idempotently.
///
/// There is no application-level lock serializing checkouts: the store
/// transaction plus the conditional reservation update are the whole
/// mutual-exclusion story. Two racing checkouts on the same listing both
/// attempt the flip; exactly one commits, the other aborts with
/// `listing_unavailable`.
pub struct CheckoutService<L, G, E> {
    ledger: Arc<L>,
    gateway: Arc<G>,
    dispatcher: NotificationDispatcher<L, E>,
    commission: CommissionRate,
    agencies: AgencyDirectory,
}

impl<L, G, E> CheckoutService<L, G, E>
where
    L: Ledger + 'static,
    G: PaymentGateway,
    E: EmailSender + 'static,
{
    pub fn new(
        ledger: Arc<L>,
        gateway: Arc<G>,
        dispatcher: NotificationDispatcher<L, E>,
        commission: CommissionRate,
    ) -> Self {
        Self {
            ledger,
            gateway,
            dispatcher,
            commission,
            agencies: AgencyDirectory,
        }
    }

    /// Direct purchase of one or more listings from a single seller.
    #[tracing::instrument(skip(self, shipping))]
    pub async fn create_order(
        &self,
        buyer: UserId,
        listing_ids: Vec<ListingId>,
        shipping: ShippingSelection,
    ) -> Result<Order> {
        validate_listing_set(&listing_ids)?;
        shipping.validate(&self.agencies)?;

        let order = self.place_order(buyer, &listing_ids, shipping, None).await?;
        self.fan_out(&order).await;
        Ok(order)
    }

    /// Validates and prices a purchase, then creates a hosted-checkout
    /// preference at the payment gateway carrying the purchase metadata.
    /// Nothing is reserved or persisted; the sale happens on confirmation.
    #[tracing::instrument(skip(self, shipping))]
    pub async fn create_payment_intent(
        &self,
        buyer: UserId,
        listing_ids: Vec<ListingId>,
        shipping: ShippingSelection,
    ) -> Result<PaymentIntent> {
        validate_listing_set(&listing_ids)?;
        shipping.validate(&self.agencies)?;

        let rows = self.ledger.listings(&listing_ids).await?;
        let listings = validate_listing_rows(buyer, &listing_ids, rows)?;
        let pricing =
            PriceBreakdown::for_prices(listings.iter().map(Listing::effective_price), self.commission);

        let external_reference = Uuid::new_v4().to_string();
        let intent = self
            .gateway
            .create_preference(
                pricing.total,
                &external_reference,
                PaymentMetadata { listing_ids, shipping },
            )
            .await?;

        metrics::counter!("payment_intents_created_total").increment(1);
        Ok(intent)
    }

    /// Reconciles an asynchronous external payment confirmation.
    ///
    /// Idempotent: the payment id is stored on the order as a unique
    /// payment reference, so a retried confirmation returns the order the
    /// first confirmation created instead of selling anything twice.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_payment(&self, buyer: UserId, payment_id: &str) -> Result<Order> {
        let payment = self
            .gateway
            .payment(payment_id)
            .await?
            .ok_or_else(|| CommerceError::PaymentNotFound(payment_id.to_string()))?;

        if payment.status != PaymentStatus::Approved {
            return Err(CommerceError::PaymentNotApproved(payment_id.to_string()));
        }

        let metadata = payment
            .metadata
            .filter(|m| !m.listing_ids.is_empty())
            .ok_or_else(|| CommerceError::MissingPaymentMetadata(payment_id.to_string()))?;

        // A repeat confirmation finds the already-created order here.
        if let Some(existing) = self.ledger.order_by_payment_reference(payment_id).await? {
            tracing::info!(payment_id, order_id = %existing.id, "payment already confirmed");
            return Ok(existing);
        }

        validate_listing_set(&metadata.listing_ids)?;
        metadata.shipping.validate(&self.agencies)?;

        let placed = self
            .place_order(
                buyer,
                &metadata.listing_ids,
                metadata.shipping,
                Some(payment_id.to_string()),
            )
            .await;

        let order = match placed {
            Ok(order) => order,
            // Losing the reservation or the unique payment reference to a
            // concurrent confirmation of the same payment is still success:
            // return the winner's committed order.
            Err(
                CommerceError::ListingUnavailable
                | CommerceError::Ledger(LedgerError::DuplicatePaymentReference(_)),
            ) => {
                if let Some(existing) = self.ledger.order_by_payment_reference(payment_id).await? {
                    return Ok(existing);
                }
                return Err(CommerceError::ListingUnavailable);
            }
            Err(e) => return Err(e),
        };

        self.fan_out(&order).await;
        Ok(order)
    }

    /// The atomic portion shared by both entry points: validate the
    /// listing rows, price, reserve, persist, clean up carts, expire
    /// offers, commit.
    async fn place_order(
        &self,
        buyer: UserId,
        listing_ids: &[ListingId],
        shipping: ShippingSelection,
        payment_reference: Option<String>,
    ) -> Result<Order> {
        let mut tx = self.ledger.begin().await?;

        let rows = tx.listings_for_update(listing_ids).await?;
        let listings = validate_listing_rows(buyer, listing_ids, rows)?;
        let seller = listings[0].seller_id;

        let pricing =
            PriceBreakdown::for_prices(listings.iter().map(Listing::effective_price), self.commission);
        let items = listings
            .iter()
            .map(|l| OrderItem { listing_id: l.id, price: l.effective_price() })
            .collect();

        availability::reserve(&mut tx, listing_ids).await?;

        let order = Order::new(buyer, seller, pricing, shipping, items, payment_reference);
        tx.insert_order(&order).await?;
        tx.delete_cart_entries(listing_ids).await?;
        let expired = tx.expire_open_offers(listing_ids).await?;
        tx.commit().await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %order.id,
            listings = listing_ids.len(),
            expired_offers = expired,
            total = %order.total,
            "order placed"
        );

        Ok(order)
    }

    /// Post-commit best-effort fan-out: one buyer notification, one seller
    /// notification per listing (not merged, each carries its own listing
    /// context).
    async fn fan_out(&self, order: &Order) {
        let mut requests = vec![NotificationRequest::purchase_confirmed(order)];
        for item in &order.items {
            match self.ledger.listing(item.listing_id).await {
                Ok(Some(listing)) => {
                    requests.push(NotificationRequest::sale_made(order, &listing));
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(listing_id = %item.listing_id, %error,
                        "Skipping sale notification, listing lookup failed");
                }
            }
        }
        self.dispatcher.notify_all(requests).await;
    }
}

fn validate_listing_set(listing_ids: &[ListingId]) -> Result<()> {
    if listing_ids.is_empty() {
        return Err(CommerceError::EmptyListingSet);
    }
    let unique: HashSet<_> = listing_ids.iter().collect();
    if unique.len() != listing_ids.len() {
        return Err(CommerceError::DuplicateListingIds);
    }
    Ok(())
}

/// Checks the fetched rows against the request: every id present, none
/// owned by the buyer, all available, exactly one seller. Returns the
/// listings in request order.
fn validate_listing_rows(
    buyer: UserId,
    listing_ids: &[ListingId],
    rows: Vec<Listing>,
) -> Result<Vec<Listing>> {
    let mut by_id: std::collections::HashMap<ListingId, Listing> =
        rows.into_iter().map(|l| (l.id, l)).collect();

    let mut listings = Vec::with_capacity(listing_ids.len());
    for id in listing_ids {
        let listing = by_id
            .remove(id)
            .ok_or(CommerceError::ListingNotFound(*id))?;
        listings.push(listing);
    }

    if listings.iter().any(|l| l.is_owned_by(buyer)) {
        return Err(CommerceError::CannotBuyOwnListing);
    }
    if listings.iter().any(|l| !l.status.is_available()) {
        return Err(CommerceError::ListingUnavailable);
    }
    let seller = listings[0].seller_id;
    if listings.iter().any(|l| l.seller_id != seller) {
        return Err(CommerceError::ListingsNotSameSeller);
    }

    Ok(listings)
}

#[cfg(test)]
mod tests {
    use common::Money;
    use domain::ListingStatus;

    use super::*;

    fn listing(seller: UserId, cents: i64) -> Listing {
        Listing::new(seller, "Bicicleta", Money::from_cents(cents), None).unwrap()
    }

    #[test]
    fn empty_and_duplicate_sets_rejected() {
        assert!(matches!(
            validate_listing_set(&[]),
            Err(CommerceError::EmptyListingSet)
        ));

        let id = ListingId::new();
        assert!(matches!(
            validate_listing_set(&[id, id]),
            Err(CommerceError::DuplicateListingIds)
        ));
        assert!(validate_listing_set(&[id, ListingId::new()]).is_ok());
    }

    #[test]
    fn rows_must_cover_every_requested_id() {
        let seller = UserId::new();
        let a = listing(seller, 1_000);
        let missing = ListingId::new();

        let err = validate_listing_rows(UserId::new(), &[a.id, missing], vec![a]).unwrap_err();
        assert!(matches!(err, CommerceError::ListingNotFound(id) if id == missing));
    }

    #[test]
    fn own_listing_rejected() {
        let buyer = UserId::new();
        let a = listing(buyer, 1_000);
        let err = validate_listing_rows(buyer, &[a.id], vec![a]).unwrap_err();
        assert!(matches!(err, CommerceError::CannotBuyOwnListing));
    }

    #[test]
    fn sold_listing_rejected() {
        let mut a = listing(UserId::new(), 1_000);
        a.status = ListingStatus::Sold;
        let err = validate_listing_rows(UserId::new(), &[a.id], vec![a]).unwrap_err();
        assert!(matches!(err, CommerceError::ListingUnavailable));
    }

    #[test]
    fn mixed_sellers_rejected() {
        let a = listing(UserId::new(), 1_000);
        let b = listing(UserId::new(), 2_000);
        let err =
            validate_listing_rows(UserId::new(), &[a.id, b.id], vec![a, b]).unwrap_err();
        assert!(matches!(err, CommerceError::ListingsNotSameSeller));
    }

    #[test]
    fn valid_rows_returned_in_request_order() {
        let seller = UserId::new();
        let a = listing(seller, 1_000);
        let b = listing(seller, 2_000);

        // Rows arrive in store order, not request order
        let ordered =
            validate_listing_rows(UserId::new(), &[b.id, a.id], vec![a.clone(), b.clone()])
                .unwrap();
        assert_eq!(ordered[0].id, b.id);
        assert_eq!(ordered[1].id, a.id);
    }
}
