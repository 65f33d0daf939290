//! Offer negotiation engine.

use std::sync::Arc;

use common::{ListingId, Money, OfferId, UserId};
use domain::{Offer, OfferError, OfferResponse, OfferStatus};
use ledger::{Ledger, LedgerError};
use notify::{EmailSender, NotificationDispatcher, NotificationRequest};

use crate::error::{CommerceError, Result};

/// Owns the offer lifecycle: creation, the seller's response, and the
/// read-side listings.
///
/// Authorization never trusts the seller reference denormalized onto the
/// offer row; it always re-derives ownership from the listing. Writes go
/// through the store's status compare-and-set so a concurrent checkout
/// expiry resolves to a typed conflict instead of a lost update.
pub struct OfferService<L, E> {
    ledger: Arc<L>,
    dispatcher: NotificationDispatcher<L, E>,
}

impl<L, E> OfferService<L, E>
where
    L: Ledger + 'static,
    E: EmailSender + 'static,
{
    pub fn new(ledger: Arc<L>, dispatcher: NotificationDispatcher<L, E>) -> Self {
        Self { ledger, dispatcher }
    }

    /// Creates a pending offer from `buyer` on `listing_id`.
    #[tracing::instrument(skip(self))]
    pub async fn create_offer(
        &self,
        buyer: UserId,
        listing_id: ListingId,
        amount: Money,
    ) -> Result<Offer> {
        let listing = self
            .ledger
            .listing(listing_id)
            .await?
            .ok_or(CommerceError::ListingNotFound(listing_id))?;

        if listing.is_owned_by(buyer) {
            return Err(CommerceError::CannotOfferOnOwnListing);
        }
        if !listing.status.is_available() {
            return Err(CommerceError::ListingUnavailable);
        }

        let offer = Offer::new(listing_id, buyer, listing.seller_id, amount)
            .map_err(|_| CommerceError::InvalidOfferAmount)?;

        match self.ledger.insert_offer(&offer).await {
            Ok(()) => {}
            Err(LedgerError::OpenOfferExists { .. }) => {
                return Err(CommerceError::OfferAlreadyExists);
            }
            Err(e) => return Err(e.into()),
        }

        metrics::counter!("offers_created_total").increment(1);
        tracing::info!(offer_id = %offer.id, %listing_id, "offer created");

        self.dispatcher
            .notify(NotificationRequest::offer_received(&listing, &offer))
            .await;

        Ok(offer)
    }

    /// Applies the seller's response to an offer.
    #[tracing::instrument(skip(self))]
    pub async fn respond(
        &self,
        seller: UserId,
        offer_id: OfferId,
        response: OfferResponse,
    ) -> Result<Offer> {
        let mut offer = self
            .ledger
            .offer(offer_id)
            .await?
            .ok_or(CommerceError::OfferNotFound(offer_id))?;

        let listing = self
            .ledger
            .listing(offer.listing_id)
            .await?
            .ok_or(CommerceError::ListingNotFound(offer.listing_id))?;

        if !listing.is_owned_by(seller) {
            return Err(CommerceError::NotYourOffer);
        }

        let expected = offer.status;
        offer.respond(response).map_err(|e| match e {
            OfferError::InvalidAmount(_) => CommerceError::InvalidOfferAmount,
            OfferError::InvalidTransition { .. } => CommerceError::OfferStateChanged,
        })?;

        match self.ledger.update_offer(&offer, expected).await {
            Ok(()) => {}
            Err(LedgerError::StaleStatus { .. }) => {
                return Err(CommerceError::OfferStateChanged);
            }
            Err(e) => return Err(e.into()),
        }

        metrics::counter!("offer_responses_total").increment(1);
        tracing::info!(%offer_id, status = %offer.status, "offer responded");

        match offer.status {
            OfferStatus::Accepted => {
                self.dispatcher
                    .notify(NotificationRequest::offer_accepted(&listing, &offer))
                    .await;
            }
            OfferStatus::Rejected => {
                self.dispatcher
                    .notify(NotificationRequest::offer_rejected(&listing, &offer))
                    .await;
            }
            _ => {}
        }

        Ok(offer)
    }

    /// Offers the buyer has made, newest first.
    pub async fn offers_by_buyer(&self, buyer: UserId) -> Result<Vec<Offer>> {
        Ok(self.ledger.offers_by_buyer(buyer).await?)
    }

    /// Offers the seller has received, newest first.
    pub async fn offers_by_seller(&self, seller: UserId) -> Result<Vec<Offer>> {
        Ok(self.ledger.offers_by_seller(seller).await?)
    }
}

#[cfg(test)]
mod tests {
    use domain::Listing;
    use ledger::InMemoryLedger;
    use notify::InMemoryEmailSender;

    use super::*;

    fn service() -> (Arc<InMemoryLedger>, OfferService<InMemoryLedger, InMemoryEmailSender>) {
        let ledger = Arc::new(InMemoryLedger::new());
        let dispatcher = NotificationDispatcher::new(
            Arc::clone(&ledger),
            Arc::new(InMemoryEmailSender::new()),
        );
        let offers = OfferService::new(Arc::clone(&ledger), dispatcher);
        (ledger, offers)
    }

    async fn seed_listing(ledger: &InMemoryLedger, price_cents: i64) -> Listing {
        let listing =
            Listing::new(UserId::new(), "Teclado mecánico", Money::from_cents(price_cents), None)
                .unwrap();
        ledger.insert_listing(&listing).await.unwrap();
        listing
    }

    #[tokio::test]
    async fn create_offer_notifies_the_seller() {
        let (ledger, offers) = service();
        let listing = seed_listing(&ledger, 30_000).await;
        let buyer = UserId::new();

        let offer = offers
            .create_offer(buyer, listing.id, Money::from_cents(25_000))
            .await
            .unwrap();
        assert_eq!(offer.status, OfferStatus::Pending);
        assert_eq!(offer.seller_id, listing.seller_id);

        let feed = ledger.notifications_for_user(listing.seller_id).await.unwrap();
        assert_eq!(feed.len(), 1);
    }

    #[tokio::test]
    async fn cannot_offer_on_own_listing() {
        let (ledger, offers) = service();
        let listing = seed_listing(&ledger, 30_000).await;

        let err = offers
            .create_offer(listing.seller_id, listing.id, Money::from_cents(25_000))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "cannot_offer_on_own_listing");
    }

    #[tokio::test]
    async fn second_open_offer_is_a_conflict() {
        let (ledger, offers) = service();
        let listing = seed_listing(&ledger, 30_000).await;
        let buyer = UserId::new();

        offers
            .create_offer(buyer, listing.id, Money::from_cents(25_000))
            .await
            .unwrap();
        let err = offers
            .create_offer(buyer, listing.id, Money::from_cents(26_000))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "offer_already_exists");
    }

    #[tokio::test]
    async fn only_the_listing_seller_may_respond() {
        let (ledger, offers) = service();
        let listing = seed_listing(&ledger, 30_000).await;
        let offer = offers
            .create_offer(UserId::new(), listing.id, Money::from_cents(25_000))
            .await
            .unwrap();

        let err = offers
            .respond(UserId::new(), offer.id, OfferResponse::Accept)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_your_offer");
    }

    #[tokio::test]
    async fn accept_captures_price_and_notifies_buyer() {
        let (ledger, offers) = service();
        let listing = seed_listing(&ledger, 30_000).await;
        let buyer = UserId::new();
        let offer = offers
            .create_offer(buyer, listing.id, Money::from_cents(25_000))
            .await
            .unwrap();

        let accepted = offers
            .respond(listing.seller_id, offer.id, OfferResponse::Accept)
            .await
            .unwrap();
        assert_eq!(accepted.status, OfferStatus::Accepted);
        assert_eq!(accepted.accepted_price, Some(Money::from_cents(25_000)));

        let feed = ledger.notifications_for_user(buyer).await.unwrap();
        assert_eq!(feed.len(), 1);
    }

    #[tokio::test]
    async fn responding_to_a_terminal_offer_is_a_conflict() {
        let (ledger, offers) = service();
        let listing = seed_listing(&ledger, 30_000).await;
        let offer = offers
            .create_offer(UserId::new(), listing.id, Money::from_cents(25_000))
            .await
            .unwrap();

        offers
            .respond(listing.seller_id, offer.id, OfferResponse::Reject)
            .await
            .unwrap();
        let err = offers
            .respond(listing.seller_id, offer.id, OfferResponse::Accept)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "offer_state_changed");
    }

    #[tokio::test]
    async fn counter_then_reject_flow() {
        let (ledger, offers) = service();
        let listing = seed_listing(&ledger, 30_000).await;
        let buyer = UserId::new();
        let offer = offers
            .create_offer(buyer, listing.id, Money::from_cents(25_000))
            .await
            .unwrap();

        let countered = offers
            .respond(
                listing.seller_id,
                offer.id,
                OfferResponse::Counter(Money::from_cents(28_000)),
            )
            .await
            .unwrap();
        assert_eq!(countered.status, OfferStatus::Countered);
        assert_eq!(countered.counter_amount, Some(Money::from_cents(28_000)));

        let rejected = offers
            .respond(listing.seller_id, offer.id, OfferResponse::Reject)
            .await
            .unwrap();
        assert_eq!(rejected.status, OfferStatus::Rejected);

        let mine = offers.offers_by_buyer(buyer).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].status, OfferStatus::Rejected);
    }
}
