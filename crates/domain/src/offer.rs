//! Offer negotiation state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use common::{ListingId, Money, OfferId, UserId};

/// Errors raised by offer transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OfferError {
    /// The requested transition is not permitted from the current status.
    #[error("Invalid offer transition from {from} to {to}")]
    InvalidTransition {
        from: OfferStatus,
        to: OfferStatus,
    },

    /// Offer and counter amounts must be positive.
    #[error("Invalid offer amount {0}: must be positive")]
    InvalidAmount(Money),
}

/// The state of an offer in its lifecycle.
///
/// State transitions (seller responses, plus expiry when the listing sells):
/// ```text
/// Pending ──┬──► Accepted ───────────┐
///           ├──► Countered ──► Rejected
///           │         │
///           ├──► Rejected            │
///           └──────────┴─────────────┴──► Expired
/// ```
/// `Accepted`, `Rejected`, and `Expired` accept no further seller response;
/// `Accepted` can still expire when the listing sells through another
/// channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStatus {
    /// Awaiting the seller's response.
    #[default]
    Pending,

    /// Seller accepted the proposed amount (terminal for responses).
    Accepted,

    /// Seller rejected the offer (terminal).
    Rejected,

    /// Seller proposed a different amount; awaiting the buyer.
    Countered,

    /// The listing sold before the negotiation concluded (terminal).
    Expired,
}

impl OfferStatus {
    /// Returns true if the offer still blocks a new offer from the same
    /// buyer on the same listing.
    pub fn is_open(&self) -> bool {
        matches!(self, OfferStatus::Pending | OfferStatus::Countered)
    }

    /// Returns true if no seller response is accepted from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OfferStatus::Accepted | OfferStatus::Rejected | OfferStatus::Expired
        )
    }

    /// Returns true if a sale of the listing expires an offer in this
    /// status.
    pub fn can_expire(&self) -> bool {
        matches!(
            self,
            OfferStatus::Pending | OfferStatus::Countered | OfferStatus::Accepted
        )
    }

    /// Returns the status name as stored in the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Pending => "PENDING",
            OfferStatus::Accepted => "ACCEPTED",
            OfferStatus::Rejected => "REJECTED",
            OfferStatus::Countered => "COUNTERED",
            OfferStatus::Expired => "EXPIRED",
        }
    }

    /// Parses a status from its stored name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(OfferStatus::Pending),
            "ACCEPTED" => Some(OfferStatus::Accepted),
            "REJECTED" => Some(OfferStatus::Rejected),
            "COUNTERED" => Some(OfferStatus::Countered),
            "EXPIRED" => Some(OfferStatus::Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A seller's response to an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferResponse {
    Accept,
    Reject,
    Counter(Money),
}

/// A buyer's price proposal against one listing.
///
/// `seller_id` is denormalized from the listing at creation time for query
/// convenience only; authorization always re-derives the seller from the
/// listing itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub listing_id: ListingId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub amount: Money,
    pub counter_amount: Option<Money>,
    /// Set only while the offer is `Accepted`; cleared on expiry.
    pub accepted_price: Option<Money>,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
}

impl Offer {
    /// Creates a new pending offer.
    pub fn new(
        listing_id: ListingId,
        buyer_id: UserId,
        seller_id: UserId,
        amount: Money,
    ) -> Result<Self, OfferError> {
        if !amount.is_positive() {
            return Err(OfferError::InvalidAmount(amount));
        }

        Ok(Self {
            id: OfferId::new(),
            listing_id,
            buyer_id,
            seller_id,
            amount,
            counter_amount: None,
            accepted_price: None,
            status: OfferStatus::Pending,
            created_at: Utc::now(),
        })
    }

    /// Applies a seller response, enforcing the transition rules.
    pub fn respond(&mut self, response: OfferResponse) -> Result<(), OfferError> {
        match response {
            OfferResponse::Accept => self.accept(),
            OfferResponse::Reject => self.reject(),
            OfferResponse::Counter(amount) => self.counter(amount),
        }
    }

    /// Pending -> Accepted, capturing the accepted price.
    pub fn accept(&mut self) -> Result<(), OfferError> {
        if self.status != OfferStatus::Pending {
            return Err(OfferError::InvalidTransition {
                from: self.status,
                to: OfferStatus::Accepted,
            });
        }
        self.status = OfferStatus::Accepted;
        self.accepted_price = Some(self.amount);
        Ok(())
    }

    /// Pending | Countered -> Rejected.
    pub fn reject(&mut self) -> Result<(), OfferError> {
        if !self.status.is_open() {
            return Err(OfferError::InvalidTransition {
                from: self.status,
                to: OfferStatus::Rejected,
            });
        }
        self.status = OfferStatus::Rejected;
        Ok(())
    }

    /// Pending -> Countered with the seller's counter amount.
    pub fn counter(&mut self, amount: Money) -> Result<(), OfferError> {
        if !amount.is_positive() {
            return Err(OfferError::InvalidAmount(amount));
        }
        if self.status != OfferStatus::Pending {
            return Err(OfferError::InvalidTransition {
                from: self.status,
                to: OfferStatus::Countered,
            });
        }
        self.status = OfferStatus::Countered;
        self.counter_amount = Some(amount);
        Ok(())
    }

    /// Expires the offer because its listing sold.
    ///
    /// Clears any captured accepted price. Returns false (a no-op, not an
    /// error) when the offer is already rejected or expired, so bulk expiry
    /// can race with seller responses safely.
    pub fn expire(&mut self) -> bool {
        if !self.status.can_expire() {
            return false;
        }
        self.status = OfferStatus::Expired;
        self.accepted_price = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_offer(amount_cents: i64) -> Offer {
        Offer::new(
            ListingId::new(),
            UserId::new(),
            UserId::new(),
            Money::from_cents(amount_cents),
        )
        .unwrap()
    }

    #[test]
    fn open_and_terminal_states() {
        assert!(OfferStatus::Pending.is_open());
        assert!(OfferStatus::Countered.is_open());
        assert!(!OfferStatus::Accepted.is_open());

        assert!(OfferStatus::Accepted.is_terminal());
        assert!(OfferStatus::Rejected.is_terminal());
        assert!(OfferStatus::Expired.is_terminal());
        assert!(!OfferStatus::Pending.is_terminal());
        assert!(!OfferStatus::Countered.is_terminal());
    }

    #[test]
    fn expirable_states() {
        assert!(OfferStatus::Pending.can_expire());
        assert!(OfferStatus::Countered.can_expire());
        assert!(OfferStatus::Accepted.can_expire());
        assert!(!OfferStatus::Rejected.can_expire());
        assert!(!OfferStatus::Expired.can_expire());
    }

    #[test]
    fn status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&OfferStatus::Countered).unwrap();
        assert_eq!(json, "\"COUNTERED\"");
    }

    #[test]
    fn rejects_non_positive_amount() {
        let result = Offer::new(ListingId::new(), UserId::new(), UserId::new(), Money::zero());
        assert!(matches!(result, Err(OfferError::InvalidAmount(_))));
    }

    #[test]
    fn accept_captures_price() {
        let mut offer = pending_offer(8_000);
        offer.accept().unwrap();
        assert_eq!(offer.status, OfferStatus::Accepted);
        assert_eq!(offer.accepted_price, Some(Money::from_cents(8_000)));
    }

    #[test]
    fn counter_records_amount() {
        let mut offer = pending_offer(8_000);
        offer.counter(Money::from_cents(9_000)).unwrap();
        assert_eq!(offer.status, OfferStatus::Countered);
        assert_eq!(offer.counter_amount, Some(Money::from_cents(9_000)));
        assert_eq!(offer.accepted_price, None);
    }

    #[test]
    fn reject_from_pending_and_countered() {
        let mut offer = pending_offer(8_000);
        offer.reject().unwrap();
        assert_eq!(offer.status, OfferStatus::Rejected);

        let mut offer = pending_offer(8_000);
        offer.counter(Money::from_cents(9_000)).unwrap();
        offer.reject().unwrap();
        assert_eq!(offer.status, OfferStatus::Rejected);
    }

    #[test]
    fn countered_offer_cannot_be_accepted() {
        let mut offer = pending_offer(8_000);
        offer.counter(Money::from_cents(9_000)).unwrap();
        let err = offer.accept().unwrap_err();
        assert_eq!(
            err,
            OfferError::InvalidTransition {
                from: OfferStatus::Countered,
                to: OfferStatus::Accepted,
            }
        );
    }

    #[test]
    fn terminal_states_are_immutable() {
        for terminal in [OfferStatus::Accepted, OfferStatus::Rejected, OfferStatus::Expired] {
            let mut offer = pending_offer(8_000);
            offer.status = terminal;
            assert!(offer.respond(OfferResponse::Accept).is_err());
            assert!(offer.respond(OfferResponse::Reject).is_err());
            assert!(
                offer
                    .respond(OfferResponse::Counter(Money::from_cents(100)))
                    .is_err()
            );
            assert_eq!(offer.status, terminal);
        }
    }

    #[test]
    fn expire_clears_accepted_price() {
        let mut offer = pending_offer(8_000);
        offer.accept().unwrap();
        assert!(offer.expire());
        assert_eq!(offer.status, OfferStatus::Expired);
        assert_eq!(offer.accepted_price, None);
    }

    #[test]
    fn expire_keeps_counter_amount() {
        let mut offer = pending_offer(8_000);
        offer.counter(Money::from_cents(9_000)).unwrap();
        assert!(offer.expire());
        assert_eq!(offer.status, OfferStatus::Expired);
        assert_eq!(offer.counter_amount, Some(Money::from_cents(9_000)));
        assert_eq!(offer.accepted_price, None);
    }

    #[test]
    fn expire_is_noop_on_rejected_and_expired() {
        let mut offer = pending_offer(8_000);
        offer.reject().unwrap();
        assert!(!offer.expire());
        assert_eq!(offer.status, OfferStatus::Rejected);

        let mut offer = pending_offer(8_000);
        assert!(offer.expire());
        assert!(!offer.expire());
    }

    #[test]
    fn counter_rejects_non_positive_amount() {
        let mut offer = pending_offer(8_000);
        assert!(matches!(
            offer.counter(Money::zero()),
            Err(OfferError::InvalidAmount(_))
        ));
        assert_eq!(offer.status, OfferStatus::Pending);
    }
}
