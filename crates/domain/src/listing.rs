//! Listing availability and discount rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use common::{ListingId, Money, UserId};

/// Largest discount percentage a seller may apply.
pub const MAX_DISCOUNT_PERCENT: u8 = 90;

/// Errors raised by listing construction and mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingError {
    /// Discount percentage outside the permitted 0–90 range.
    #[error("Invalid discount percentage {0}: must be between 0 and 90")]
    InvalidDiscount(u8),

    /// Listing price must be positive.
    #[error("Invalid listing price {0}: must be positive")]
    InvalidPrice(Money),
}

/// Availability of a listing.
///
/// The only transition is `Available -> Sold`, performed exclusively by the
/// checkout reservation inside a store transaction. A sold listing never
/// returns to available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    /// The listing can be purchased and offered on.
    #[default]
    Available,

    /// The listing has been purchased (terminal state).
    Sold,
}

impl ListingStatus {
    /// Returns true if the listing can still be sold.
    pub fn is_available(&self) -> bool {
        matches!(self, ListingStatus::Available)
    }

    /// Returns the status name as stored in the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Available => "available",
            ListingStatus::Sold => "sold",
        }
    }

    /// Parses a status from its stored name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(ListingStatus::Available),
            "sold" => Some(ListingStatus::Sold),
            _ => None,
        }
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A sellable item published by a seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub seller_id: UserId,
    pub title: String,
    /// Undiscounted asking price.
    pub price: Money,
    /// Optional discount percentage (0–90).
    pub discount_percent: Option<u8>,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// Creates a new available listing, validating price and discount.
    pub fn new(
        seller_id: UserId,
        title: impl Into<String>,
        price: Money,
        discount_percent: Option<u8>,
    ) -> Result<Self, ListingError> {
        if !price.is_positive() {
            return Err(ListingError::InvalidPrice(price));
        }
        if let Some(pct) = discount_percent
            && pct > MAX_DISCOUNT_PERCENT
        {
            return Err(ListingError::InvalidDiscount(pct));
        }

        Ok(Self {
            id: ListingId::new(),
            seller_id,
            title: title.into(),
            price,
            discount_percent,
            status: ListingStatus::Available,
            created_at: Utc::now(),
        })
    }

    /// Returns the price a buyer actually pays: the asking price less any
    /// discount, rounded half-up to the cent.
    pub fn effective_price(&self) -> Money {
        match self.discount_percent {
            Some(pct) if pct > 0 => {
                let discount = self.price.percent_bps(pct as u32 * 100);
                self.price - discount
            }
            _ => self.price,
        }
    }

    /// Returns true if this listing belongs to the given user.
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.seller_id == user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(price_cents: i64, discount: Option<u8>) -> Listing {
        Listing::new(
            UserId::new(),
            "Vintage lamp",
            Money::from_cents(price_cents),
            discount,
        )
        .unwrap()
    }

    #[test]
    fn default_status_is_available() {
        assert_eq!(ListingStatus::default(), ListingStatus::Available);
        assert!(ListingStatus::Available.is_available());
        assert!(!ListingStatus::Sold.is_available());
    }

    #[test]
    fn status_parse_roundtrip() {
        assert_eq!(
            ListingStatus::parse(ListingStatus::Sold.as_str()),
            Some(ListingStatus::Sold)
        );
        assert_eq!(ListingStatus::parse("deleted"), None);
    }

    #[test]
    fn rejects_discount_over_ninety() {
        let result = Listing::new(UserId::new(), "Lamp", Money::from_cents(1000), Some(91));
        assert_eq!(result.unwrap_err(), ListingError::InvalidDiscount(91));
    }

    #[test]
    fn accepts_boundary_discounts() {
        assert!(Listing::new(UserId::new(), "Lamp", Money::from_cents(1000), Some(0)).is_ok());
        assert!(Listing::new(UserId::new(), "Lamp", Money::from_cents(1000), Some(90)).is_ok());
    }

    #[test]
    fn rejects_non_positive_price() {
        let result = Listing::new(UserId::new(), "Lamp", Money::zero(), None);
        assert!(matches!(result, Err(ListingError::InvalidPrice(_))));
    }

    #[test]
    fn effective_price_without_discount() {
        assert_eq!(listing(10_000, None).effective_price().cents(), 10_000);
        assert_eq!(listing(10_000, Some(0)).effective_price().cents(), 10_000);
    }

    #[test]
    fn effective_price_applies_discount() {
        // $100.00 at 25% off -> $75.00
        assert_eq!(listing(10_000, Some(25)).effective_price().cents(), 7_500);
        // $9.99 at 10% off -> discount $1.00 (99.9 cents rounds up) -> $8.99
        assert_eq!(listing(999, Some(10)).effective_price().cents(), 899);
    }

    #[test]
    fn ownership_check() {
        let l = listing(1000, None);
        assert!(l.is_owned_by(l.seller_id));
        assert!(!l.is_owned_by(UserId::new()));
    }
}
