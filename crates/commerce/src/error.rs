use thiserror::Error;

use common::{ListingId, OfferId};
use domain::ShippingError;
use ledger::LedgerError;

/// Errors surfaced by the offer and checkout engines.
///
/// Every variant carries a stable snake_case [`kind`](CommerceError::kind)
/// tag the boundary layer maps to a transport response. Validation and
/// authorization variants are raised before any persistence attempt;
/// conflict variants mean the caller lost a legitimate race and should
/// retry with fresh state.
#[derive(Debug, Error)]
pub enum CommerceError {
    #[error("Checkout requires at least one listing")]
    EmptyListingSet,

    #[error("Duplicate listing ids in the listing set")]
    DuplicateListingIds,

    #[error("Listing {0} not found")]
    ListingNotFound(ListingId),

    #[error("Buyers cannot purchase their own listings")]
    CannotBuyOwnListing,

    /// The listing was already sold, or a concurrent checkout won the
    /// reservation race.
    #[error("One or more listings are no longer available")]
    ListingUnavailable,

    #[error("All listings in one checkout must belong to the same seller")]
    ListingsNotSameSeller,

    #[error(transparent)]
    Shipping(#[from] ShippingError),

    #[error("Offer amount must be positive")]
    InvalidOfferAmount,

    #[error("An open offer on this listing already exists for this buyer")]
    OfferAlreadyExists,

    #[error("Sellers cannot make offers on their own listings")]
    CannotOfferOnOwnListing,

    #[error("Offer {0} not found")]
    OfferNotFound(OfferId),

    #[error("Only the listing's seller may respond to this offer")]
    NotYourOffer,

    /// The offer moved to a different status concurrently (e.g. expired by
    /// a checkout) or is already terminal.
    #[error("The offer changed state and no longer accepts this response")]
    OfferStateChanged,

    #[error("Payment {0} not found")]
    PaymentNotFound(String),

    #[error("Payment {0} is not in an approved state")]
    PaymentNotApproved(String),

    #[error("Payment {0} carries no usable purchase metadata")]
    MissingPaymentMetadata(String),

    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl CommerceError {
    /// Stable machine-readable tag for the boundary layer.
    pub fn kind(&self) -> &'static str {
        match self {
            CommerceError::EmptyListingSet => "empty_listing_set",
            CommerceError::DuplicateListingIds => "duplicate_listing_ids",
            CommerceError::ListingNotFound(_) => "listing_not_found",
            CommerceError::CannotBuyOwnListing => "cannot_buy_own_listing",
            CommerceError::ListingUnavailable => "listing_unavailable",
            CommerceError::ListingsNotSameSeller => "listings_not_same_seller",
            CommerceError::Shipping(ShippingError::UnknownAgency(_)) => "invalid_agency",
            CommerceError::Shipping(_) => "invalid_shipping_payload",
            CommerceError::InvalidOfferAmount => "invalid_offer_amount",
            CommerceError::OfferAlreadyExists => "offer_already_exists",
            CommerceError::CannotOfferOnOwnListing => "cannot_offer_on_own_listing",
            CommerceError::OfferNotFound(_) => "offer_not_found",
            CommerceError::NotYourOffer => "not_your_offer",
            CommerceError::OfferStateChanged => "offer_state_changed",
            CommerceError::PaymentNotFound(_) => "payment_not_found",
            CommerceError::PaymentNotApproved(_) => "payment_not_approved",
            CommerceError::MissingPaymentMetadata(_) => "missing_payment_metadata",
            CommerceError::PaymentGateway(_) => "payment_gateway",
            CommerceError::Ledger(_) => "ledger",
        }
    }
}

/// Result type for commerce operations.
pub type Result<T> = std::result::Result<T, CommerceError>;
