use thiserror::Error;

use common::{ListingId, OfferId, UserId};
use domain::OfferStatus;

/// Errors that can occur when interacting with the ledger store.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The buyer already holds an open (pending or countered) offer on the
    /// listing. Enforced by the store so racing creates cannot slip past a
    /// read-then-write check.
    #[error("Buyer {buyer_id} already has an open offer on listing {listing_id}")]
    OpenOfferExists {
        buyer_id: UserId,
        listing_id: ListingId,
    },

    /// A conditional offer update found a different status than expected;
    /// a concurrent transaction won the race.
    #[error("Offer {offer_id} changed concurrently: expected status {expected}")]
    StaleStatus {
        offer_id: OfferId,
        expected: OfferStatus,
    },

    /// An order already references this external payment.
    #[error("An order already references payment {0}")]
    DuplicatePaymentReference(String),

    /// A stored row could not be mapped back to its domain type.
    #[error("Stored {entity} row is invalid: {detail}")]
    InvalidRow {
        entity: &'static str,
        detail: String,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
