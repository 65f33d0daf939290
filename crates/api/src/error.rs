//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use commerce::CommerceError;
use domain::ListingError;
use ledger::LedgerError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or malformed identity context.
    Unauthorized,
    /// Commerce engine error, mapped by its kind tag.
    Commerce(CommerceError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Missing or invalid x-user-id header".to_string(),
            ),
            ApiError::Commerce(err) => {
                let (status, kind) = commerce_status(&err);
                (status, kind, err.to_string())
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
            }
        };

        let body = serde_json::json!({ "kind": kind, "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn commerce_status(err: &CommerceError) -> (StatusCode, &'static str) {
    let kind = err.kind();
    let status = match err {
        CommerceError::ListingNotFound(_)
        | CommerceError::OfferNotFound(_)
        | CommerceError::PaymentNotFound(_) => StatusCode::NOT_FOUND,

        CommerceError::ListingUnavailable
        | CommerceError::OfferAlreadyExists
        | CommerceError::OfferStateChanged => StatusCode::CONFLICT,

        CommerceError::NotYourOffer
        | CommerceError::CannotBuyOwnListing
        | CommerceError::CannotOfferOnOwnListing => StatusCode::FORBIDDEN,

        CommerceError::PaymentGateway(_) => StatusCode::BAD_GATEWAY,

        CommerceError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,

        CommerceError::EmptyListingSet
        | CommerceError::DuplicateListingIds
        | CommerceError::ListingsNotSameSeller
        | CommerceError::Shipping(_)
        | CommerceError::InvalidOfferAmount
        | CommerceError::PaymentNotApproved(_)
        | CommerceError::MissingPaymentMetadata(_) => StatusCode::BAD_REQUEST,
    };
    (status, kind)
}

impl From<CommerceError> for ApiError {
    fn from(err: CommerceError) -> Self {
        ApiError::Commerce(err)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Commerce(CommerceError::Ledger(err))
    }
}

impl From<ListingError> for ApiError {
    fn from(err: ListingError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
