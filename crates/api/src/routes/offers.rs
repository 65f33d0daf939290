//! Offer creation, seller response, and read-side endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{ListingId, Money, OfferId};
use domain::{Offer, OfferResponse};
use ledger::Ledger;
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthedUser;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateOfferRequest {
    pub listing_id: Uuid,
    pub amount_cents: i64,
}

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RespondRequest {
    Accept,
    Reject,
    Counter { amount_cents: i64 },
}

impl From<RespondRequest> for OfferResponse {
    fn from(req: RespondRequest) -> Self {
        match req {
            RespondRequest::Accept => OfferResponse::Accept,
            RespondRequest::Reject => OfferResponse::Reject,
            RespondRequest::Counter { amount_cents } => {
                OfferResponse::Counter(Money::from_cents(amount_cents))
            }
        }
    }
}

/// POST /offers — make an offer on a listing.
#[tracing::instrument(skip(state, req))]
pub async fn create<L: Ledger + 'static>(
    State(state): State<Arc<AppState<L>>>,
    AuthedUser(buyer): AuthedUser,
    Json(req): Json<CreateOfferRequest>,
) -> Result<(StatusCode, Json<Offer>), ApiError> {
    let offer = state
        .offers
        .create_offer(
            buyer,
            ListingId::from_uuid(req.listing_id),
            Money::from_cents(req.amount_cents),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(offer)))
}

/// POST /offers/{id}/respond — accept, reject, or counter an offer.
#[tracing::instrument(skip(state, req))]
pub async fn respond<L: Ledger + 'static>(
    State(state): State<Arc<AppState<L>>>,
    AuthedUser(seller): AuthedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<Offer>, ApiError> {
    let offer = state
        .offers
        .respond(seller, OfferId::from_uuid(id), req.into())
        .await?;

    Ok(Json(offer))
}

/// GET /offers/made — offers the caller has made as a buyer.
pub async fn made<L: Ledger + 'static>(
    State(state): State<Arc<AppState<L>>>,
    AuthedUser(buyer): AuthedUser,
) -> Result<Json<Vec<Offer>>, ApiError> {
    Ok(Json(state.offers.offers_by_buyer(buyer).await?))
}

/// GET /offers/received — offers on the caller's listings.
pub async fn received<L: Ledger + 'static>(
    State(state): State<Arc<AppState<L>>>,
    AuthedUser(seller): AuthedUser,
) -> Result<Json<Vec<Offer>>, ApiError> {
    Ok(Json(state.offers.offers_by_seller(seller).await?))
}
