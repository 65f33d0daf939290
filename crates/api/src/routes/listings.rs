//! Listing publication and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{ListingId, Money};
use domain::Listing;
use ledger::Ledger;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthedUser;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateListingRequest {
    pub title: String,
    pub price_cents: i64,
    pub discount_percent: Option<u8>,
}

#[derive(Serialize)]
pub struct ListingResponse {
    #[serde(flatten)]
    pub listing: Listing,
    /// Price after any discount, what a buyer actually pays.
    pub effective_price: Money,
}

impl From<Listing> for ListingResponse {
    fn from(listing: Listing) -> Self {
        let effective_price = listing.effective_price();
        Self { listing, effective_price }
    }
}

/// POST /listings — publish a new listing.
#[tracing::instrument(skip(state, req))]
pub async fn create<L: Ledger>(
    State(state): State<Arc<AppState<L>>>,
    AuthedUser(seller): AuthedUser,
    Json(req): Json<CreateListingRequest>,
) -> Result<(StatusCode, Json<ListingResponse>), ApiError> {
    let listing = Listing::new(
        seller,
        req.title,
        Money::from_cents(req.price_cents),
        req.discount_percent,
    )?;
    state.ledger.insert_listing(&listing).await?;

    Ok((StatusCode::CREATED, Json(listing.into())))
}

/// GET /listings/{id} — fetch one listing.
pub async fn get<L: Ledger>(
    State(state): State<Arc<AppState<L>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ListingResponse>, ApiError> {
    let id = ListingId::from_uuid(id);
    let listing = state
        .ledger
        .listing(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Listing {id} not found")))?;

    Ok(Json(listing.into()))
}

/// GET /users/me/listings — the caller's own listings.
pub async fn mine<L: Ledger>(
    State(state): State<Arc<AppState<L>>>,
    AuthedUser(seller): AuthedUser,
) -> Result<Json<Vec<ListingResponse>>, ApiError> {
    let listings = state.ledger.listings_by_seller(seller).await?;
    Ok(Json(listings.into_iter().map(Into::into).collect()))
}
