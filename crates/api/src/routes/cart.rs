//! Cart endpoints.
//!
//! The cart is a convenience list only; availability is re-checked by the
//! checkout transaction, never trusted from here.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use commerce::CommerceError;
use common::ListingId;
use domain::{CartEntry, Listing};
use ledger::Ledger;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthedUser;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct AddToCartRequest {
    pub listing_id: Uuid,
}

#[derive(Serialize)]
pub struct CartItemResponse {
    pub listing: Listing,
    pub added_at: chrono::DateTime<chrono::Utc>,
}

/// POST /cart — add an available listing to the caller's cart.
#[tracing::instrument(skip(state, req))]
pub async fn add<L: Ledger>(
    State(state): State<Arc<AppState<L>>>,
    AuthedUser(user): AuthedUser,
    Json(req): Json<AddToCartRequest>,
) -> Result<StatusCode, ApiError> {
    let listing_id = ListingId::from_uuid(req.listing_id);
    let listing = state
        .ledger
        .listing(listing_id)
        .await?
        .ok_or(CommerceError::ListingNotFound(listing_id))?;

    if listing.is_owned_by(user) {
        return Err(CommerceError::CannotBuyOwnListing.into());
    }
    if !listing.status.is_available() {
        return Err(CommerceError::ListingUnavailable.into());
    }

    state
        .ledger
        .upsert_cart_entry(&CartEntry::new(user, listing_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /cart — the caller's cart with current listing state. Entries whose
/// listing disappeared are skipped.
pub async fn list<L: Ledger>(
    State(state): State<Arc<AppState<L>>>,
    AuthedUser(user): AuthedUser,
) -> Result<Json<Vec<CartItemResponse>>, ApiError> {
    let entries = state.ledger.cart_for_user(user).await?;

    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Some(listing) = state.ledger.listing(entry.listing_id).await? {
            items.push(CartItemResponse { listing, added_at: entry.added_at });
        }
    }
    Ok(Json(items))
}

/// DELETE /cart/{listing_id} — remove one entry.
pub async fn remove<L: Ledger>(
    State(state): State<Arc<AppState<L>>>,
    AuthedUser(user): AuthedUser,
    Path(listing_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let removed = state
        .ledger
        .remove_cart_entry(user, ListingId::from_uuid(listing_id))
        .await?;

    if !removed {
        return Err(ApiError::NotFound("Cart entry not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
