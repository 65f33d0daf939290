//! Checkout and order read endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{ListingId, OrderId};
use domain::{Order, ShippingSelection};
use ledger::Ledger;
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthedUser;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub listing_ids: Vec<Uuid>,
    pub shipping: ShippingSelection,
}

/// POST /orders — purchase one or more listings from a single seller.
#[tracing::instrument(skip(state, req))]
pub async fn create<L: Ledger + 'static>(
    State(state): State<Arc<AppState<L>>>,
    AuthedUser(buyer): AuthedUser,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let listing_ids = req.listing_ids.into_iter().map(ListingId::from_uuid).collect();
    let order = state
        .checkout
        .create_order(buyer, listing_ids, req.shipping)
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders/{id} — fetch one order; visible only to its buyer or seller.
pub async fn get<L: Ledger>(
    State(state): State<Arc<AppState<L>>>,
    AuthedUser(caller): AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    let id = OrderId::from_uuid(id);
    let order = state
        .ledger
        .order(id)
        .await?
        .filter(|o| o.buyer_id == caller || o.seller_id == caller)
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(order))
}

/// GET /orders — the caller's purchases, newest first.
pub async fn list<L: Ledger>(
    State(state): State<Arc<AppState<L>>>,
    AuthedUser(buyer): AuthedUser,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.ledger.orders_by_buyer(buyer).await?))
}
