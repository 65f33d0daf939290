//! Hosted-checkout preference and payment confirmation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use commerce::PaymentIntent;
use common::ListingId;
use domain::{Order, ShippingSelection};
use ledger::Ledger;
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthedUser;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct PreferenceRequest {
    pub listing_ids: Vec<Uuid>,
    pub shipping: ShippingSelection,
}

/// POST /payments/preference — create a hosted-checkout preference at the
/// payment gateway. Nothing is reserved until the payment is confirmed.
#[tracing::instrument(skip(state, req))]
pub async fn create_preference<L: Ledger + 'static>(
    State(state): State<Arc<AppState<L>>>,
    AuthedUser(buyer): AuthedUser,
    Json(req): Json<PreferenceRequest>,
) -> Result<(StatusCode, Json<PaymentIntent>), ApiError> {
    let listing_ids = req.listing_ids.into_iter().map(ListingId::from_uuid).collect();
    let intent = state
        .checkout
        .create_payment_intent(buyer, listing_ids, req.shipping)
        .await?;

    Ok((StatusCode::CREATED, Json(intent)))
}

/// POST /payments/{id}/confirm — reconcile an external payment
/// confirmation. Idempotent: retries return the already-created order.
#[tracing::instrument(skip(state))]
pub async fn confirm<L: Ledger + 'static>(
    State(state): State<Arc<AppState<L>>>,
    AuthedUser(buyer): AuthedUser,
    Path(payment_id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order = state.checkout.confirm_payment(buyer, &payment_id).await?;
    Ok(Json(order))
}
