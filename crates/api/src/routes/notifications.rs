//! Notification feed and delivery-preference endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::NotificationId;
use domain::{Notification, NotificationPreferences};
use ledger::Ledger;
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthedUser;
use crate::error::ApiError;

/// GET /notifications — the caller's feed, newest first.
pub async fn list<L: Ledger>(
    State(state): State<Arc<AppState<L>>>,
    AuthedUser(user): AuthedUser,
) -> Result<Json<Vec<Notification>>, ApiError> {
    Ok(Json(state.ledger.notifications_for_user(user).await?))
}

/// POST /notifications/{id}/read — mark one of the caller's notifications
/// read.
pub async fn mark_read<L: Ledger>(
    State(state): State<Arc<AppState<L>>>,
    AuthedUser(user): AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let marked = state
        .ledger
        .mark_notification_read(user, NotificationId::from_uuid(id))
        .await?;

    if !marked {
        return Err(ApiError::NotFound("Notification not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /notifications/preferences — the caller's delivery preferences,
/// defaults if never saved.
pub async fn preferences<L: Ledger>(
    State(state): State<Arc<AppState<L>>>,
    AuthedUser(user): AuthedUser,
) -> Result<Json<NotificationPreferences>, ApiError> {
    let prefs = state
        .ledger
        .preferences(user)
        .await?
        .unwrap_or_else(|| NotificationPreferences::new(user));
    Ok(Json(prefs))
}

#[derive(Deserialize)]
pub struct UpdatePreferencesRequest {
    pub email_purchases: bool,
    pub email_sales: bool,
    pub email_offers: bool,
}

/// PUT /notifications/preferences — replace the caller's preferences.
pub async fn update_preferences<L: Ledger>(
    State(state): State<Arc<AppState<L>>>,
    AuthedUser(user): AuthedUser,
    Json(req): Json<UpdatePreferencesRequest>,
) -> Result<Json<NotificationPreferences>, ApiError> {
    let prefs = NotificationPreferences {
        user_id: user,
        email_purchases: req.email_purchases,
        email_sales: req.email_sales,
        email_offers: req.email_offers,
    };
    state.ledger.upsert_preferences(&prefs).await?;
    Ok(Json(prefs))
}
