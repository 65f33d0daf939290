//! Static shipping agency directory endpoints.

use axum::Json;
use axum::extract::{Path, Query};
use domain::{Agency, AgencyDirectory};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Deserialize)]
pub struct AgencyQuery {
    pub region: Option<String>,
}

/// GET /shipping/agencies — list agencies, optionally filtered by region.
pub async fn agencies(Query(query): Query<AgencyQuery>) -> Json<Vec<&'static Agency>> {
    Json(AgencyDirectory::new().agencies(query.region.as_deref()))
}

/// GET /shipping/agencies/{id} — look up one agency.
pub async fn agency(Path(id): Path<String>) -> Result<Json<&'static Agency>, ApiError> {
    AgencyDirectory::new()
        .agency_by_id(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Agency {id} not found")))
}
