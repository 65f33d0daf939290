//! Authenticated-identity extraction.
//!
//! Authentication itself is an upstream collaborator; by the time a request
//! reaches this service the gateway has resolved the caller and attached
//! their id as the `x-user-id` header. This extractor only parses it.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;
use uuid::Uuid;

use crate::error::ApiError;

/// The caller's resolved identity.
#[derive(Debug, Clone, Copy)]
pub struct AuthedUser(pub UserId);

impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let uuid = Uuid::parse_str(header).map_err(|_| ApiError::Unauthorized)?;
        Ok(AuthedUser(UserId::from_uuid(uuid)))
    }
}
