// ABOUTME: Authentication context for API requests
// ABOUTME: Bearer-token extractor that loads the active user for handlers

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

use trellis_users::User;

use crate::response::ApiError;
use crate::state::AppState;

/// Current authenticated user, resolved from the Authorization header
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(ApiError::unauthorized)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(ApiError::unauthorized)?;

        let claims = trellis_auth::decode_token(token, &state.jwt_secret)
            .map_err(|_| ApiError::unauthorized())?;

        // Deactivated accounts lose access even with a live token
        let user = state
            .user_storage
            .get_active_user(&claims.sub)
            .await
            .map_err(|_| ApiError::unauthorized())?;

        debug!("Authenticated user: {}", user.id);

        Ok(CurrentUser(user))
    }
}
