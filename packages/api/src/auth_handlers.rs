// ABOUTME: HTTP request handlers for registration and login
// ABOUTME: Issues bearer tokens for valid credentials

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use trellis_users::{User, UserCreateInput};

use crate::response::{ApiError, ApiResponse};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Register a new account and sign it in
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Registering user: {}", request.email);

    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let password_hash = trellis_auth::hash_password(&request.password)?;

    let user = state
        .users
        .create(UserCreateInput {
            email: request.email,
            name: request.name,
            password_hash,
        })
        .await?;

    let token = trellis_auth::create_token(&user.id, &user.email, &state.jwt_secret)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(AuthResponse { token, user })),
    ))
}

/// Exchange credentials for a bearer token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Login attempt: {}", request.email);

    let user = state
        .users
        .find_by_email(&request.email)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(ApiError::unauthorized)?;

    if !trellis_auth::verify_password(&request.password, &user.password_hash)? {
        return Err(ApiError::unauthorized());
    }

    let token = trellis_auth::create_token(&user.id, &user.email, &state.jwt_secret)?;

    Ok(Json(ApiResponse::success(AuthResponse { token, user })))
}
