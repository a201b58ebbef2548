//! Token endpoints for the JSON API
//!
//! ```text
//! POST /api/token/          {"username", "password"} -> {"access", "refresh"}
//! POST /api/token/refresh/  {"refresh"}              -> {"access"}
//! ```
//!
//! Access tokens last 60 minutes and refresh tokens one day.

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult},
};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use taskgate_shared::{
    auth::{
        jwt::{self, Claims, TokenType},
        password,
    },
    models::user::User,
};
use validator::Validate;

const BAD_CREDENTIALS: &str = "No active account found with the given credentials";

#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub username: String,

    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessToken {
    pub access: String,
}

/// Exchanges a username and password for an access/refresh pair
///
/// # Errors
///
/// - 422 if either field is blank
/// - 401 if the credentials don't match an account
pub async fn obtain_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> ApiResult<Json<TokenPair>> {
    req.validate()
        .map_err(|e| ApiError::ValidationError(validation_details(&e)))?;

    let user = User::find_by_username(&state.db, &req.username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(BAD_CREDENTIALS.to_string()))?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::info!(username = %req.username, "API token request with wrong password");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let access = jwt::create_token(&Claims::new(user.id, TokenType::Access), state.jwt_secret())?;
    let refresh = jwt::create_token(&Claims::new(user.id, TokenType::Refresh), state.jwt_secret())?;

    tracing::info!(user_id = %user.id, "API tokens issued");

    Ok(Json(TokenPair { access, refresh }))
}

/// Issues a new access token from a refresh token
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<AccessToken>> {
    let access = jwt::refresh_access_token(&req.refresh, state.jwt_secret())?;

    Ok(Json(AccessToken { access }))
}
