/**
 * Registration and Login Handlers
 *
 * Passwords are hashed with bcrypt; successful login returns a JWT
 * plus the user id, which the client also uses to announce itself on
 * the event channel.
 */

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::auth::sessions::create_token;
use crate::backend::error::ApiError;
use crate::backend::server::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let email = request.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::validation("invalid email address"));
    }
    if request.password.len() < 8 {
        return Err(ApiError::validation(
            "password must be at least 8 characters",
        ));
    }

    let password_hash = bcrypt::hash(&request.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::internal(format!("password hashing failed: {}", e)))?;

    let user = state.store.create_user(&email, &password_hash).await?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            email: user.email,
        }),
    ))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = request.email.trim().to_lowercase();

    let user = state
        .store
        .user_by_email(&email)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let valid = bcrypt::verify(&request.password, &user.password_hash)
        .map_err(|e| ApiError::internal(format!("password verification failed: {}", e)))?;
    if !valid {
        tracing::warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::Unauthorized);
    }

    let token = create_token(user.id, user.email.clone())
        .map_err(|e| ApiError::internal(format!("token creation failed: {}", e)))?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
    }))
}
