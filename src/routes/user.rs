// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account and study-time routes under `/api/user`.

use crate::db::{normalize_email, CreateUserOutcome};
use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, AuthUser};
use crate::models::api::{
    AuthResponse, LoginRequest, RegisterRequest, UpdateTimeRequest, UpdateTimeResponse,
    UserResponse,
};
use crate::models::{User, UserId, UserProfile};
use crate::services::password::{hash_password, run_blocking, verify_password};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use std::sync::Arc;
use validator::{Validate, ValidationErrors};

/// Public account routes (register, login).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/user/register", post(register))
        .route("/api/user/login", post(login))
}

/// Routes that need a session token.
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/user/user/{id}", get(get_user))
        .route("/api/user/update-time", post(update_time))
}

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// First human-readable message out of a validation failure.
fn first_validation_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid request".to_string())
}

fn issue_session(state: &AppState, user: &User) -> Result<AuthResponse> {
    let token = create_jwt(
        &user.id,
        &user.username,
        &state.config.jwt_signing_key,
        state.config.jwt_ttl_secs,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    Ok(AuthResponse {
        success: true,
        token,
        user: UserProfile::from(user),
    })
}

// ─── Registration & Login ────────────────────────────────────

async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    body.validate()
        .map_err(|e| AppError::BadRequest(first_validation_message(&e)))?;

    let email = normalize_email(&body.email);
    if state.db.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::BadRequest("User already exists".to_string()));
    }

    let password = body.password;
    let password_hash = run_blocking(move || hash_password(&password)).await?;

    let user = User {
        id: UserId::generate()?,
        username: body.username.trim().to_string(),
        email,
        password_hash,
        bonus_points: 0,
        created_at: format_utc_rfc3339(chrono::Utc::now()),
    };

    // The lookup above is only a fast path; the store re-checks atomically.
    if state.db.create_user(&user).await? == CreateUserOutcome::EmailTaken {
        return Err(AppError::BadRequest("User already exists".to_string()));
    }

    tracing::info!(user_id = %user.id, "User registered");

    Ok(Json(issue_session(&state, &user)?))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    body.validate()
        .map_err(|e| AppError::BadRequest(first_validation_message(&e)))?;

    let Some(user) = state.db.find_user_by_email(&body.email).await? else {
        tracing::debug!("Login for unknown email");
        return Err(AppError::BadRequest(INVALID_CREDENTIALS.to_string()));
    };

    let password = body.password;
    let hash = user.password_hash.clone();
    let matches = run_blocking(move || verify_password(&password, &hash)).await?;
    if !matches {
        tracing::info!(user_id = %user.id, "Login with wrong password");
        return Err(AppError::BadRequest(INVALID_CREDENTIALS.to_string()));
    }

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(issue_session(&state, &user)?))
}

// ─── Profile ─────────────────────────────────────────────────

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>> {
    let not_found = || AppError::NotFound("User not found".to_string());

    // A malformed id cannot name an account.
    let id: UserId = id.parse().map_err(|_| not_found())?;
    let user = state.db.get_user(&id).await?.ok_or_else(not_found)?;

    Ok(Json(UserResponse {
        success: true,
        user: UserProfile::from(&user),
    }))
}

// ─── Study Time ──────────────────────────────────────────────

async fn update_time(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(body): Json<UpdateTimeRequest>,
) -> Result<Json<UpdateTimeResponse>> {
    let receipt = state
        .award_service
        .award(&caller, body.user_id.as_deref())
        .await?;

    Ok(Json(UpdateTimeResponse {
        success: true,
        message: receipt.message,
        points: receipt.new_balance,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_validation_message() {
        let bad = RegisterRequest {
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "123".to_string(),
        };
        let errors = bad.validate().unwrap_err();
        assert_eq!(
            first_validation_message(&errors),
            "Password must be 6-128 characters"
        );
    }
}
