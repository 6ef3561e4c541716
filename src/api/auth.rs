//! Account endpoints and the bearer-token middleware.
//!
//! - `POST /register` creates a user with default settings
//! - `POST /login` returns an access token (1 day) and a refresh token (30 days)
//! - `POST /refresh` trades a refresh token for a new access token
//! - Every other endpoint except health requires `Authorization: Bearer <access token>`

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Extension, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use super::routes::AppState;
use super::types::{LoginRequest, RefreshRequest, RefreshResponse, TokenResponse, UserResponse};
use crate::auth::{hash_password, verify_password, AuthError, AuthUser};
use crate::store::StoreError;
use crate::user::{NewUser, User, UserPatch};

const TOKEN_TYPE: &str = "bearer";

fn internal(e: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("Request failed: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn store_error(e: StoreError) -> (StatusCode, String) {
    match e {
        StoreError::DuplicateEmail => (StatusCode::BAD_REQUEST, e.to_string()),
        other => internal(other),
    }
}

fn unauthorized(message: &str) -> (StatusCode, String) {
    (StatusCode::UNAUTHORIZED, message.to_string())
}

/// Hash off the async runtime; PBKDF2 is deliberately slow.
async fn hash_blocking(state: &AppState, password: String) -> Result<String, (StatusCode, String)> {
    let iterations = state.config.auth.password_hash_iterations;
    tokio::task::spawn_blocking(move || hash_password(&password, iterations))
        .await
        .map_err(internal)?
        .map_err(internal)
}

async fn user_response(state: &AppState, user: User) -> Result<UserResponse, (StatusCode, String)> {
    let settings = state.store.get_user_settings(user.id).await.map_err(store_error)?;
    Ok(UserResponse::new(user, settings))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewUser>,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    req.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    if state
        .store
        .get_user_by_email(&req.email)
        .await
        .map_err(store_error)?
        .is_some()
    {
        return Err(store_error(StoreError::DuplicateEmail));
    }

    let password_hash = hash_blocking(&state, req.password).await?;
    let user = state
        .store
        .create_user(User::new(&req.name, &req.email, password_hash))
        .await
        .map_err(store_error)?;

    tracing::info!(user_id = %user.id, "Registered user");
    Ok(Json(user_response(&state, user).await?))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, (StatusCode, String)> {
    let invalid = || unauthorized(&AuthError::InvalidCredentials.to_string());

    let user = state
        .store
        .get_user_by_email(&req.email)
        .await
        .map_err(store_error)?
        .ok_or_else(invalid)?;

    let stored = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&req.password, &stored))
        .await
        .map_err(internal)?;
    if !matches {
        return Err(invalid());
    }

    let access_token = state.tokens.issue_access(user.id).map_err(internal)?;
    let refresh_token = state.tokens.issue_refresh(user.id).map_err(internal)?;
    tracing::debug!(user_id = %user.id, "Issued tokens");

    Ok(Json(TokenResponse {
        access_token,
        refresh_token,
        token_type: TOKEN_TYPE.to_string(),
        user: user_response(&state, user).await?,
    }))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, (StatusCode, String)> {
    let user_id = state
        .tokens
        .verify_refresh(&req.refresh_token)
        .map_err(|e| unauthorized(&e.to_string()))?;

    let exists = state.store.get_user(user_id).await.map_err(store_error)?.is_some();
    if !exists {
        return Err(unauthorized("User no longer exists"));
    }

    let access_token = state.tokens.issue_access(user_id).map_err(internal)?;
    Ok(Json(RefreshResponse {
        access_token,
        token_type: TOKEN_TYPE.to_string(),
    }))
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    let current = state
        .store
        .get_user(user.id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "User not found".to_string()))?;
    Ok(Json(user_response(&state, current).await?))
}

pub async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    patch
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let mut current = state
        .store
        .get_user(user.id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "User not found".to_string()))?;

    if let Some(name) = patch.name {
        current.name = name.trim().to_string();
    }
    if let Some(email) = patch.email {
        current.email = email;
    }
    if let Some(password) = patch.password {
        current.password_hash = hash_blocking(&state, password).await?;
    }

    let updated = state
        .store
        .update_user(current)
        .await
        .map_err(store_error)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "User not found".to_string()))?;
    Ok(Json(user_response(&state, updated).await?))
}

/// Resolve the bearer access token to an [`AuthUser`] extension.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .unwrap_or("")
        .trim();

    if token.is_empty() {
        return (StatusCode::UNAUTHORIZED, "Missing Authorization header").into_response();
    }

    let user_id = match state.tokens.verify_access(token) {
        Ok(id) => id,
        Err(e) => {
            tracing::debug!("Rejected access token: {}", e);
            return (StatusCode::UNAUTHORIZED, "Could not validate credentials").into_response();
        }
    };

    match state.store.get_user(user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (StatusCode::UNAUTHORIZED, "Could not validate credentials").into_response();
        }
        Err(e) => return store_error(e).into_response(),
    }

    req.extensions_mut().insert(AuthUser { id: user_id });
    next.run(req).await
}
