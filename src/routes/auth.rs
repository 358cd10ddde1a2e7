// SPDX-License-Identifier: MIT

//! Local authentication routes (register, login, logout).

use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::services::AuthResponse;
use crate::AppState;

/// Routes that do not require a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Routes that require a valid bearer token.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/logout", post(logout))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Create a new account and return a session for it.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let response = state
        .auth_service
        .register(&body.email, &body.password, &body.name)
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Authenticate with email and password.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let response = state.auth_service.login(&body.email, &body.password).await?;
    Ok(Json(response))
}

/// Stateless logout acknowledgment. The client discards its cached
/// token; nothing is invalidated server-side.
async fn logout(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: state.auth_service.logout().to_string(),
    })
}
