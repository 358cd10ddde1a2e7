// SPDX-License-Identifier: MIT

//! Gmail OAuth and mailbox routes.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{EmailAnalysis, EmailSummary};
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// All mailbox routes require a session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/email/auth/gmail/url", get(gmail_auth_url))
        .route("/email/auth/gmail/callback", get(gmail_callback))
        .route("/email/emails/unread", get(unread))
        .route("/email/emails/{id}/analyze", get(analyze))
        .route("/email/emails/{id}/read", post(mark_read))
        .route("/email/emails/send", post(send))
}

#[derive(Debug, Serialize)]
struct UrlResponse {
    url: String,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

/// Build the Gmail consent URL with a signed anti-CSRF state bound to
/// the requesting user.
async fn gmail_auth_url(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<UrlResponse>> {
    let oauth_state = sign_state(&auth_user.user_id, &state.config.oauth_state_key)?;
    let url = state.gmail_service.consent_url(&oauth_state);

    tracing::info!(user_id = %auth_user.user_id, "Gmail consent URL issued");

    Ok(Json(UrlResponse { url }))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// 302 Found redirect (`axum::response::Redirect` only offers 303/307/308).
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// OAuth callback: verify state, exchange the code, persist the tokens
/// on the user record, then send the browser back to the dashboard.
///
/// Exchange and state failures are not fatal; they redirect with an
/// error query parameter the frontend can display.
async fn gmail_callback(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let dashboard = format!("{}/dashboard", state.config.frontend_url);
    let failure = format!("{}?error=gmail_auth_failed", dashboard);

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        return found(&failure);
    }

    // The state must verify and must have been issued to this user.
    let state_user = params
        .state
        .as_deref()
        .and_then(|s| verify_state(s, &state.config.oauth_state_key));
    if state_user.as_deref() != Some(auth_user.user_id.as_str()) {
        tracing::warn!("Invalid or tampered OAuth state parameter");
        return found(&failure);
    }

    let code = match params.code {
        Some(code) => code,
        None => return found(&failure),
    };

    match state
        .gmail_service
        .authorize_user(&auth_user.user_id, &code)
        .await
    {
        Ok(()) => {
            tracing::info!(user_id = %auth_user.user_id, "Gmail authorization completed");
            found(&dashboard)
        }
        Err(e) => {
            tracing::error!(error = %e, "Gmail authorization failed");
            found(&failure)
        }
    }
}

/// List unread messages.
async fn unread(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<Vec<EmailSummary>>> {
    let emails = state.gmail_service.list_unread(&auth_user.user_id).await?;
    Ok(Json(emails))
}

/// Analyze a single message.
async fn analyze(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<EmailAnalysis>> {
    let analysis = state.gmail_service.analyze(&auth_user.user_id, &id).await?;
    Ok(Json(analysis))
}

/// Mark a message as read.
async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.gmail_service.mark_read(&auth_user.user_id, &id).await?;
    Ok(Json(MessageResponse {
        message: "Email marqué comme lu".to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub to: String,
    pub subject: String,
    pub content: String,
}

/// Send a plain-text reply.
async fn send(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<SendRequest>,
) -> Result<Json<MessageResponse>> {
    state
        .gmail_service
        .send(&auth_user.user_id, &body.to, &body.subject, &body.content)
        .await?;

    Ok(Json(MessageResponse {
        message: "Réponse envoyée avec succès".to_string(),
    }))
}

// ─── OAuth State Signing ─────────────────────────────────────────────────────

/// Sign an OAuth state carrying the user id and a timestamp:
/// base64url("user_id|timestamp_hex|signature_hex").
fn sign_state(user_id: &str, secret: &[u8]) -> Result<String> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    let payload = format!("{}|{:x}", user_id, timestamp);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature).as_bytes()))
}

/// Verify the state signature and return the embedded user id.
fn verify_state(state: &str, secret: &[u8]) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }

    let user_id = parts[0];
    let timestamp_hex = parts[1];
    let signature_hex = parts[2];

    let payload = format!("{}|{}", user_id, timestamp_hex);

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if signature_hex != expected_signature {
        tracing::error!("OAuth state signature mismatch");
        return None;
    }

    Some(user_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_sign_verify_roundtrip() {
        let secret = b"secret_key";
        let state = sign_state("user-42", secret).unwrap();
        assert_eq!(verify_state(&state, secret), Some("user-42".to_string()));
    }

    #[test]
    fn test_state_wrong_secret() {
        let secret = b"secret_key";
        let state = sign_state("user-42", secret).unwrap();
        assert_eq!(verify_state(&state, b"wrong_key"), None);
    }

    #[test]
    fn test_state_tampered_payload() {
        let secret = b"secret_key";
        let state = sign_state("user-42", secret).unwrap();

        let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(&state).unwrap()).unwrap();
        let tampered = decoded.replacen("user-42", "user-99", 1);
        let tampered_state = URL_SAFE_NO_PAD.encode(tampered.as_bytes());

        assert_eq!(verify_state(&tampered_state, secret), None);
    }

    #[test]
    fn test_state_malformed() {
        let secret = b"secret_key";
        let state = URL_SAFE_NO_PAD.encode("missing|fields");
        assert_eq!(verify_state(&state, secret), None);
        assert_eq!(verify_state("not-base64!!!", secret), None);
    }
}
