// SPDX-License-Identifier: MIT

//! Application error types with consistent API responses.
//!
//! Every handler-level error is translated at the request boundary into
//! a stable `{"message": ...}` JSON body with an appropriate status.
//! Internal details are logged server-side only.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing, malformed, or failed-verification bearer token.
    #[error("Non autorisé")]
    Unauthorized,

    /// Login failure. Deliberately the same message whether the email is
    /// unknown or the password is wrong, to avoid user enumeration.
    #[error("Email ou mot de passe incorrect")]
    InvalidCredentials,

    /// Registration with an email that already has an account.
    #[error("Cet email est déjà utilisé")]
    DuplicateEmail,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// OAuth authorization-code exchange failed (invalid, expired, or
    /// already-used code).
    #[error("OAuth token exchange failed: {0}")]
    OAuthExchange(String),

    /// Gmail API call failed.
    #[error("Mail API error: {0}")]
    MailApi(String),

    /// Broken hashing primitive or corrupted stored hash. Never carries
    /// plaintext or partial hash state.
    #[error("Password hashing error")]
    Crypto,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::DuplicateEmail => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::OAuthExchange(msg) => {
                tracing::error!(error = %msg, "OAuth exchange error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Erreur serveur".to_string())
            }
            AppError::MailApi(msg) => {
                tracing::error!(error = %msg, "Mail API error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Erreur serveur".to_string())
            }
            AppError::Crypto => {
                tracing::error!("Password hashing failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Erreur serveur".to_string())
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Erreur serveur".to_string())
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Erreur serveur".to_string())
            }
        };

        let body = ErrorResponse { message };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_message(err: AppError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, json["message"].as_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_invalid_credentials_response() {
        let (status, message) = body_message(AppError::InvalidCredentials).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(message, "Email ou mot de passe incorrect");
    }

    #[tokio::test]
    async fn test_duplicate_email_response() {
        let (status, message) = body_message(AppError::DuplicateEmail).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Cet email est déjà utilisé");
    }

    #[tokio::test]
    async fn test_internal_errors_do_not_leak_details() {
        let (status, message) =
            body_message(AppError::Database("connection refused at 10.0.0.1".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Erreur serveur");

        let (status, message) = body_message(AppError::Crypto).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Erreur serveur");
    }

    #[tokio::test]
    async fn test_provider_failures_surface_as_500() {
        let (status, message) =
            body_message(AppError::OAuthExchange("invalid_grant".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Erreur serveur");

        let (status, message) =
            body_message(AppError::MailApi("Gmail API returned 503".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Erreur serveur");
    }
}
