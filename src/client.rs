// SPDX-License-Identifier: MIT

//! API client with a file-persisted session store.
//!
//! The session store is the client-side half of the auth lifecycle: it
//! keeps `{token, user}` as one JSON document so authentication state
//! survives restarts, and the bearer token is attached to every request
//! to a protected endpoint. The cached role and preferences can drift
//! from server truth until the next login; no background refresh is
//! performed.

use crate::error::AppError;
use crate::models::{EmailAnalysis, EmailSummary, PublicUser};
use crate::services::AuthResponse;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted session: both fields are written and cleared together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: PublicUser,
}

/// File-backed session store.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the persisted session. Absent or unreadable file means
    /// unauthenticated.
    pub fn load(&self) -> Option<Session> {
        let bytes = std::fs::read(&self.path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Persist a session. Token and user are written atomically (temp
    /// file plus rename), so a partial write never leaves one without
    /// the other.
    pub fn save(&self, session: &Session) -> Result<(), AppError> {
        let bytes = serde_json::to_vec_pretty(session)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Session serialize failed: {}", e)))?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &bytes)
            .and_then(|_| std::fs::rename(&tmp, &self.path))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Session write failed: {}", e)))
    }

    /// Forget the persisted session.
    pub fn clear(&self) {
        let _ = std::fs::remove_file(&self.path);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// HTTP client for the OptimIAL API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: SessionStore,
    session: Option<Session>,
}

impl ApiClient {
    /// Create a client, restoring any persisted session.
    pub fn new(base_url: impl Into<String>, store: SessionStore) -> Self {
        let session = store.load();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            store,
            session,
        }
    }

    /// Whether a session is currently held.
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// The cached user profile, if authenticated. May be stale until the
    /// next login.
    pub fn user(&self) -> Option<&PublicUser> {
        self.session.as_ref().map(|s| &s.user)
    }

    /// Register a new account and persist the returned session.
    pub async fn register(
        &mut self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<&PublicUser, AppError> {
        let body = serde_json::json!({ "email": email, "password": password, "name": name });
        let response = self
            .http
            .post(format!("{}/auth/register", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Request failed: {}", e)))?;

        self.store_auth(response).await
    }

    /// Log in and persist the returned session.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<&PublicUser, AppError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self
            .http
            .post(format!("{}/auth/login", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Request failed: {}", e)))?;

        self.store_auth(response).await
    }

    /// Log out: acknowledge server-side, then drop the cached session.
    /// The local session is cleared even if the server call fails.
    pub async fn logout(&mut self) {
        if let Some(session) = &self.session {
            let _ = self
                .http
                .post(format!("{}/auth/logout", self.base_url))
                .bearer_auth(&session.token)
                .send()
                .await;
        }
        self.session = None;
        self.store.clear();
    }

    /// Fetch the Gmail consent URL for the current user.
    pub async fn gmail_auth_url(&self) -> Result<String, AppError> {
        #[derive(Deserialize)]
        struct UrlResponse {
            url: String,
        }

        let response: UrlResponse = self.get_json("/email/auth/gmail/url").await?;
        Ok(response.url)
    }

    /// List unread messages.
    pub async fn unread_emails(&self) -> Result<Vec<EmailSummary>, AppError> {
        self.get_json("/email/emails/unread").await
    }

    /// Analyze a message.
    pub async fn analyze_email(&self, id: &str) -> Result<EmailAnalysis, AppError> {
        self.get_json(&format!("/email/emails/{}/analyze", id)).await
    }

    /// Mark a message as read.
    pub async fn mark_email_read(&self, id: &str) -> Result<(), AppError> {
        let request = self
            .http
            .post(format!("{}/email/emails/{}/read", self.base_url, id));
        self.send_checked(request).await.map(|_| ())
    }

    /// Send a reply.
    pub async fn send_email(
        &self,
        to: &str,
        subject: &str,
        content: &str,
    ) -> Result<(), AppError> {
        let body = serde_json::json!({ "to": to, "subject": subject, "content": content });
        let request = self
            .http
            .post(format!("{}/email/emails/send", self.base_url))
            .json(&body);
        self.send_checked(request).await.map(|_| ())
    }

    async fn store_auth(&mut self, response: reqwest::Response) -> Result<&PublicUser, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = body["message"].as_str().unwrap_or("Erreur serveur");
            return Err(auth_error(status.as_u16(), message));
        }

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Response parse failed: {}", e)))?;

        let session = Session {
            token: auth.token,
            user: auth.user,
        };
        self.store.save(&session)?;

        Ok(&self.session.insert(session).user)
    }

    /// GET a protected endpoint. If no session is held the request is
    /// sent unauthenticated and the server rejects it with 401.
    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, AppError> {
        let request = self.http.get(format!("{}{}", self.base_url, path));
        let response = self.send_checked(request).await?;
        response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Response parse failed: {}", e)))
    }

    async fn send_checked(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, AppError> {
        let request = match &self.session {
            Some(session) => request.bearer_auth(&session.token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Request failed: {}", e)))?;

        if response.status().as_u16() == 401 {
            return Err(AppError::Unauthorized);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(anyhow::anyhow!(
                "HTTP {}: {}",
                status,
                body
            )));
        }

        Ok(response)
    }
}

/// Map a failed register/login response to an error. The server uses
/// 400 both for duplicate emails and for request-validation failures,
/// so the body message disambiguates them.
fn auth_error(status: u16, message: &str) -> AppError {
    match status {
        400 if message == "Cet email est déjà utilisé" => AppError::DuplicateEmail,
        400 => AppError::BadRequest(message.to_string()),
        401 => AppError::InvalidCredentials,
        _ => AppError::Internal(anyhow::anyhow!("HTTP {}: {}", status, message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Preferences, Role};

    fn sample_session() -> Session {
        Session {
            token: "token-abc".to_string(),
            user: PublicUser {
                id: "u-1".to_string(),
                email: "alice@x.com".to_string(),
                name: "Alice".to_string(),
                role: Role::User,
                preferences: Preferences::default(),
            },
        }
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        assert!(store.load().is_none());

        store.save(&sample_session()).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.token, "token-abc");
        assert_eq!(loaded.user.email, "alice@x.com");
    }

    #[test]
    fn test_clear_removes_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        store.save(&sample_session()).unwrap();
        assert!(store.load().is_some());

        store.clear();
        assert!(store.load().is_none());
        // Clearing twice is fine.
        store.clear();
    }

    #[test]
    fn test_corrupt_session_file_means_unauthenticated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store = SessionStore::new(&path);
        assert!(store.load().is_none());
    }

    #[test]
    fn test_client_restores_persisted_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        store.save(&sample_session()).unwrap();

        let client = ApiClient::new("http://localhost:5001", store);
        assert!(client.is_authenticated());
        assert_eq!(client.user().unwrap().id, "u-1");
    }

    #[test]
    fn test_client_without_session_is_unauthenticated() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        let client = ApiClient::new("http://localhost:5001", store);
        assert!(!client.is_authenticated());
        assert!(client.user().is_none());
    }

    #[test]
    fn test_auth_error_distinguishes_400_by_message() {
        assert!(matches!(
            auth_error(400, "Cet email est déjà utilisé"),
            AppError::DuplicateEmail
        ));
        // Validation failures also come back as 400 and must keep the
        // server's message instead of collapsing to DuplicateEmail.
        assert!(matches!(
            auth_error(400, "Adresse email invalide"),
            AppError::BadRequest(msg) if msg == "Adresse email invalide"
        ));
        assert!(matches!(
            auth_error(400, "Mot de passe requis"),
            AppError::BadRequest(msg) if msg == "Mot de passe requis"
        ));
        assert!(matches!(
            auth_error(401, "Email ou mot de passe incorrect"),
            AppError::InvalidCredentials
        ));
        assert!(matches!(auth_error(503, "down"), AppError::Internal(_)));
    }
}
