// SPDX-License-Identifier: MIT

//! Authentication service: register, login, logout, federated login,
//! and default-admin provisioning.
//!
//! No session state is persisted server-side beyond the user record
//! itself; a session is just a signed token the client holds.

use crate::db::UserStore;
use crate::error::AppError;
use crate::middleware::auth::create_session_token;
use crate::models::{Preferences, PublicUser, Role, User};
use crate::services::password::PasswordHasher;
use serde::{Deserialize, Serialize};

/// Well-known default admin account, provisioned at startup if absent.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@optimial.com";
const DEFAULT_ADMIN_PASSWORD: &str = "Admin123!";
const DEFAULT_ADMIN_NAME: &str = "Administrateur";

/// Successful authentication: a session token plus the public profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Federated identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
    Facebook,
}

/// Authentication service, constructed once at startup and shared
/// through `AppState`.
#[derive(Clone)]
pub struct AuthService {
    store: UserStore,
    hasher: PasswordHasher,
    signing_key: Vec<u8>,
}

impl AuthService {
    pub fn new(store: UserStore, signing_key: Vec<u8>) -> Self {
        Self {
            store,
            hasher: PasswordHasher::new(),
            signing_key,
        }
    }

    /// Register a new local account.
    ///
    /// Fails with `DuplicateEmail` if the email is taken (any case
    /// variant); the uniqueness check is the store's, so a concurrent
    /// duplicate registration loses cleanly rather than crashing.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthResponse, AppError> {
        let email = User::normalize_email(email);
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::BadRequest("Adresse email invalide".to_string()));
        }
        if password.is_empty() {
            return Err(AppError::BadRequest("Mot de passe requis".to_string()));
        }

        let password_hash = self.hash_blocking(password.to_string()).await?;

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.clone(),
            password_hash: Some(password_hash),
            name: name.trim().to_string(),
            role: Role::User,
            preferences: Preferences::default(),
            email_settings: Default::default(),
            gmail_tokens: None,
            google_id: None,
            facebook_id: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        self.store.create(&user).await?;

        tracing::info!(email = %email, "User registered");

        self.respond(user)
    }

    /// Log in with email and password.
    ///
    /// Unknown email and wrong password produce the identical
    /// `InvalidCredentials` error so callers cannot enumerate accounts.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let hash = user
            .password_hash
            .clone()
            .ok_or(AppError::InvalidCredentials)?;

        if !self.verify_blocking(password.to_string(), hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(email = %user.email, "User logged in");

        self.respond(user)
    }

    /// Log in (or register) via a federated identity provider.
    ///
    /// A user is matched by email across providers: if an account with
    /// the email exists, the provider subject id is linked in place;
    /// otherwise a federated-only account (no local password) is created.
    pub async fn federated_login(
        &self,
        provider: Provider,
        subject_id: &str,
        email: &str,
        name: &str,
    ) -> Result<AuthResponse, AppError> {
        let email = User::normalize_email(email);

        let user = match self.store.find_by_email(&email).await? {
            Some(mut user) => {
                let linked = match provider {
                    Provider::Google => &mut user.google_id,
                    Provider::Facebook => &mut user.facebook_id,
                };
                if linked.is_none() {
                    *linked = Some(subject_id.to_string());
                    self.store.save(&user).await?;
                    tracing::info!(email = %email, ?provider, "Linked federated identity");
                }
                user
            }
            None => {
                let mut user = User {
                    id: uuid::Uuid::new_v4().to_string(),
                    email: email.clone(),
                    password_hash: None,
                    name: name.trim().to_string(),
                    role: Role::User,
                    preferences: Preferences::default(),
                    email_settings: Default::default(),
                    gmail_tokens: None,
                    google_id: None,
                    facebook_id: None,
                    created_at: chrono::Utc::now().to_rfc3339(),
                };
                match provider {
                    Provider::Google => user.google_id = Some(subject_id.to_string()),
                    Provider::Facebook => user.facebook_id = Some(subject_id.to_string()),
                }
                // A concurrent first login with the same email may win the
                // insert; in that case use the winner's record.
                match self.store.create(&user).await {
                    Ok(()) => {}
                    Err(AppError::DuplicateEmail) => {
                        user = self
                            .store
                            .find_by_email(&email)
                            .await?
                            .ok_or(AppError::InvalidCredentials)?;
                    }
                    Err(e) => return Err(e),
                }
                tracing::info!(email = %email, ?provider, "Federated account created");
                user
            }
        };

        self.respond(user)
    }

    /// Server-side logout is a stateless acknowledgment; no token is
    /// invalidated. The client discards its cached session.
    pub fn logout(&self) -> &'static str {
        "Déconnexion réussie"
    }

    /// Provision the well-known admin account once, if absent.
    ///
    /// Idempotent across restarts: a concurrent or repeated startup
    /// against the same database will not create a duplicate.
    pub async fn ensure_default_admin(&self) -> Result<(), AppError> {
        if self.store.find_by_email(DEFAULT_ADMIN_EMAIL).await?.is_some() {
            return Ok(());
        }

        let password_hash = self
            .hash_blocking(DEFAULT_ADMIN_PASSWORD.to_string())
            .await?;

        let admin = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: DEFAULT_ADMIN_EMAIL.to_string(),
            password_hash: Some(password_hash),
            name: DEFAULT_ADMIN_NAME.to_string(),
            role: Role::Admin,
            preferences: Preferences::default(),
            email_settings: Default::default(),
            gmail_tokens: None,
            google_id: None,
            facebook_id: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        match self.store.create(&admin).await {
            Ok(()) => {
                tracing::info!("Default admin account created");
                Ok(())
            }
            // Lost a race with another instance starting up.
            Err(AppError::DuplicateEmail) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Change a user's password, re-hashing on write.
    pub async fn change_password(&self, user_id: &str, new_password: &str) -> Result<(), AppError> {
        let mut user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;

        user.password_hash = Some(self.hash_blocking(new_password.to_string()).await?);
        self.store.save(&user).await?;

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Update a user's preferences (owner only; the caller enforces that
    /// `user_id` comes from the verified token).
    pub async fn update_preferences(
        &self,
        user_id: &str,
        preferences: Preferences,
    ) -> Result<PublicUser, AppError> {
        let mut user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;

        user.preferences = preferences;
        self.store.save(&user).await?;

        Ok(user.public_view())
    }

    fn respond(&self, user: User) -> Result<AuthResponse, AppError> {
        let token = create_session_token(&user.id, &self.signing_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

        Ok(AuthResponse {
            token,
            user: user.public_view(),
        })
    }

    /// Run bcrypt hashing on a blocking thread so the expensive work does
    /// not stall the request-handling event loop.
    async fn hash_blocking(&self, plaintext: String) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Hash task failed: {}", e)))?
    }

    async fn verify_blocking(&self, plaintext: String, hash: String) -> Result<bool, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &hash))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Verify task failed: {}", e)))?
    }
}
