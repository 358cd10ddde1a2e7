// SPDX-License-Identifier: MIT

//! Firestore-backed credential store.
//!
//! User documents are keyed by the normalized email address. Creation
//! uses insert (create-if-absent) semantics, so a race between two
//! registrations with the same email is resolved by the store rejecting
//! the second write, which surfaces as `AppError::DuplicateEmail`.

use crate::db::collections;
use crate::error::AppError;
use crate::models::User;

/// Firestore user store.
#[derive(Clone)]
pub struct UserStore {
    client: Option<firestore::FirestoreDb>,
}

impl UserStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated
        // connection to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock store for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Create a new user. Fails with `DuplicateEmail` if an account with
    /// the same normalized email already exists.
    ///
    /// The caller is responsible for hashing the password before the user
    /// record reaches this method; a stored `password_hash` is always a hash.
    pub async fn create(&self, user: &User) -> Result<(), AppError> {
        let doc_id = User::normalize_email(&user.email);

        let result: Result<User, _> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&doc_id)
            .object(user)
            .execute()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let msg = e.to_string();
                // Firestore rejects an insert for an existing document id.
                if msg.contains("AlreadyExists") || msg.contains("already exists") {
                    Err(AppError::DuplicateEmail)
                } else {
                    Err(AppError::Database(msg))
                }
            }
        }
    }

    /// Look up a user by email (normalized before lookup).
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let doc_id = User::normalize_email(email);
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(&doc_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Look up a user by its opaque id.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let id = id.to_string();
        let mut users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("id").eq(id.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.pop())
    }

    /// Persist an in-place mutation of an existing user (new OAuth tokens,
    /// preference change, password change).
    pub async fn save(&self, user: &User) -> Result<(), AppError> {
        let doc_id = User::normalize_email(&user.email);
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&doc_id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
