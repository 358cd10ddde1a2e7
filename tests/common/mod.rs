// SPDX-License-Identifier: MIT

use optimial::config::Config;
use optimial::db::UserStore;
use optimial::routes::create_router;
use optimial::services::{AuthService, GmailService};
use optimial::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> UserStore {
    UserStore::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> UserStore {
    UserStore::new_mock()
}

/// Build an app around the given store.
#[allow(dead_code)]
pub fn create_app_with_db(db: UserStore) -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();

    let auth_service = AuthService::new(db.clone(), config.jwt_signing_key.clone());
    let gmail_service = GmailService::new(
        config.gmail_client_id.clone(),
        config.gmail_client_secret.clone(),
        config.gmail_redirect_url.clone(),
        db.clone(),
    );

    let state = Arc::new(AppState {
        config,
        db,
        auth_service,
        gmail_service,
    });

    (create_router(state.clone()), state)
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_app_with_db(test_db_offline())
}
