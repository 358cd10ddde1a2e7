// SPDX-License-Identifier: MIT

//! UserStore and account-lifecycle tests against the Firestore emulator.

use optimial::models::{Preferences, Role, Theme, User};
use optimial::services::{AuthService, Provider};

mod common;

fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, uuid::Uuid::new_v4())
}

fn new_user(email: &str, name: &str) -> User {
    User {
        id: uuid::Uuid::new_v4().to_string(),
        email: email.to_string(),
        password_hash: Some("$2b$10$placeholderplaceholderplace".to_string()),
        name: name.to_string(),
        role: Role::User,
        preferences: Preferences::default(),
        email_settings: Default::default(),
        gmail_tokens: None,
        google_id: None,
        facebook_id: None,
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

#[tokio::test]
async fn test_create_and_find() {
    require_emulator!();
    let db = common::test_db().await;

    let email = unique_email("store");
    let user = new_user(&email, "Store Test");
    db.create(&user).await.unwrap();

    let by_email = db.find_by_email(&email).await.unwrap().unwrap();
    assert_eq!(by_email.id, user.id);

    // Case-insensitive lookup.
    let by_upper = db.find_by_email(&email.to_uppercase()).await.unwrap();
    assert!(by_upper.is_some());

    let by_id = db.find_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(by_id.email, email);

    assert!(db.find_by_id("no-such-id").await.unwrap().is_none());
    assert!(db
        .find_by_email(&unique_email("missing"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_save_persists_mutation() {
    require_emulator!();
    let db = common::test_db().await;

    let email = unique_email("mutate");
    let mut user = new_user(&email, "Mutable");
    db.create(&user).await.unwrap();

    user.preferences.theme = Theme::Dark;
    user.preferences.notifications = false;
    db.save(&user).await.unwrap();

    let reloaded = db.find_by_email(&email).await.unwrap().unwrap();
    assert_eq!(reloaded.preferences.theme, Theme::Dark);
    assert!(!reloaded.preferences.notifications);
    // Identity is unchanged by a save.
    assert_eq!(reloaded.id, user.id);
}

#[tokio::test]
async fn test_federated_login_creates_then_links() {
    require_emulator!();
    let db = common::test_db().await;
    let auth = AuthService::new(db.clone(), b"test_jwt_key_32_bytes_minimum!!!".to_vec());

    let email = unique_email("federated");

    // First federated login creates a password-less account.
    let response = auth
        .federated_login(Provider::Google, "google-sub-1", &email, "Fede")
        .await
        .unwrap();
    let user = db.find_by_email(&email).await.unwrap().unwrap();
    assert_eq!(user.google_id.as_deref(), Some("google-sub-1"));
    assert!(user.password_hash.is_none());
    assert_eq!(response.user.id, user.id);

    // A second provider links onto the same record, never duplicating it.
    let response2 = auth
        .federated_login(Provider::Facebook, "fb-sub-9", &email, "Fede")
        .await
        .unwrap();
    assert_eq!(response2.user.id, user.id);

    let linked = db.find_by_email(&email).await.unwrap().unwrap();
    assert_eq!(linked.google_id.as_deref(), Some("google-sub-1"));
    assert_eq!(linked.facebook_id.as_deref(), Some("fb-sub-9"));
}

#[tokio::test]
async fn test_change_password_rehashes() {
    require_emulator!();
    let db = common::test_db().await;
    let auth = AuthService::new(db.clone(), b"test_jwt_key_32_bytes_minimum!!!".to_vec());

    let email = unique_email("rehash");
    let registered = auth.register(&email, "OldPassword1", "Re Hash").await.unwrap();

    let before = db.find_by_email(&email).await.unwrap().unwrap();

    auth.change_password(&registered.user.id, "NewPassword2")
        .await
        .unwrap();

    let after = db.find_by_email(&email).await.unwrap().unwrap();
    // Stored value is a fresh hash, never the plaintext.
    assert_ne!(after.password_hash, before.password_hash);
    assert_ne!(after.password_hash.as_deref(), Some("NewPassword2"));

    assert!(auth.login(&email, "NewPassword2").await.is_ok());
    assert!(auth.login(&email, "OldPassword1").await.is_err());
}

#[tokio::test]
async fn test_update_preferences() {
    require_emulator!();
    let db = common::test_db().await;
    let auth = AuthService::new(db.clone(), b"test_jwt_key_32_bytes_minimum!!!".to_vec());

    let email = unique_email("prefs");
    let registered = auth.register(&email, "Secret123", "Prefs").await.unwrap();

    let updated = auth
        .update_preferences(
            &registered.user.id,
            Preferences {
                theme: Theme::Dark,
                ai_enabled: false,
                notifications: true,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.preferences.theme, Theme::Dark);
    assert!(!updated.preferences.ai_enabled);

    let stored = db.find_by_email(&email).await.unwrap().unwrap();
    assert_eq!(stored.preferences.theme, Theme::Dark);
}
