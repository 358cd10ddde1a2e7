// SPDX-License-Identifier: MIT

//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// User account role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// UI theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

/// Per-user preferences, defaulted at account creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: Theme,
    pub ai_enabled: bool,
    pub notifications: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            ai_enabled: true,
            notifications: true,
        }
    }
}

/// Email automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSettings {
    pub auto_respond: bool,
    pub auto_categories: bool,
    pub notify_on_important: bool,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            auto_respond: false,
            auto_categories: true,
            notify_on_important: true,
        }
    }
}

/// Gmail OAuth tokens stored on the user record after a completed
/// authorization-code exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailTokens {
    pub access_token: String,
    /// Only present when the consent flow requested offline access.
    pub refresh_token: Option<String>,
    pub scope: String,
    pub token_type: String,
    /// Access token expiry (Unix millis), as reported by Google.
    pub expiry_date: Option<i64>,
}

/// User account stored in Firestore.
///
/// Documents are keyed by the normalized (trimmed, lowercased) email,
/// which is what enforces the one-account-per-email invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Opaque unique identifier (UUID v4), immutable after creation.
    pub id: String,
    /// Normalized email address.
    pub email: String,
    /// bcrypt hash. `None` for federated-only accounts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Display name.
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub email_settings: EmailSettings,
    /// Set after a completed Gmail OAuth authorization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gmail_tokens: Option<GmailTokens>,
    /// Google subject id, set on first federated login via Google.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    /// Facebook subject id, set on first federated login via Facebook.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook_id: Option<String>,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
}

impl User {
    /// Normalize an email address for lookup and storage: trim and lowercase.
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// The client-facing view of this account. Excludes the password hash
    /// and OAuth token material.
    pub fn public_view(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            preferences: self.preferences.clone(),
        }
    }
}

/// Public user profile returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub preferences: Preferences,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            User::normalize_email("  Alice@Example.COM "),
            "alice@example.com"
        );
        assert_eq!(User::normalize_email("bob@x.com"), "bob@x.com");
    }

    #[test]
    fn test_public_view_excludes_secrets() {
        let user = User {
            id: "u-1".to_string(),
            email: "alice@x.com".to_string(),
            password_hash: Some("$2b$10$secret".to_string()),
            name: "Alice".to_string(),
            role: Role::User,
            preferences: Preferences::default(),
            email_settings: EmailSettings::default(),
            gmail_tokens: None,
            google_id: None,
            facebook_id: None,
            created_at: "2025-01-01T00:00:00Z".to_string(),
        };

        let view = user.public_view();
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["id"], "u-1");
        assert_eq!(json["role"], "user");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("gmail_tokens").is_none());
    }

    #[test]
    fn test_defaults() {
        let prefs = Preferences::default();
        assert_eq!(prefs.theme, Theme::Light);
        assert!(prefs.ai_enabled);
        assert!(prefs.notifications);

        let settings = EmailSettings::default();
        assert!(!settings.auto_respond);
        assert!(settings.auto_categories);
    }
}
