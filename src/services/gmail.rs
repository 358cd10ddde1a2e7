// SPDX-License-Identifier: MIT

//! Gmail integration: OAuth2 authorization-code flow and mail API calls.
//!
//! Handles:
//! - Consent URL construction (offline access, forced consent prompt)
//! - Authorization-code exchange at Google's token endpoint
//! - Unread listing, per-message analysis, mark-as-read, raw send
//!
//! A mail client is rebuilt per call from the tokens stored on the user
//! record; there is no automatic refresh. A provider-side 401 surfaces
//! as `MailApi` and the user re-authorizes through the consent flow.

use crate::db::UserStore;
use crate::error::AppError;
use crate::models::{Category, EmailAnalysis, EmailSummary, GmailTokens, Priority};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;

/// OAuth scopes requested for the Gmail API.
pub const GMAIL_SCOPES: [&str; 4] = [
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/gmail.send",
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/gmail.labels",
];

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Low-level Gmail API client bound to one access token.
struct GmailClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GmailClient {
    fn new(http: reqwest::Client, base_url: String, access_token: String) -> Self {
        Self {
            http,
            base_url,
            access_token,
        }
    }

    /// List ids of unread messages in the mailbox.
    async fn list_unread_ids(&self) -> Result<Vec<String>, AppError> {
        let url = format!("{}/users/me/messages", self.base_url);
        let list: MessageList = self
            .get_json(self.http.get(&url).query(&[("q", "is:unread")]))
            .await?;

        Ok(list
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| m.id)
            .collect())
    }

    /// Fetch a single message (metadata and snippet).
    async fn get_message(&self, id: &str) -> Result<Message, AppError> {
        let url = format!("{}/users/me/messages/{}", self.base_url, id);
        self.get_json(self.http.get(&url)).await
    }

    /// Fetch a single message with the full payload tree.
    async fn get_message_full(&self, id: &str) -> Result<Message, AppError> {
        let url = format!("{}/users/me/messages/{}", self.base_url, id);
        self.get_json(self.http.get(&url).query(&[("format", "full")]))
            .await
    }

    /// Remove the UNREAD label from a message.
    async fn mark_read(&self, id: &str) -> Result<(), AppError> {
        let url = format!("{}/users/me/messages/{}/modify", self.base_url, id);
        let body = serde_json::json!({ "removeLabelIds": ["UNREAD"] });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::MailApi(e.to_string()))?;

        check_status(response).await.map(|_| ())
    }

    /// Send a raw RFC 822 message (base64url encoded).
    async fn send_raw(&self, raw: &str) -> Result<(), AppError> {
        let url = format!("{}/users/me/messages/send", self.base_url);
        let body = serde_json::json!({ "raw": raw });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::MailApi(e.to_string()))?;

        check_status(response).await.map(|_| ())
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AppError> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| AppError::MailApi(e.to_string()))?;

        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| AppError::MailApi(format!("JSON parse error: {}", e)))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if status.as_u16() == 401 {
        // Stored access token expired or was revoked; the user must
        // redo the consent flow.
        return Err(AppError::MailApi("gmail_token_expired".to_string()));
    }

    Err(AppError::MailApi(format!("HTTP {}: {}", status, body)))
}

// ─────────────────────────────────────────────────────────────────────────────
// GmailService - OAuth flow plus high-level mailbox operations
// ─────────────────────────────────────────────────────────────────────────────

/// High-level Gmail service, constructed once at startup.
#[derive(Clone)]
pub struct GmailService {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    store: UserStore,
}

impl GmailService {
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_url: String,
        store: UserStore,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://gmail.googleapis.com/gmail/v1".to_string(),
            client_id,
            client_secret,
            redirect_url,
            store,
        }
    }

    // ─── OAuth Flow ──────────────────────────────────────────────────────────

    /// Build the Google consent URL.
    ///
    /// Requests offline access (refresh token) and forces the consent
    /// prompt so a refresh token is granted on re-authorization too.
    /// `state` must be the signed anti-CSRF state for this request.
    pub fn consent_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&state={}",
            AUTH_ENDPOINT,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(&GMAIL_SCOPES.join(" ")),
            state,
        )
    }

    /// Exchange an authorization code for tokens at Google's token
    /// endpoint. Fails with `OAuthExchange` if the code is invalid,
    /// expired, or already used.
    pub async fn exchange_code(&self, code: &str) -> Result<GmailTokens, AppError> {
        let response = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::OAuthExchange(format!("Token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Gmail token exchange failed");
            return Err(AppError::OAuthExchange(format!(
                "Token exchange failed with status {}",
                status
            )));
        }

        let token_response: TokenExchangeResponse = response
            .json()
            .await
            .map_err(|e| AppError::OAuthExchange(format!("Failed to parse token response: {}", e)))?;

        let expiry_date = token_response
            .expires_in
            .map(|secs| (chrono::Utc::now() + chrono::Duration::seconds(secs)).timestamp_millis());

        Ok(GmailTokens {
            access_token: token_response.access_token,
            refresh_token: token_response.refresh_token,
            scope: token_response.scope.unwrap_or_default(),
            token_type: token_response
                .token_type
                .unwrap_or_else(|| "Bearer".to_string()),
            expiry_date,
        })
    }

    /// Exchange a code and persist the resulting tokens on the user
    /// record, so the authorization survives process restarts.
    pub async fn authorize_user(&self, user_id: &str, code: &str) -> Result<(), AppError> {
        let tokens = self.exchange_code(code).await?;

        let mut user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;

        user.gmail_tokens = Some(tokens);
        self.store.save(&user).await?;

        tracing::info!(user_id = %user_id, "Gmail tokens stored");
        Ok(())
    }

    /// Build a mail client from the tokens stored on the user record.
    async fn client_for(&self, user_id: &str) -> Result<GmailClient, AppError> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;

        let tokens = user
            .gmail_tokens
            .ok_or_else(|| AppError::BadRequest("Compte Gmail non connecté".to_string()))?;

        Ok(GmailClient::new(
            self.http.clone(),
            self.base_url.clone(),
            tokens.access_token,
        ))
    }

    // ─── Mailbox Operations ──────────────────────────────────────────────────

    /// List the user's unread messages with subject/from/date/snippet.
    pub async fn list_unread(&self, user_id: &str) -> Result<Vec<EmailSummary>, AppError> {
        let client = self.client_for(user_id).await?;
        let ids = client.list_unread_ids().await?;

        let mut emails = Vec::with_capacity(ids.len());
        for id in ids {
            let message = client.get_message(&id).await?;
            let headers = message.headers();
            let subject = headers.value("Subject");
            let from = headers.value("From");
            let date = headers.value("Date");

            emails.push(EmailSummary {
                id,
                subject,
                from,
                date,
                snippet: message.snippet,
            });
        }

        Ok(emails)
    }

    /// Fetch a message in full and run the keyword analyzer over it.
    pub async fn analyze(&self, user_id: &str, message_id: &str) -> Result<EmailAnalysis, AppError> {
        let client = self.client_for(user_id).await?;
        let message = client.get_message_full(message_id).await?;

        let headers = message.headers();
        let subject = headers.value("Subject");
        let from = headers.value("From");
        let date = headers.value("Date");

        let content = message
            .payload
            .as_ref()
            .map(extract_content)
            .unwrap_or_default();

        let subject_text = subject.clone().unwrap_or_default();
        let priority = determine_priority(&subject_text, &content);
        let category = categorize(&subject_text, &content);

        Ok(EmailAnalysis {
            id: message_id.to_string(),
            subject,
            from,
            date,
            content,
            priority,
            category,
        })
    }

    /// Mark a message as read.
    pub async fn mark_read(&self, user_id: &str, message_id: &str) -> Result<(), AppError> {
        let client = self.client_for(user_id).await?;
        client.mark_read(message_id).await
    }

    /// Send a plain-text reply.
    pub async fn send(
        &self,
        user_id: &str,
        to: &str,
        subject: &str,
        content: &str,
    ) -> Result<(), AppError> {
        let client = self.client_for(user_id).await?;
        let raw = encode_raw_message(to, subject, content);
        client.send_raw(&raw).await
    }
}

// ─── Message Analysis ────────────────────────────────────────────────────────

/// Classify a message as high priority when it carries urgency keywords.
pub fn determine_priority(subject: &str, content: &str) -> Priority {
    const URGENT_KEYWORDS: [&str; 4] = ["urgent", "important", "deadline", "asap"];

    let text = format!("{} {}", subject, content).to_lowercase();
    if URGENT_KEYWORDS.iter().any(|k| text.contains(k)) {
        Priority::High
    } else {
        Priority::Normal
    }
}

/// Keyword-based categorization (French and English keywords).
pub fn categorize(subject: &str, content: &str) -> Category {
    let text = format!("{} {}", subject, content).to_lowercase();

    let categories: [(Category, &[&str]); 4] = [
        (Category::Meeting, &["réunion", "meeting", "rendez-vous"]),
        (Category::Task, &["tâche", "task", "todo", "à faire"]),
        (Category::Report, &["rapport", "report", "bilan"]),
        (Category::Question, &["question", "help", "aide"]),
    ];

    for (category, keywords) in categories {
        if keywords.iter().any(|k| text.contains(k)) {
            return category;
        }
    }

    Category::Other
}

/// Extract the plain-text content of a message payload: the body itself
/// if present, otherwise the first `text/plain` part.
fn extract_content(payload: &Payload) -> String {
    if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref()) {
        return decode_body(data);
    }

    if let Some(parts) = &payload.parts {
        for part in parts {
            if part.mime_type.as_deref() == Some("text/plain") {
                if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) {
                    return decode_body(data);
                }
            }
        }
    }

    String::new()
}

fn decode_body(data: &str) -> String {
    URL_SAFE_NO_PAD
        .decode(data.trim_end_matches('='))
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_default()
}

/// Build a base64url-encoded RFC 822 plain-text message.
pub fn encode_raw_message(to: &str, subject: &str, content: &str) -> String {
    let message = format!(
        "Content-Type: text/plain; charset=\"UTF-8\"\n\
         MIME-Version: 1.0\n\
         Content-Transfer-Encoding: 7bit\n\
         To: {}\n\
         Subject: {}\n\n\
         {}",
        to, subject, content
    );

    URL_SAFE_NO_PAD.encode(message.as_bytes())
}

// ─── Wire Types ──────────────────────────────────────────────────────────────

/// Token exchange response from Google.
#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
    refresh_token: Option<String>,
    scope: Option<String>,
    token_type: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    messages: Option<Vec<MessageRef>>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Message {
    snippet: Option<String>,
    payload: Option<Payload>,
}

impl Message {
    fn headers(&self) -> HeaderLookup<'_> {
        HeaderLookup(
            self.payload
                .as_ref()
                .map(|p| p.headers.as_slice())
                .unwrap_or_default(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    headers: Vec<MessageHeader>,
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
    body: Option<MessageBody>,
    parts: Option<Vec<Payload>>,
}

#[derive(Debug, Deserialize)]
struct MessageHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    data: Option<String>,
}

struct HeaderLookup<'a>(&'a [MessageHeader]);

impl HeaderLookup<'_> {
    fn value(&self, name: &str) -> Option<String> {
        self.0
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.clone())
    }
}
