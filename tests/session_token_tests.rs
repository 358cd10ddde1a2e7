// SPDX-License-Identifier: MIT

//! Session token tests.
//!
//! These tests verify that tokens minted by the auth service can be
//! decoded by the auth middleware, and that the 24-hour expiry is
//! enforced on verification.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use optimial::middleware::auth::{
    create_session_token, verify_session_token, Claims, SESSION_TTL_SECS,
};
use std::time::{SystemTime, UNIX_EPOCH};

const SIGNING_KEY: &[u8] = b"test_signing_key_32_bytes_long!!";

fn now_secs() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

/// Mint a token with arbitrary issue/expiry times.
fn make_token(sub: &str, iat: usize, exp: usize, key: &[u8]) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        iat,
        exp,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(key),
    )
    .unwrap()
}

#[test]
fn test_token_roundtrip() {
    let token = create_session_token("user-123", SIGNING_KEY).unwrap();
    let claims = verify_session_token(&token, SIGNING_KEY).unwrap();

    assert_eq!(claims.sub, "user-123");
    assert!(claims.exp > claims.iat);
}

#[test]
fn test_token_ttl_is_24_hours() {
    let token = create_session_token("user-123", SIGNING_KEY).unwrap();
    let claims = verify_session_token(&token, SIGNING_KEY).unwrap();

    assert_eq!(claims.exp - claims.iat, SESSION_TTL_SECS);
    assert_eq!(SESSION_TTL_SECS, 24 * 60 * 60);
}

#[test]
fn test_expired_token_rejected() {
    let now = now_secs();
    // Issued 25 hours ago, expired an hour ago.
    let token = make_token("user-123", now - 90_000, now - 3_600, SIGNING_KEY);

    let result = verify_session_token(&token, SIGNING_KEY);
    assert!(matches!(
        result.unwrap_err().kind(),
        jsonwebtoken::errors::ErrorKind::ExpiredSignature
    ));
}

#[test]
fn test_expiry_boundary_has_no_leeway() {
    let now = now_secs();

    // Expired one second ago: already invalid, no clock-tolerance window.
    let token = make_token("user-123", now - SESSION_TTL_SECS, now - 1, SIGNING_KEY);
    assert!(verify_session_token(&token, SIGNING_KEY).is_err());

    // Half a minute past expiry must also be rejected.
    let token = make_token("user-123", now - SESSION_TTL_SECS, now - 30, SIGNING_KEY);
    assert!(verify_session_token(&token, SIGNING_KEY).is_err());
}

#[test]
fn test_token_valid_before_expiry() {
    let now = now_secs();
    // Issued 23 hours ago; still inside the 24h window.
    let token = make_token("user-123", now - 82_800, now + 3_600, SIGNING_KEY);

    let claims = verify_session_token(&token, SIGNING_KEY).unwrap();
    assert_eq!(claims.sub, "user-123");
}

#[test]
fn test_wrong_key_rejected() {
    let token = create_session_token("user-123", SIGNING_KEY).unwrap();
    assert!(verify_session_token(&token, b"a_different_signing_key_entirely").is_err());
}

#[test]
fn test_malformed_token_rejected() {
    assert!(verify_session_token("not.a.jwt", SIGNING_KEY).is_err());
    assert!(verify_session_token("", SIGNING_KEY).is_err());
}
