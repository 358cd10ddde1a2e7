// SPDX-License-Identifier: MIT

//! Password hashing primitive (bcrypt).

use crate::error::AppError;

/// bcrypt work factor. Matches the cost the rest of the deployment was
/// provisioned with; raising it invalidates no existing hashes but slows
/// new logins.
const BCRYPT_COST: u32 = 10;

/// One-way salted password hasher.
///
/// Hashing is deliberately expensive; callers on an async runtime should
/// offload it to a blocking thread (see [`AuthService`](crate::services::AuthService)).
#[derive(Debug, Clone, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    pub fn new() -> Self {
        Self
    }

    /// Hash a plaintext password with a fresh random salt.
    ///
    /// Never deterministic across calls.
    pub fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        bcrypt::hash(plaintext, BCRYPT_COST).map_err(|_| AppError::Crypto)
    }

    /// Verify a plaintext password against a stored hash. The salt is
    /// embedded in the hash; comparison is constant-time inside bcrypt.
    pub fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, AppError> {
        bcrypt::verify(plaintext, hash).map_err(|_| AppError::Crypto)
    }
}
