// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod auth;
pub mod gmail;
pub mod password;

pub use auth::{AuthResponse, AuthService, Provider};
pub use gmail::GmailService;
pub use password::PasswordHasher;
