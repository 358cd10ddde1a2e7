// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod email;
pub mod user;

pub use email::{Category, EmailAnalysis, EmailSummary, Priority};
pub use user::{EmailSettings, GmailTokens, Preferences, PublicUser, Role, Theme, User};
