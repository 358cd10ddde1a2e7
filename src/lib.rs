// SPDX-License-Identifier: MIT

//! OptimIAL backend: authentication, session tokens, and Gmail
//! integration for the small-business productivity dashboard.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::UserStore;
use services::{AuthService, GmailService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: UserStore,
    pub auth_service: AuthService,
    pub gmail_service: GmailService,
}
