// SPDX-License-Identifier: MIT

//! OptimIAL API Server
//!
//! Authentication, session tokens, and Gmail integration for the
//! OptimIAL productivity dashboard.

use optimial::{
    config::Config,
    db::UserStore,
    services::{AuthService, GmailService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting OptimIAL API");

    // Connect to Firestore. Connectivity failure at startup is fatal;
    // there is no degraded mode.
    let db = UserStore::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    let auth_service = AuthService::new(db.clone(), config.jwt_signing_key.clone());

    // Provision the well-known admin account if absent (idempotent).
    auth_service
        .ensure_default_admin()
        .await
        .expect("Failed to provision default admin account");
    tracing::info!("Default admin account verified");

    let gmail_service = GmailService::new(
        config.gmail_client_id.clone(),
        config.gmail_client_secret.clone(),
        config.gmail_redirect_url.clone(),
        db.clone(),
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        auth_service,
        gmail_service,
    });

    // Build router
    let app = optimial::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("optimial=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
