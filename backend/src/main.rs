//! Main entry point for the console auth bridge.
//!
//! This file initializes the Axum web server, opens the user directory when
//! the local strategy is active, and mounts the session bridge routes.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, response::Json, routing::get};
use console_auth::api::common::ApiResponse;
use console_auth::auth::google::GoogleOAuth;
use console_auth::auth::routes::auth_router;
use console_auth::auth::{AppState, SessionBridge, build_exchange};
use console_auth::config::{AuthMode, Config};
use console_auth::database::Database;
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::fmt::init;

#[tokio::main]
async fn main() -> Result<()> {
    init();

    let config = Config::from_env()?;
    let db = match config.auth_mode {
        AuthMode::Local => Some(Database::new(&config).await?),
        AuthMode::External => None,
    };
    let pool = db.as_ref().map(|db| db.pool().clone());

    let exchange = build_exchange(&config, pool.clone())?;
    let google = match (&config.google, pool) {
        (Some(google), Some(pool)) if config.google_enabled() => Some(Arc::new(
            GoogleOAuth::new(google, pool).context("Failed to configure Google sign-in")?,
        )),
        _ => None,
    };

    let state = AppState {
        exchange,
        bridge: Arc::new(SessionBridge::new(config.auth_mode, &config.session_secret)),
        google,
        cookie_name: config.session_cookie_name.clone(),
        cookie_secure: config.session_cookie_secure,
    };

    let app = Router::new()
        .route("/", get(root_handler))
        .nest("/api/auth", auth_router(state));

    let bind_address = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;

    info!(
        mode = %config.auth_mode,
        "Starting console auth server on port {}", config.server_port
    );
    axum::serve(listener, app).await?;

    if let Some(db) = db {
        db.close().await;
    }
    Ok(())
}

async fn root_handler() -> Json<ApiResponse<Value>> {
    Json(ApiResponse::success(
        json!({
            "service": "Console Auth",
            "version": env!("CARGO_PKG_VERSION")
        }),
        "Welcome to the console auth API",
    ))
}
