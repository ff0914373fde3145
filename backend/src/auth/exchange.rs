//! The credential exchange seam.
//!
//! Exactly one strategy is active per process. It is resolved from the
//! configuration at startup and shared as `Arc<dyn CredentialExchange>` with
//! every handler that needs to authorize a user.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::info;

use crate::auth::external::ExternalExchange;
use crate::auth::local::LocalExchange;
use crate::auth::models::{Credentials, Identity, ProviderInfo};
use crate::client::ApiClient;
use crate::config::{AuthMode, Config};
use crate::errors::AuthResult;

pub const CREDENTIALS_PROVIDER: ProviderInfo = ProviderInfo {
    id: "credentials",
    name: "Credentials",
    kind: "credentials",
};

#[async_trait]
pub trait CredentialExchange: Send + Sync {
    fn mode(&self) -> AuthMode;

    /// Turns sign-in credentials into an identity, or a structured failure.
    async fn authorize(&self, credentials: Credentials) -> AuthResult<Identity>;

    /// Sign-in methods this strategy accepts.
    fn providers(&self) -> Vec<ProviderInfo> {
        vec![CREDENTIALS_PROVIDER]
    }
}

/// Selects the strategy for this process. Local mode requires an open pool.
pub fn build_exchange(
    config: &Config,
    pool: Option<SqlitePool>,
) -> Result<Arc<dyn CredentialExchange>> {
    let exchange: Arc<dyn CredentialExchange> = match config.auth_mode {
        AuthMode::External => {
            let client = ApiClient::new(config.backend_url.clone())
                .context("Failed to build backend HTTP client")?;
            Arc::new(ExternalExchange::new(client))
        }
        AuthMode::Local => {
            let pool = pool.context("Local auth mode requires a database pool")?;
            Arc::new(LocalExchange::new(pool))
        }
    };

    info!(mode = %exchange.mode(), "Credential exchange strategy selected");
    Ok(exchange)
}
