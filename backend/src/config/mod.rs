//! Central module for application-wide configuration settings.
//!
//! This module loads the identity strategy toggle, the remote backend URL,
//! the session signing secret and the optional Google OAuth credentials.
//! Configuration is resolved once at startup and injected into dependents.

use anyhow::{Context, Result};
use std::env;

use crate::utils::normalize_boolean;

/// Default remote backend used when no URL is configured.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5001/api/v10";

/// Lifetime of the signed session cookie. Fixed at 24 hours.
pub const SESSION_MAX_AGE_SECONDS: i64 = 24 * 60 * 60;

/// Which identity source backs credential exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Delegate identity to the remote backend and bridge its bearer tokens.
    External,
    /// Use the local user directory (password + OAuth profile linking).
    Local,
}

impl AuthMode {
    pub fn from_flag(flag: Option<&str>) -> Self {
        if normalize_boolean(flag, false) {
            AuthMode::External
        } else {
            AuthMode::Local
        }
    }

    pub fn is_external(self) -> bool {
        self == AuthMode::External
    }
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMode::External => write!(f, "external"),
            AuthMode::Local => write!(f, "local"),
        }
    }
}

/// Google OAuth client settings. Present only when both id and secret are set.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub auth_mode: AuthMode,
    pub backend_url: String,
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub session_secret: String,
    pub session_cookie_name: String,
    pub session_cookie_secure: bool,
    pub server_port: u16,
    pub google: Option<GoogleConfig>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let auth_mode = AuthMode::from_flag(env::var("EXTERNAL_AUTH").ok().as_deref());

        let backend_url = env::var("BACKEND_URL")
            .or_else(|_| env::var("NEXT_PUBLIC_BACKEND_URL"))
            .unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://console.db".to_string());

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("DB_MAX_CONNECTIONS must be a valid number")?;

        let acquire_timeout_seconds = env::var("DB_ACQUIRE_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u64>()
            .context("DB_ACQUIRE_TIMEOUT_SECONDS must be a valid number")?;

        let session_secret = env::var("SESSION_SECRET").context("SESSION_SECRET not set")?;

        let session_cookie_name = env::var("SESSION_COOKIE_NAME")
            .unwrap_or_else(|_| "console.session-token".to_string());

        let session_cookie_secure =
            normalize_boolean(env::var("SESSION_COOKIE_SECURE").ok().as_deref(), false);

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("SERVER_PORT must be a valid number")?;

        let google = match (
            env::var("GOOGLE_CLIENT_ID"),
            env::var("GOOGLE_CLIENT_SECRET"),
        ) {
            (Ok(client_id), Ok(client_secret))
                if !client_id.trim().is_empty() && !client_secret.trim().is_empty() =>
            {
                let redirect_uri = env::var("AUTH_REDIRECT_URI").unwrap_or_else(|_| {
                    format!("http://localhost:{server_port}/api/auth/google/callback")
                });
                Some(GoogleConfig {
                    client_id,
                    client_secret,
                    redirect_uri,
                })
            }
            _ => None,
        };

        Ok(Config {
            auth_mode,
            backend_url,
            database_url,
            max_connections,
            acquire_timeout_seconds,
            session_secret,
            session_cookie_name,
            session_cookie_secure,
            server_port,
            google,
        })
    }

    /// Google profile linking is only offered on top of the local directory.
    pub fn google_enabled(&self) -> bool {
        self.auth_mode == AuthMode::Local && self.google.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_mode_from_flag() {
        assert_eq!(AuthMode::from_flag(Some("true")), AuthMode::External);
        assert_eq!(AuthMode::from_flag(Some(" YES ")), AuthMode::External);
        assert_eq!(AuthMode::from_flag(Some("1")), AuthMode::External);
        assert_eq!(AuthMode::from_flag(Some("false")), AuthMode::Local);
        assert_eq!(AuthMode::from_flag(Some("")), AuthMode::Local);
        assert_eq!(AuthMode::from_flag(None), AuthMode::Local);
    }
}
