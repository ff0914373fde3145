//! Google sign-in for the local directory.
//!
//! Authorization Code flow with PKCE. The CSRF state and verifier are kept in
//! `oauth_states` for ten minutes and consumed exactly once by the callback.
//! The verified Google profile is then linked to a directory record.

use chrono::{Duration, Utc};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::auth::local::LocalExchange;
use crate::auth::models::{LocalIdentity, OAuthProfile, ProviderInfo};
use crate::config::GoogleConfig;
use crate::errors::{AuthError, AuthResult};
use crate::repositories::oauth_state_repository::OAuthStateRepository;

pub const GOOGLE_PROVIDER: ProviderInfo = ProviderInfo {
    id: "google",
    name: "Google",
    kind: "oauth",
};

const PROVIDER: &str = "google";
const STATE_TTL_MINUTES: i64 = 10;

type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Google endpoints; overridable so the flow can run against a stand-in server.
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
        }
    }
}

pub struct GoogleOAuth {
    client: ConfiguredClient,
    http: reqwest::Client,
    userinfo_url: String,
    directory: LocalExchange,
}

impl GoogleOAuth {
    pub fn new(config: &GoogleConfig, pool: SqlitePool) -> AuthResult<Self> {
        Self::with_endpoints(config, pool, GoogleEndpoints::default())
    }

    pub fn with_endpoints(
        config: &GoogleConfig,
        pool: SqlitePool,
        endpoints: GoogleEndpoints,
    ) -> AuthResult<Self> {
        let auth_url = AuthUrl::new(endpoints.auth_url)
            .map_err(|e| AuthError::internal(format!("Invalid Google auth URL: {e}")))?;
        let token_url = TokenUrl::new(endpoints.token_url)
            .map_err(|e| AuthError::internal(format!("Invalid Google token URL: {e}")))?;
        let redirect_url = RedirectUrl::new(config.redirect_uri.clone())
            .map_err(|e| AuthError::internal(format!("Invalid redirect URI: {e}")))?;

        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::internal(format!("Failed to build OAuth HTTP client: {e}")))?;

        Ok(Self {
            client,
            http,
            userinfo_url: endpoints.userinfo_url,
            directory: LocalExchange::new(pool),
        })
    }

    /// Builds the consent URL and records its state and PKCE verifier.
    pub async fn authorization_url(&self) -> AuthResult<String> {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        let now = Utc::now();
        OAuthStateRepository::new(self.directory.pool())
            .store(
                csrf_state.secret(),
                PROVIDER,
                pkce_verifier.secret(),
                now,
                now + Duration::minutes(STATE_TTL_MINUTES),
            )
            .await?;

        Ok(auth_url.to_string())
    }

    /// Completes the callback: consumes the state, redeems the code, fetches
    /// the Google profile and links it to the directory.
    pub async fn complete(&self, code: &str, state: &str) -> AuthResult<LocalIdentity> {
        let verifier = OAuthStateRepository::new(self.directory.pool())
            .take(state, PROVIDER, Utc::now())
            .await?
            .ok_or_else(|| {
                warn!("Google callback with unknown or expired state");
                AuthError::oauth("Invalid or expired OAuth state")
            })?;

        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(verifier))
            .request_async(&self.http)
            .await
            .map_err(|e| {
                warn!(error = %e, "Google token exchange failed");
                AuthError::oauth("Token exchange failed")
            })?;

        let profile: OAuthProfile = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                warn!(error = %e, "Google userinfo request failed");
                AuthError::oauth("Unable to load Google profile")
            })?
            .json()
            .await
            .map_err(|e| {
                warn!(error = %e, "Google userinfo response unreadable");
                AuthError::oauth("Unable to load Google profile")
            })?;

        let identity = self.directory.link_profile(profile).await?;
        info!(user_id = %identity.id, "Google sign-in linked");
        Ok(identity)
    }
}
