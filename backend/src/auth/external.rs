//! Credential exchange delegated to the remote console backend.
//!
//! The backend owns the user directory. A password login mints a token pair,
//! a bare access token is only validated. Every failure is mapped onto the
//! `AuthError` taxonomy so the caller sees a `{code, message}` it can render.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::auth::exchange::CredentialExchange;
use crate::auth::models::{Credentials, ExternalIdentity, Identity};
use crate::client::ApiClient;
use crate::client::http::HttpError;
use crate::client::types::{LoginEnvelope, LoginRequestBody};
use crate::config::AuthMode;
use crate::errors::{AuthError, AuthResult, MSG_LOGIN_REJECTED};
use crate::utils::non_empty;

pub struct ExternalExchange {
    client: ApiClient,
}

impl ExternalExchange {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Authorizes against the backend, honouring an optional cancellation handle.
    pub async fn login(
        &self,
        credentials: Credentials,
        cancel: Option<CancellationToken>,
    ) -> AuthResult<ExternalIdentity> {
        let email = credentials
            .email()
            .ok_or(AuthError::MissingCredentials)?
            .to_string();

        if let (Some(token), None) = (credentials.access_token(), credentials.password_value()) {
            return self.validate_bearer(&credentials, &email, token, cancel).await;
        }

        let password = credentials
            .password_value()
            .ok_or(AuthError::MissingCredentials)?;

        let body = LoginRequestBody {
            email: email.clone(),
            password: password.to_string(),
            rememberme: credentials.remember_me(),
            device: credentials.device().to_string(),
            deviceid: non_empty(credentials.device_id.as_deref()).map(str::to_string),
        };
        let raw = match self.client.login_request(&body, cancel).await {
            Ok(raw) => raw,
            Err(HttpError::Cancelled) => return Err(HttpError::Cancelled.into()),
            Err(e) => {
                error!(email = %email, error = %e, "Authentication service unreachable");
                return Err(AuthError::AuthServiceUnreachable);
            }
        };

        let status = raw.status;
        let payload: Value = serde_json::from_slice(&raw.bytes).map_err(|e| {
            error!(status = status.as_u16(), error = %e, "Unparsable login response");
            AuthError::MalformedAuthResponse {
                status: status.as_u16(),
            }
        })?;
        let envelope = LoginEnvelope::from_value(payload);

        if !status.is_success() || envelope.success == Some(false) {
            let code = envelope
                .status
                .as_ref()
                .and_then(|block| block.code)
                .filter(|code| *code != 0)
                .unwrap_or(status.as_u16());
            let message = envelope
                .message
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| MSG_LOGIN_REJECTED.to_string());
            warn!(email = %email, code, "Login rejected by authentication service");
            return Err(AuthError::LoginRejected { code, message });
        }

        let data = envelope.data.unwrap_or_default();
        let (Some(access_token), Some(userid)) = (
            data.access_token.filter(|t| !t.is_empty()),
            data.userid.filter(|u| !u.is_empty()),
        ) else {
            error!(email = %email, "Login response lacks accessToken or userid");
            return Err(AuthError::IncompleteLoginResponse);
        };

        let info = data.info.unwrap_or_default();
        let identity = ExternalIdentity {
            id: userid.clone(),
            userid,
            email: info
                .email
                .clone()
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| email.clone()),
            name: info.display_name().unwrap_or_else(|| email.clone()),
            access_token,
            refresh_token: data.refresh_token,
            company: data.company,
            lang: data.lang,
        };

        info!(userid = %identity.userid, "External login succeeded");
        Ok(identity)
    }

    /// Token flow: the backend only confirms the bearer, no new token is minted.
    async fn validate_bearer(
        &self,
        credentials: &Credentials,
        email: &str,
        token: &str,
        cancel: Option<CancellationToken>,
    ) -> AuthResult<ExternalIdentity> {
        match self.client.validate_token(token, cancel).await {
            Ok(()) => {}
            Err(HttpError::Status { status, .. }) => {
                warn!(email = %email, status, "Bearer token rejected");
                return Err(AuthError::TokenValidationFailed { status });
            }
            Err(HttpError::Cancelled) => return Err(HttpError::Cancelled.into()),
            Err(e) => {
                error!(email = %email, error = %e, "Token validation endpoint unreachable");
                return Err(AuthError::AuthServiceUnreachable);
            }
        }

        let id = non_empty(credentials.userid.as_deref())
            .unwrap_or(email)
            .to_string();
        info!(userid = %id, "Bearer token validated");

        Ok(ExternalIdentity {
            id: id.clone(),
            userid: id,
            email: email.to_string(),
            name: non_empty(credentials.name.as_deref())
                .unwrap_or("User")
                .to_string(),
            access_token: token.to_string(),
            refresh_token: None,
            company: None,
            lang: None,
        })
    }
}

#[async_trait]
impl CredentialExchange for ExternalExchange {
    fn mode(&self) -> AuthMode {
        AuthMode::External
    }

    async fn authorize(&self, credentials: Credentials) -> AuthResult<Identity> {
        self.login(credentials, None).await.map(Identity::External)
    }
}
