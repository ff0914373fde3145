//! Keeps the bridge's cookie session in step with the auth cache.

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::api::common::ApiResponse;
use crate::client::http::{ApiClient, HttpError, RequestOptions, ResponseBody};
use crate::errors::{AuthError, AuthResult};

pub const CREDENTIALS_CALLBACK_PATH: &str = "/callback/credentials";
pub const SIGNOUT_PATH: &str = "/signout";

/// Token-flow sign-in handed to the bridge after the backend issued a token.
#[derive(Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRegistration {
    pub email: Option<String>,
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub userid: Option<String>,
}

impl std::fmt::Debug for SessionRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistration")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("userid", &self.userid)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait SessionRegistrar: Send + Sync {
    async fn register(
        &self,
        registration: SessionRegistration,
        cancel: Option<CancellationToken>,
    ) -> AuthResult<()>;

    async fn clear(&self, cancel: Option<CancellationToken>) -> AuthResult<()>;
}

/// Talks to the bridge's HTTP surface. The bridge cookie lives in the
/// client's own jar.
pub struct BridgeRegistrar {
    client: ApiClient,
}

impl BridgeRegistrar {
    /// `base_url` is where the bridge routes are mounted, e.g. `http://localhost:3000/api/auth`.
    pub fn new(base_url: impl Into<String>) -> AuthResult<Self> {
        Ok(Self {
            client: ApiClient::new(base_url)?,
        })
    }
}

#[async_trait]
impl SessionRegistrar for BridgeRegistrar {
    async fn register(
        &self,
        registration: SessionRegistration,
        cancel: Option<CancellationToken>,
    ) -> AuthResult<()> {
        let body = serde_json::to_value(&registration)
            .map_err(|e| AuthError::internal(format!("Failed to encode registration: {e}")))?;
        self.client
            .request(
                CREDENTIALS_CALLBACK_PATH,
                RequestOptions::post().json(body).cancel(cancel),
            )
            .await
            .map(|_| ())
            .map_err(bridge_error)
    }

    async fn clear(&self, cancel: Option<CancellationToken>) -> AuthResult<()> {
        self.client
            .request(SIGNOUT_PATH, RequestOptions::post().cancel(cancel))
            .await
            .map(|_| ())
            .map_err(bridge_error)
    }
}

/// Rebuilds the typed error from the bridge's structured failure body.
fn bridge_error(error: HttpError) -> AuthError {
    let payload = match &error {
        HttpError::Status {
            data: ResponseBody::Json(value),
            ..
        } => serde_json::from_value::<ApiResponse<serde_json::Value>>(value.clone())
            .ok()
            .and_then(|response| response.error_payload()),
        _ => None,
    };
    match payload {
        Some(payload) => AuthError::from_payload(payload),
        None => AuthError::Http(error),
    }
}
