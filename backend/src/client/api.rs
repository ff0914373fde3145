//! Typed wrappers for the backend's auth and profile endpoints.

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::http::{ApiClient, HttpError, RawResponse, RequestOptions};
use super::types::{LoginRequestBody, RefreshData, unwrap_data};

pub const LOGIN_PATH: &str = "/auth/login";
pub const VALIDATE_PATH: &str = "/auth/validate";
pub const REFRESH_PATH: &str = "/auth/refresh-token";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const PROFILE_PATH: &str = "/profile/me";

impl ApiClient {
    /// `POST /auth/login`. The status is not judged here: the caller reads
    /// rejection details out of the body.
    pub async fn login_request(
        &self,
        body: &LoginRequestBody,
        cancel: Option<CancellationToken>,
    ) -> Result<RawResponse, HttpError> {
        self.send(
            LOGIN_PATH,
            RequestOptions::post().json(body.to_json()).cancel(cancel),
        )
        .await
    }

    /// `GET /auth/validate` with the bearer token. Succeeds on any 2xx.
    pub async fn validate_token(
        &self,
        access_token: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<(), HttpError> {
        self.request(
            VALIDATE_PATH,
            RequestOptions::get().bearer(access_token).cancel(cancel),
        )
        .await
        .map(|_| ())
    }

    /// `POST /auth/refresh-token`; the refresh token travels in the cookie jar.
    pub async fn refresh_access_token(
        &self,
        cancel: Option<CancellationToken>,
    ) -> Result<RefreshData, HttpError> {
        let response = self
            .request(REFRESH_PATH, RequestOptions::post().cancel(cancel))
            .await?;
        let data = unwrap_data(response.into_json());
        Ok(serde_json::from_value(data).unwrap_or_default())
    }

    /// `POST /auth/logout` for the given bearer token.
    pub async fn logout_request(
        &self,
        access_token: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<(), HttpError> {
        self.request(
            LOGOUT_PATH,
            RequestOptions::post().bearer(access_token).cancel(cancel),
        )
        .await
        .map(|_| ())
    }

    /// `GET /profile/me`, returning the unwrapped `data` object.
    pub async fn get_me(
        &self,
        access_token: &str,
        cancel: Option<CancellationToken>,
    ) -> Result<Value, HttpError> {
        let response = self
            .request(
                PROFILE_PATH,
                RequestOptions::get().bearer(access_token).cancel(cancel),
            )
            .await?;
        Ok(unwrap_data(response.into_json()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_login_request_sends_contract_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .and(body_json(json!({
                "email": "ahmet@example.com",
                "password": "pw",
                "rememberme": true,
                "device": "web",
                "deviceid": "dev-1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let body = LoginRequestBody {
            email: "ahmet@example.com".to_string(),
            password: "pw".to_string(),
            rememberme: true,
            device: "web".to_string(),
            deviceid: Some("dev-1".to_string()),
        };
        let response = client.login_request(&body, None).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(
            serde_json::from_slice::<Value>(&response.bytes).unwrap(),
            json!({ "success": true })
        );
    }

    #[tokio::test]
    async fn test_login_request_returns_rejections_unjudged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "No" })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let body = LoginRequestBody {
            email: "a@example.com".to_string(),
            password: "pw".to_string(),
            rememberme: false,
            device: "web".to_string(),
            deviceid: None,
        };
        let response = client.login_request(&body, None).await.unwrap();
        assert_eq!(response.status, 401);
    }

    #[tokio::test]
    async fn test_refresh_reads_nested_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "accessToken": "new" } })),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let refreshed = client.refresh_access_token(None).await.unwrap();
        assert_eq!(refreshed.access_token.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_get_me_unwraps_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PROFILE_PATH))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "profile": { "id": "u1", "email": "a@b.c" } }
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let me = client.get_me("tok", None).await.unwrap();
        assert_eq!(me["profile"]["id"], "u1");
    }

    #[tokio::test]
    async fn test_validate_token_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(VALIDATE_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let err = client.validate_token("expired", None).await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }
}
