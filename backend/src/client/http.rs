//! JSON HTTP client for the remote console backend.
//!
//! Every request carries the client's cookie jar (so the backend-scoped
//! refresh-token cookie flows on refresh), serializes its body as JSON and
//! optionally attaches a bearer token. Non-2xx responses are normalized into
//! [`HttpError::Status`], which keeps the parsed body around for callers.

use std::future::Future;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap};
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Parsed response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }

    /// Converts into a JSON value; text bodies become JSON strings.
    pub fn into_json(self) -> Value {
        match self {
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => Value::String(text),
        }
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    Status {
        status: u16,
        data: ResponseBody,
        message: String,
    },

    #[error("Request cancelled")]
    Cancelled,
}

impl HttpError {
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn data(&self) -> Option<&ResponseBody> {
        match self {
            HttpError::Status { data, .. } => Some(data),
            _ => None,
        }
    }
}

/// Per-call options for [`ApiClient::request`].
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub access_token: Option<String>,
    pub headers: HeaderMap,
    pub cancel: Option<CancellationToken>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            access_token: None,
            headers: HeaderMap::new(),
            cancel: None,
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post() -> Self {
        Self {
            method: Method::POST,
            ..Self::default()
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn bearer(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn cancel(mut self, cancel: Option<CancellationToken>) -> Self {
        self.cancel = cancel;
        self
    }
}

/// A fully-read response before any status interpretation.
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub is_json: bool,
    pub bytes: Vec<u8>,
}

impl RawResponse {
    /// JSON bodies that fail to parse collapse into an empty object.
    pub fn into_body(self) -> ResponseBody {
        if self.is_json {
            let value = serde_json::from_slice(&self.bytes)
                .unwrap_or_else(|_| Value::Object(Map::new()));
            ResponseBody::Json(value)
        } else {
            ResponseBody::Text(String::from_utf8_lossy(&self.bytes).into_owned())
        }
    }
}

/// HTTP client bound to a backend base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Creates a client with its own cookie store.
    pub fn new(base_url: impl Into<String>) -> Result<Self, HttpError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self::with_client(base_url, http))
    }

    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs pass through; relative paths are joined to the base URL.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Performs the network call and reads the whole body, without judging the status.
    pub async fn send(&self, path: &str, options: RequestOptions) -> Result<RawResponse, HttpError> {
        let RequestOptions {
            method,
            body,
            access_token,
            headers,
            cancel,
        } = options;

        let mut builder = self
            .http
            .request(method, self.url(path))
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = access_token.as_deref() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder = builder.headers(headers);
        if let Some(body) = body.as_ref() {
            builder = builder.json(body);
        }

        with_cancel(cancel.as_ref(), async move {
            let response = builder.send().await?;
            let status = response.status();
            let is_json = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value.contains("application/json"));
            let bytes = response.bytes().await?.to_vec();
            Ok(RawResponse {
                status,
                is_json,
                bytes,
            })
        })
        .await
    }

    /// Sends a request and returns the parsed body, failing on non-2xx status.
    pub async fn request(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<ResponseBody, HttpError> {
        let raw = self.send(path, options).await?;
        let status = raw.status;
        let body = raw.into_body();

        if !status.is_success() {
            let message = failure_message(status.as_u16(), &body);
            return Err(HttpError::Status {
                status: status.as_u16(),
                data: body,
                message,
            });
        }
        Ok(body)
    }
}

fn failure_message(status: u16, body: &ResponseBody) -> String {
    let from_body = match body {
        ResponseBody::Json(value) => ["error", "message"]
            .iter()
            .filter_map(|key| value.get(key).and_then(Value::as_str))
            .find(|text| !text.is_empty())
            .map(str::to_string),
        ResponseBody::Text(text) if !text.trim().is_empty() => Some(text.clone()),
        ResponseBody::Text(_) => None,
    };
    from_body.unwrap_or_else(|| format!("Request failed: {status}"))
}

async fn with_cancel<T, F>(cancel: Option<&CancellationToken>, fut: F) -> Result<T, HttpError>
where
    F: Future<Output = Result<T, HttpError>>,
{
    match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(HttpError::Cancelled),
                result = fut => result,
            }
        }
        None => fut.await,
    }
}
