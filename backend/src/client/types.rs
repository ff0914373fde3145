//! Wire schemas of the remote console backend.
//!
//! The backend's JSON is loosely shaped, so every field is optional and the
//! consumers decide the fallbacks.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

/// Body of `POST /auth/login`.
#[derive(Clone, PartialEq)]
pub struct LoginRequestBody {
    pub email: String,
    pub password: String,
    pub rememberme: bool,
    pub device: String,
    pub deviceid: Option<String>,
}

impl LoginRequestBody {
    /// Wire form; `deviceid` is omitted when unknown.
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "email": self.email,
            "password": self.password,
            "rememberme": self.rememberme,
            "device": self.device,
        });
        if let Some(deviceid) = &self.deviceid {
            body["deviceid"] = json!(deviceid);
        }
        body
    }
}

impl std::fmt::Debug for LoginRequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequestBody")
            .field("email", &self.email)
            .field("rememberme", &self.rememberme)
            .field("device", &self.device)
            .field("deviceid", &self.deviceid)
            .finish_non_exhaustive()
    }
}

/// Envelope returned by `POST /auth/login`.
///
/// Every field is read leniently: a value of the wrong type counts as absent
/// instead of failing the whole body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginEnvelope {
    #[serde(default, deserialize_with = "lenient")]
    pub success: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub data: Option<LoginData>,
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<StatusBlock>,
}

impl LoginEnvelope {
    /// Reads any JSON value; non-objects yield an empty envelope.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusBlock {
    #[serde(default, deserialize_with = "lenient")]
    pub code: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    #[serde(default, deserialize_with = "lenient")]
    pub access_token: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub refresh_token: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub userid: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub info: Option<LoginInfo>,
    /// Passed through untouched, whatever its shape.
    #[serde(default)]
    pub company: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoginInfo {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub email: Option<String>,
}

impl LoginInfo {
    /// Explicit `name`, else `firstName lastName` with empty parts dropped.
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return Some(name.to_string());
        }
        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!joined.is_empty()).then_some(joined)
    }
}

/// Body of `POST /auth/refresh-token`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshData {
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Unwraps a `{ data: ... }` envelope, falling back to the value itself.
pub fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) if !data.is_null() => data,
            Some(_) | None => Value::Object(map),
        },
        other => other,
    }
}

/// `T` if the value has the right shape, `None` otherwise.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}

pub(crate) fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
