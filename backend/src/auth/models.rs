//! Data structures for authentication-related entities.
//!
//! This module defines the sign-in credentials, the two identity variants
//! produced by credential exchange, and the partial update accepted by the
//! session bridge.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::database::models::UserStatus;
use crate::utils::{non_empty, normalize_boolean};

/// Sign-in credentials accepted by both exchange strategies.
///
/// The external strategy also accepts an already-issued `access_token` in
/// place of a password; the local strategy ignores everything but
/// email/password.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, alias = "rememberme", deserialize_with = "flexible_bool")]
    pub remember_me: Option<bool>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::client::types::opt_string_or_number")]
    pub userid: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default, alias = "deviceid")]
    pub device_id: Option<String>,
}

impl Credentials {
    pub fn password(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    pub fn email(&self) -> Option<&str> {
        non_empty(self.email.as_deref())
    }

    /// Passwords are compared verbatim; only an empty string counts as absent.
    pub fn password_value(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    pub fn access_token(&self) -> Option<&str> {
        non_empty(self.access_token.as_deref())
    }

    pub fn remember_me(&self) -> bool {
        self.remember_me.unwrap_or(true)
    }

    pub fn device(&self) -> &str {
        non_empty(self.device.as_deref()).unwrap_or("web")
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("remember_me", &self.remember_me)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("name", &self.name)
            .field("userid", &self.userid)
            .field("device", &self.device)
            .field("device_id", &self.device_id)
            .finish()
    }
}

fn flexible_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => Some(normalize_boolean(Some(&s), true)),
        Some(Value::Number(n)) => Some(n.as_i64() == Some(1)),
        _ => None,
    })
}

/// Identity backed by the local user directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalIdentity {
    pub id: String,
    pub email: String,
    pub name: String,
    pub status: UserStatus,
    pub role_id: String,
    pub role_name: Option<String>,
    pub avatar: Option<String>,
}

/// Identity reconstructed from the remote backend on every login.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    pub id: String,
    pub userid: String,
    pub email: String,
    pub name: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub company: Option<Value>,
    pub lang: Option<String>,
}

impl std::fmt::Debug for ExternalIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalIdentity")
            .field("id", &self.id)
            .field("userid", &self.userid)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("company", &self.company)
            .field("lang", &self.lang)
            .finish_non_exhaustive()
    }
}

/// The authorized user, in the shape of whichever strategy produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum Identity {
    Local(LocalIdentity),
    External(ExternalIdentity),
}

impl Identity {
    pub fn id(&self) -> &str {
        match self {
            Identity::Local(local) => &local.id,
            Identity::External(external) => &external.id,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Identity::Local(local) => &local.email,
            Identity::External(external) => &external.email,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Identity::Local(local) => &local.name,
            Identity::External(external) => &external.name,
        }
    }
}

/// Profile asserted by an OAuth provider after it verified the user.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct OAuthProfile {
    #[validate(email(message = "Must be a valid email"))]
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Partial fields merged into the signed session by an explicit update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Must be a valid email"))]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255, message = "Name must be between 1-255 characters"))]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

/// Body of `POST /api/auth/session`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionUpdateRequest {
    pub user: SessionUpdate,
}

/// A sign-in method offered by the active strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderInfo {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
}
