//! State of the client-side auth cache.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// The signed-in user as the UI renders it. Profile fields beyond the
/// basics are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedUser {
    #[serde(default, deserialize_with = "crate::client::types::opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Volatile, never persisted. After a reload the UI re-derives who is
/// signed in from the bridge session, not from this cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<CachedUser>,
    pub access_token: Option<String>,
    pub status: AuthStatus,
    pub error: Option<String>,
}

impl AuthState {
    pub fn is_signed_in(&self) -> bool {
        self.user.is_some() && self.access_token.is_some()
    }
}
