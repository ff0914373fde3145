//! Rust structs that represent database table mappings.
//!
//! These models define the local user directory as it is stored in and
//! retrieved from SQLite. They differ from the identity and session types in
//! `auth::models`, which are what the rest of the application sees.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")] // Store as TEXT in SQLite
#[serde(rename_all = "UPPERCASE")]
pub enum UserStatus {
    Active,
    Pending,
    Suspended,
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserStatus::Active => write!(f, "ACTIVE"),
            UserStatus::Pending => write!(f, "PENDING"),
            UserStatus::Suspended => write!(f, "SUSPENDED"),
        }
    }
}

impl std::str::FromStr for UserStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(UserStatus::Active),
            "PENDING" => Ok(UserStatus::Pending),
            "SUSPENDED" => Ok(UserStatus::Suspended),
            _ => Err(format!("Invalid user status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar: Option<String>,
    pub role_id: String,
    pub status: UserStatus,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRole {
    pub id: String,
    pub name: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Directory record created from a verified OAuth profile.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOAuthUser {
    #[validate(length(min = 1, message = "User ID is required"))]
    pub id: String,

    #[validate(
        email(message = "Must be a valid email"),
        length(max = 255, message = "Email too long")
    )]
    pub email: String,

    pub name: Option<String>,

    pub avatar: Option<String>,

    #[validate(length(min = 1, message = "Role ID is required"))]
    pub role_id: String,
}

/// Pending OAuth authorization (CSRF state + PKCE verifier).
#[derive(Debug, Clone, FromRow)]
pub struct OAuthState {
    pub state: String,
    pub provider: String,
    pub pkce_verifier: String,
    pub expires_at: DateTime<Utc>,
}
