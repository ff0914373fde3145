//! Global application error types.
//!
//! `AuthError` is the single taxonomy surfaced by the credential exchange
//! strategies, the session bridge and the client-side auth cache. Every
//! variant maps to an HTTP-like `code` and a user-facing `message`, and can
//! be rendered to (and rebuilt from) the structured `{code, message, kind}`
//! payload that travels over HTTP.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::http::HttpError;

pub const MSG_MISSING_CREDENTIALS: &str = "Please enter both email and password.";
pub const MSG_UNREACHABLE: &str = "Unable to reach authentication service.";
pub const MSG_MALFORMED: &str = "Unexpected response from authentication service.";
pub const MSG_LOGIN_REJECTED: &str = "Login failed. Please check your credentials.";
pub const MSG_INCOMPLETE: &str =
    "Incomplete login response received from authentication service.";
pub const MSG_TOKEN_VALIDATION: &str = "Token validation failed";
pub const MSG_USER_NOT_FOUND: &str = "User not found. Please register first.";
pub const MSG_INVALID_CREDENTIALS: &str = "Invalid credentials. Incorrect password.";
pub const MSG_NOT_ACTIVE: &str = "Account not activated. Please verify your email.";
pub const MSG_NO_DEFAULT_ROLE: &str = "Default role not found. Unable to create a new user.";
pub const MSG_REFRESH_MISSING: &str = "accessToken missing";
pub const MSG_SESSION_REQUIRED: &str = "No active session.";

/// Authentication and session errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{}", MSG_MISSING_CREDENTIALS)]
    MissingCredentials,

    #[error("{}", MSG_UNREACHABLE)]
    AuthServiceUnreachable,

    #[error("{}", MSG_MALFORMED)]
    MalformedAuthResponse { status: u16 },

    #[error("{message}")]
    LoginRejected { code: u16, message: String },

    #[error("{}", MSG_INCOMPLETE)]
    IncompleteLoginResponse,

    #[error("{}", MSG_TOKEN_VALIDATION)]
    TokenValidationFailed { status: u16 },

    #[error("{}", MSG_USER_NOT_FOUND)]
    UserNotFound,

    #[error("{}", MSG_INVALID_CREDENTIALS)]
    InvalidCredentials,

    #[error("{}", MSG_NOT_ACTIVE)]
    AccountNotActive,

    #[error("{}", MSG_NO_DEFAULT_ROLE)]
    NoDefaultRole,

    #[error("{}", MSG_REFRESH_MISSING)]
    RefreshTokenMissing,

    #[error("{}", MSG_SESSION_REQUIRED)]
    SessionRequired,

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("OAuth error: {message}")]
    OAuth { message: String },

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("Database error: {source}")]
    Database {
        #[from]
        source: anyhow::Error,
    },

    #[error("Session error: {message}")]
    Session { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Failure of the best-effort profile fetch that follows a login.
///
/// Kept apart from [`AuthError`]: a login that only fails here still succeeds.
#[derive(Debug, Error)]
pub enum ProfileFetchError {
    #[error("Profile request failed: {0}")]
    Request(#[from] HttpError),

    #[error("Profile response has no profile object")]
    MissingProfile,

    #[error("Profile could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Wire form of an [`AuthError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl AuthError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn oauth(message: impl Into<String>) -> Self {
        Self::OAuth {
            message: message.into(),
        }
    }

    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP-equivalent status code for this failure.
    pub fn code(&self) -> u16 {
        match self {
            AuthError::MissingCredentials => 400,
            AuthError::AuthServiceUnreachable => 503,
            AuthError::MalformedAuthResponse { status } => {
                if *status == 0 {
                    500
                } else {
                    *status
                }
            }
            AuthError::LoginRejected { code, .. } => *code,
            AuthError::IncompleteLoginResponse => 500,
            AuthError::TokenValidationFailed { status } => *status,
            AuthError::UserNotFound => 404,
            AuthError::InvalidCredentials => 401,
            AuthError::AccountNotActive => 403,
            AuthError::NoDefaultRole => 500,
            AuthError::RefreshTokenMissing => 502,
            AuthError::SessionRequired => 401,
            AuthError::Validation { .. } => 400,
            AuthError::OAuth { .. } => 400,
            AuthError::Http(HttpError::Cancelled) => 499,
            AuthError::Http(err) => err.status().unwrap_or(503),
            AuthError::Database { .. } | AuthError::Session { .. } | AuthError::Internal { .. } => {
                500
            }
        }
    }

    /// User-facing message. Internal failures never leak their details.
    pub fn message(&self) -> String {
        match self {
            AuthError::Database { .. } | AuthError::Session { .. } | AuthError::Internal { .. } => {
                "Internal server error".to_string()
            }
            AuthError::Validation { message } | AuthError::OAuth { message } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Machine-readable tag used to rebuild the error on the other side of the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::AuthServiceUnreachable => "auth_service_unreachable",
            AuthError::MalformedAuthResponse { .. } => "malformed_auth_response",
            AuthError::LoginRejected { .. } => "login_rejected",
            AuthError::IncompleteLoginResponse => "incomplete_login_response",
            AuthError::TokenValidationFailed { .. } => "token_validation_failed",
            AuthError::UserNotFound => "user_not_found",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::AccountNotActive => "account_not_active",
            AuthError::NoDefaultRole => "no_default_role",
            AuthError::RefreshTokenMissing => "refresh_token_missing",
            AuthError::SessionRequired => "session_required",
            AuthError::Validation { .. } => "validation_error",
            AuthError::OAuth { .. } => "oauth_error",
            AuthError::Http(_) => "http_error",
            AuthError::Database { .. } => "database_error",
            AuthError::Session { .. } => "session_error",
            AuthError::Internal { .. } => "internal_error",
        }
    }

    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code(),
            message: self.message(),
            kind: Some(self.kind().to_string()),
        }
    }

    /// Rebuilds a typed error from a structured payload. Unknown kinds are
    /// treated as a rejection carrying the payload's code and message.
    pub fn from_payload(payload: ErrorPayload) -> Self {
        let ErrorPayload {
            code,
            message,
            kind,
        } = payload;
        match kind.as_deref() {
            Some("missing_credentials") => AuthError::MissingCredentials,
            Some("auth_service_unreachable") => AuthError::AuthServiceUnreachable,
            Some("malformed_auth_response") => AuthError::MalformedAuthResponse { status: code },
            Some("incomplete_login_response") => AuthError::IncompleteLoginResponse,
            Some("token_validation_failed") => AuthError::TokenValidationFailed { status: code },
            Some("user_not_found") => AuthError::UserNotFound,
            Some("invalid_credentials") => AuthError::InvalidCredentials,
            Some("account_not_active") => AuthError::AccountNotActive,
            Some("no_default_role") => AuthError::NoDefaultRole,
            Some("refresh_token_missing") => AuthError::RefreshTokenMissing,
            Some("session_required") => AuthError::SessionRequired,
            Some("validation_error") => AuthError::Validation { message },
            Some("oauth_error") => AuthError::OAuth { message },
            _ => AuthError::LoginRejected { code, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_messages() {
        assert_eq!(AuthError::InvalidCredentials.code(), 401);
        assert_eq!(
            AuthError::InvalidCredentials.message(),
            "Invalid credentials. Incorrect password."
        );
        assert_eq!(AuthError::UserNotFound.code(), 404);
        assert_eq!(AuthError::AccountNotActive.code(), 403);
        assert_eq!(AuthError::AuthServiceUnreachable.code(), 503);
        assert_eq!(AuthError::MalformedAuthResponse { status: 0 }.code(), 500);
        assert_eq!(AuthError::MalformedAuthResponse { status: 502 }.code(), 502);
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = AuthError::Database {
            source: anyhow::anyhow!("disk I/O error at /var/lib/console.db"),
        };
        assert_eq!(err.code(), 500);
        assert_eq!(err.message(), "Internal server error");
    }

    #[test]
    fn test_payload_rebuilds_typed_error() {
        let payload = AuthError::TokenValidationFailed { status: 401 }.payload();
        assert_eq!(payload.code, 401);
        assert_eq!(payload.message, "Token validation failed");

        let rebuilt = AuthError::from_payload(payload);
        assert!(matches!(
            rebuilt,
            AuthError::TokenValidationFailed { status: 401 }
        ));
    }

    #[test]
    fn test_unknown_payload_becomes_rejection() {
        let rebuilt = AuthError::from_payload(ErrorPayload {
            code: 423,
            message: "Locked".to_string(),
            kind: None,
        });
        match rebuilt {
            AuthError::LoginRejected { code, message } => {
                assert_eq!(code, 423);
                assert_eq!(message, "Locked");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
