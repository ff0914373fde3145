//! Error handling utilities for API responses.
//!
//! Provides the standard response envelope and the conversion from
//! `AuthError` into HTTP responses.
//!
//! # Response Format
//! All errors return consistent JSON responses containing:
//! - `message`: Human-readable message, rendered verbatim by the console
//! - `error.error_type`: Machine-readable error category
//! - `error.code`: HTTP-like code of the failure (may differ from the
//!   response status when the backend supplied its own code)
//! - `error.details`: Optional field-specific validation errors

use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::errors::{AuthError, ErrorPayload};

/// Standard API response wrapper for all endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Indicates if the request was successful
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable message
    pub message: String,
    /// Error details (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
    /// Request timestamp
    pub timestamp: String,
}

/// Error details for failed requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error type identifier
    pub error_type: String,
    /// HTTP-like code of the failure
    pub code: u16,
    /// Field-specific validation errors when applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

/// Field-specific validation error details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the field with validation error
    pub field: String,
    /// Description of the validation failure
    pub message: String,
}

/// Error half of every handler's `Result`.
pub type HttpFailure = (StatusCode, Json<ApiResponse<()>>);

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create a successful response with default message
    pub fn ok(data: T) -> Self {
        Self::success(data, "Request successful")
    }

    /// Create an error response
    pub fn error(
        message: impl Into<String>,
        error_type: impl Into<String>,
        code: u16,
        details: Option<Vec<FieldError>>,
    ) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message: message.into(),
            error: Some(ErrorDetails {
                error_type: error_type.into(),
                code,
                details,
            }),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Structured `{code, message, kind}` carried by a failed response.
    pub fn error_payload(&self) -> Option<ErrorPayload> {
        self.error.as_ref().map(|error| ErrorPayload {
            code: error.code,
            message: self.message.clone(),
            kind: Some(error.error_type.clone()),
        })
    }
}

/// Converts AuthError to appropriate HTTP response with standard format
pub fn auth_error_to_http(error: AuthError) -> HttpFailure {
    match &error {
        AuthError::Database { source } => tracing::error!("Database error: {}", source),
        AuthError::Session { message } | AuthError::Internal { message } => {
            tracing::error!("Internal error: {}", message)
        }
        _ => {}
    }

    let payload = error.payload();
    // Backend codes below 400 still describe a failure.
    let status = match StatusCode::from_u16(payload.code) {
        Ok(status) if status.is_client_error() || status.is_server_error() => status,
        Ok(_) => StatusCode::BAD_REQUEST,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = ApiResponse::<()>::error(
        payload.message,
        payload.kind.unwrap_or_else(|| "error".to_string()),
        payload.code,
        None,
    );
    (status, Json(body))
}

/// Formats validator::ValidationErrors into field-specific error details
pub fn validation_errors_to_field_errors(errors: validator::ValidationErrors) -> Vec<FieldError> {
    errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| FieldError {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .unwrap_or(&"Invalid value".into())
                    .to_string(),
            })
        })
        .collect()
}

/// Helper to create validation error response
pub fn validation_error_response(errors: validator::ValidationErrors) -> HttpFailure {
    let field_errors = validation_errors_to_field_errors(errors);
    let error_response = ApiResponse::<()>::error(
        "Validation failed",
        "validation_error",
        StatusCode::BAD_REQUEST.as_u16(),
        Some(field_errors),
    );
    (StatusCode::BAD_REQUEST, Json(error_response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::SessionUpdate;
    use validator::Validate;

    #[test]
    fn test_auth_error_maps_to_status_and_payload() {
        let (status, Json(body)) = auth_error_to_http(AuthError::UserNotFound);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!body.success);
        assert_eq!(body.message, "User not found. Please register first.");

        let payload = body.error_payload().unwrap();
        assert_eq!(payload.code, 404);
        assert_eq!(payload.kind.as_deref(), Some("user_not_found"));
    }

    #[test]
    fn test_backend_code_outside_http_range_falls_back() {
        let (status, Json(body)) = auth_error_to_http(AuthError::LoginRejected {
            code: 1001,
            message: "Locked".to_string(),
        });
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.unwrap().code, 1001);
        assert_eq!(body.message, "Locked");

        let (status, Json(body)) = auth_error_to_http(AuthError::LoginRejected {
            code: 200,
            message: "Locked".to_string(),
        });
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.unwrap().code, 200);
    }

    #[test]
    fn test_validation_errors_are_listed_per_field() {
        let update = SessionUpdate {
            email: Some("nope".to_string()),
            ..SessionUpdate::default()
        };
        let (status, Json(body)) = validation_error_response(update.validate().unwrap_err());
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let details = body.error.unwrap().details.unwrap();
        assert_eq!(details[0].field, "email");
        assert_eq!(details[0].message, "Must be a valid email");
    }
}
