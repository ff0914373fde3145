//! Middleware that materializes the signed session for each request.
//!
//! `session_context` never rejects: it decodes the session cookie if there is
//! a valid one and injects a [`SessionContext`] either way. Routes that need a
//! signed-in user additionally go through `require_session`.

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use tracing::debug;

use crate::api::common::auth_error_to_http;
use crate::auth::session::SessionClaims;
use crate::auth::state::AppState;
use crate::errors::AuthError;

/// Per-request view of the signed session.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub claims: Option<SessionClaims>,
}

impl SessionContext {
    pub fn is_active(&self) -> bool {
        self.claims.is_some()
    }
}

/// Decodes the session cookie into request extensions.
pub async fn session_context(
    Extension(state): Extension<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let claims = jar.get(&state.cookie_name).and_then(|cookie| {
        state
            .bridge
            .verify(cookie.value())
            .map_err(|e| debug!(error = %e, "Ignoring invalid session cookie"))
            .ok()
    });

    request.extensions_mut().insert(SessionContext { claims });
    next.run(request).await
}

/// Rejects requests without an active session
pub async fn require_session(request: Request, next: Next) -> Response {
    let active = request
        .extensions()
        .get::<SessionContext>()
        .is_some_and(SessionContext::is_active);

    if !active {
        return auth_error_to_http(AuthError::SessionRequired).into_response();
    }

    next.run(request).await
}
