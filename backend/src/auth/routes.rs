//! Defines the HTTP routes of the session bridge.
//!
//! These routes sign users in through the active strategy, expose and update
//! the signed session and sign users out. They are designed to be nested
//! under `/api/auth` in the main Axum router.

use axum::{
    Extension, Router,
    handler::Handler,
    middleware,
    routing::{get, post},
};

use crate::auth::handlers::*;
use crate::auth::middleware::{require_session, session_context};
use crate::auth::state::AppState;

/// Creates the authentication router with all auth-related routes
pub fn auth_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/callback/credentials", post(credentials_callback))
        .route(
            "/session",
            get(get_session).post(update_session.layer(middleware::from_fn(require_session))),
        )
        .route("/signout", post(sign_out))
        .route("/providers", get(providers));

    // Google routes only exist when Google sign-in is configured
    if state.google.is_some() {
        router = router
            .route("/google/login", get(google_login))
            .route("/google/callback", get(google_callback));
    }

    router
        .layer(middleware::from_fn(session_context))
        .layer(Extension(state))
}
