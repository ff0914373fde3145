//! Handler functions for the session bridge endpoints.
//!
//! These functions run the active credential exchange, mint or clear the
//! signed session cookie and project the session for the console.

use axum::{
    extract::{Extension, Json, Query, rejection::JsonRejection},
    http::StatusCode,
    response::{Json as ResponseJson, Redirect},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use crate::api::common::{
    ApiResponse, HttpFailure, auth_error_to_http, validation_error_response,
};
use crate::auth::cookies::{clear_session_cookie, session_cookie};
use crate::auth::google::GOOGLE_PROVIDER;
use crate::auth::middleware::SessionContext;
use crate::auth::models::{Credentials, Identity, ProviderInfo, SessionUpdateRequest};
use crate::auth::session::{SessionClaims, SessionUser, SessionView};
use crate::auth::state::AppState;
use crate::errors::AuthError;

/// Query string Google appends to the redirect URI.
#[derive(Debug, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Handle credentials sign-in
#[axum::debug_handler]
pub async fn credentials_callback(
    Extension(state): Extension<AppState>,
    jar: CookieJar,
    credentials: Result<Json<Credentials>, JsonRejection>,
) -> Result<(CookieJar, ResponseJson<ApiResponse<SessionView>>), HttpFailure> {
    let Json(credentials) = credentials.map_err(json_rejection)?;
    let identity = state
        .exchange
        .authorize(credentials)
        .await
        .map_err(auth_error_to_http)?;

    let (jar, view) = start_session(&state, jar, &identity).map_err(auth_error_to_http)?;
    Ok((jar, ResponseJson(ApiResponse::success(view, "Signed in"))))
}

/// Handle session read. Anonymous requests get `data: null`.
#[axum::debug_handler]
pub async fn get_session(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<SessionContext>,
) -> ResponseJson<ApiResponse<Option<SessionView>>> {
    let view = ctx
        .claims
        .as_ref()
        .map(|claims| state.bridge.read(claims, SessionUser::default()));
    let message = if view.is_some() {
        "Active session"
    } else {
        "No active session"
    };
    ResponseJson(ApiResponse::success(view, message))
}

/// Handle explicit session update
#[axum::debug_handler]
pub async fn update_session(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<SessionContext>,
    jar: CookieJar,
    payload: Result<Json<SessionUpdateRequest>, JsonRejection>,
) -> Result<(CookieJar, ResponseJson<ApiResponse<SessionView>>), HttpFailure> {
    let Json(payload) = payload.map_err(json_rejection)?;
    if let Err(errors) = payload.user.validate() {
        return Err(validation_error_response(errors));
    }

    let claims = ctx
        .claims
        .ok_or_else(|| auth_error_to_http(AuthError::SessionRequired))?;
    let claims = state.bridge.update(claims, payload.user);

    let (jar, view) = persist(&state, jar, &claims).map_err(auth_error_to_http)?;
    Ok((jar, ResponseJson(ApiResponse::success(view, "Session updated"))))
}

/// Handle sign-out
#[axum::debug_handler]
pub async fn sign_out(
    Extension(state): Extension<AppState>,
    Extension(ctx): Extension<SessionContext>,
    jar: CookieJar,
) -> (CookieJar, ResponseJson<ApiResponse<()>>) {
    if let Some(id) = ctx.claims.as_ref().and_then(|claims| claims.id.as_deref()) {
        info!(user_id = %id, "Signed out");
    }
    let jar = jar.remove(clear_session_cookie(&state.cookie_name));
    (jar, ResponseJson(ApiResponse::success((), "Signed out")))
}

/// List the sign-in providers of the active strategy
#[axum::debug_handler]
pub async fn providers(
    Extension(state): Extension<AppState>,
) -> ResponseJson<ApiResponse<Vec<ProviderInfo>>> {
    let mut providers = state.exchange.providers();
    if state.google.is_some() {
        providers.push(GOOGLE_PROVIDER);
    }
    ResponseJson(ApiResponse::ok(providers))
}

/// Redirect to Google's consent screen
#[axum::debug_handler]
pub async fn google_login(Extension(state): Extension<AppState>) -> Result<Redirect, HttpFailure> {
    let google = state
        .google
        .as_ref()
        .ok_or_else(|| (StatusCode::NOT_FOUND, not_enabled()))?;
    let url = google
        .authorization_url()
        .await
        .map_err(auth_error_to_http)?;
    Ok(Redirect::to(&url))
}

/// Complete the Google sign-in and establish the session
#[axum::debug_handler]
pub async fn google_callback(
    Extension(state): Extension<AppState>,
    jar: CookieJar,
    Query(query): Query<GoogleCallbackQuery>,
) -> Result<(CookieJar, Redirect), HttpFailure> {
    let google = state
        .google
        .as_ref()
        .ok_or_else(|| (StatusCode::NOT_FOUND, not_enabled()))?;

    if let Some(error) = query.error {
        warn!(error = %error, "Google sign-in declined");
        return Err(auth_error_to_http(AuthError::oauth(format!(
            "Google sign-in failed: {error}"
        ))));
    }
    let (Some(code), Some(oauth_state)) = (query.code, query.state) else {
        return Err(auth_error_to_http(AuthError::oauth(
            "Missing code or state in OAuth callback",
        )));
    };

    let identity = google
        .complete(&code, &oauth_state)
        .await
        .map_err(auth_error_to_http)?;
    let (jar, _) =
        start_session(&state, jar, &Identity::Local(identity)).map_err(auth_error_to_http)?;
    Ok((jar, Redirect::to("/")))
}

fn start_session(
    state: &AppState,
    jar: CookieJar,
    identity: &Identity,
) -> Result<(CookieJar, SessionView), AuthError> {
    let claims = state.bridge.establish(identity);
    persist(state, jar, &claims)
}

fn persist(
    state: &AppState,
    jar: CookieJar,
    claims: &SessionClaims,
) -> Result<(CookieJar, SessionView), AuthError> {
    let token = state.bridge.sign(claims)?;
    let jar = jar.add(session_cookie(&state.cookie_name, &token, state.cookie_secure));
    Ok((jar, state.bridge.read(claims, SessionUser::default())))
}

fn json_rejection(rejection: JsonRejection) -> HttpFailure {
    auth_error_to_http(AuthError::validation(rejection.body_text()))
}

fn not_enabled() -> axum::Json<ApiResponse<()>> {
    axum::Json(ApiResponse::<()>::error(
        "Google sign-in is not enabled",
        "not_found",
        StatusCode::NOT_FOUND.as_u16(),
        None,
    ))
}
