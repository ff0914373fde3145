//! Auth cache reducer.
//!
//! Pure state transitions; the async operations in [`super::AuthStore`]
//! dispatch these actions once their network work has settled.

use super::state::{AuthState, AuthStatus, CachedUser};

pub const DEFAULT_LOGIN_ERROR: &str = "Login failed";

#[derive(Debug, Clone, PartialEq)]
pub enum AuthAction {
    LoginStarted,
    LoginSucceeded {
        user: CachedUser,
        access_token: String,
    },
    LoginFailed {
        message: Option<String>,
    },
    /// Only the token changes; `status` is left alone.
    TokenRefreshed {
        access_token: String,
    },
    LoggedOut,
    Cleared,
}

pub fn reduce(state: &mut AuthState, action: AuthAction) {
    match action {
        AuthAction::LoginStarted => {
            state.status = AuthStatus::Loading;
            state.error = None;
        }
        AuthAction::LoginSucceeded { user, access_token } => {
            state.status = AuthStatus::Succeeded;
            state.error = None;
            state.user = Some(user);
            state.access_token = Some(access_token);
        }
        AuthAction::LoginFailed { message } => {
            state.status = AuthStatus::Failed;
            state.error = Some(
                message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| DEFAULT_LOGIN_ERROR.to_string()),
            );
        }
        AuthAction::TokenRefreshed { access_token } => {
            state.access_token = Some(access_token);
        }
        AuthAction::LoggedOut | AuthAction::Cleared => {
            *state = AuthState::default();
        }
    }
}
