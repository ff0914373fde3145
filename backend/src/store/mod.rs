//! Client-side auth cache.
//!
//! Holds who is signed in and their backend access token, and runs login,
//! refresh and logout against the backend and the session bridge.

pub mod auth_store;
pub mod reducer;
pub mod registrar;
pub mod state;

pub use auth_store::{
    AuthStore, LoginForm, LoginOutcome, LogoutOutcome, ProfileFetch, RefreshOutcome, StepOutcome,
};
pub use reducer::{AuthAction, reduce};
pub use registrar::{BridgeRegistrar, SessionRegistrar, SessionRegistration};
pub use state::{AuthState, AuthStatus, CachedUser};
