//! Shared state handed to the auth handlers.

use std::sync::Arc;

use crate::auth::exchange::CredentialExchange;
use crate::auth::google::GoogleOAuth;
use crate::auth::session::SessionBridge;

#[derive(Clone)]
pub struct AppState {
    pub exchange: Arc<dyn CredentialExchange>,
    pub bridge: Arc<SessionBridge>,
    pub google: Option<Arc<GoogleOAuth>>,
    pub cookie_name: String,
    pub cookie_secure: bool,
}
