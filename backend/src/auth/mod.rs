//! Authentication module for credential exchange and the signed session.
//!
//! This module provides the two credential exchange strategies (remote
//! backend and local directory), Google profile linking, the session bridge
//! that turns an authorized identity into a signed cookie session, and the
//! HTTP surface exposing it.

pub mod cookies;
pub mod exchange;
pub mod external;
pub mod google;
pub mod handlers;
pub mod local;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod session;
pub mod state;

pub use exchange::{CredentialExchange, build_exchange};
pub use session::SessionBridge;
pub use state::AppState;
