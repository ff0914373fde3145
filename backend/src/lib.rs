//! Console authentication: credential exchange strategies, the signed
//! session bridge and the client-side auth cache.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod database;
pub mod errors;
pub mod repositories;
pub mod store;
pub mod utils;
