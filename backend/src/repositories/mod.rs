//! Database repositories for the local user directory.

pub mod oauth_state_repository;
pub mod role_repository;
pub mod user_repository;
