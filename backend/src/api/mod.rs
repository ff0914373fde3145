//! Shared pieces of the HTTP surface.
//!
//! The response envelope and the mapping from domain errors to HTTP
//! failures live here; the bridge routes themselves are in [`crate::auth`].

pub mod common;
