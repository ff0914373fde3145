//! HTTP client for the remote console backend.
//!
//! [`http::ApiClient`] is the generic JSON transport; [`api`] adds the typed
//! auth/profile endpoints on top of it and [`types`] holds their wire schemas.

pub mod api;
pub mod http;
pub mod types;

pub use http::{ApiClient, HttpError, RequestOptions, ResponseBody};
