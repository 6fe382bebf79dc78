//! HTTP middleware and request extractors

pub mod auth;

pub use auth::{api_key_middleware, CurrentUser, RequestMode};
