//! Request identity middleware
//!
//! API-key guard for the whole API, plus extractors for the acting user
//! (`x-username`) and the request's system mode (`x-system-mode`).

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use shared::{SystemMode, User};

use crate::error::AppError;
use crate::repositories::UserRepository;
use crate::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const USERNAME_HEADER: &str = "x-username";
pub const SYSTEM_MODE_HEADER: &str = "x-system-mode";

const MAX_USERNAME_LEN: usize = 100;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Key presented by the client, from `x-api-key` or a bearer token
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, API_KEY_HEADER).or_else(|| {
        header_str(headers, AUTHORIZATION.as_str())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
    })
}

/// Compare digests so the comparison time does not depend on the key prefix
fn keys_match(presented: &str, expected: &str) -> bool {
    Sha256::digest(presented.as_bytes()) == Sha256::digest(expected.as_bytes())
}

/// Rejects requests without the configured API key. The API is open when no key is set.
pub async fn api_key_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(expected) = state.config.api_key.as_deref() {
        match presented_key(request.headers()) {
            Some(key) if keys_match(key, expected) => {}
            Some(_) => return AppError::Unauthorized("Invalid API key".into()).into_response(),
            None => return AppError::Unauthorized("Missing API key".into()).into_response(),
        }
    }

    next.run(request).await
}

/// Acting user, found or created from `x-username`
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

fn username_from(headers: &HeaderMap) -> Result<&str, AppError> {
    let username = header_str(headers, USERNAME_HEADER)
        .ok_or_else(|| AppError::Unauthorized(format!("{} header is required", USERNAME_HEADER)))?;
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::field(
            "username",
            format!("username must be at most {} characters", MAX_USERNAME_LEN),
        ));
    }
    Ok(username)
}

#[axum::async_trait]
impl axum::extract::FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let username = username_from(&parts.headers)?;
        let user = UserRepository::find_or_create(&state.db, username).await?;
        Ok(CurrentUser(user))
    }
}

/// System mode of the request: `x-system-mode`, else the configured default
#[derive(Clone, Copy, Debug)]
pub struct RequestMode(pub SystemMode);

fn mode_from(headers: &HeaderMap, default: SystemMode) -> Result<SystemMode, AppError> {
    match header_str(headers, SYSTEM_MODE_HEADER) {
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::field("mode", format!("Unknown system mode '{}'", raw))),
        None => Ok(default),
    }
}

#[axum::async_trait]
impl axum::extract::FromRequestParts<AppState> for RequestMode {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        mode_from(&parts.headers, state.config.system_mode).map(RequestMode)
    }
}
