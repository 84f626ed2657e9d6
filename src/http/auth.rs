//! Auth gate (§6/§7): three tiers attached per-route via an `Extension`.
//! `None` never checks. `Optional` only rejects credentials that were
//! supplied and are wrong; a request with no credentials at all still goes
//! through (these endpoints serve public read-only state). `Required`
//! rejects anything without a valid key or bearer token.

use std::collections::HashSet;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;

use crate::http::error::ApiError;
use crate::http::AppState;
use sk_common::SafekeeperError;

#[derive(Clone, Copy, Debug)]
pub enum AuthRequirement {
    None,
    Optional,
    Required,
}

#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    pub api_key: Option<String>,
    pub auth_tokens: HashSet<String>,
}

impl AuthConfig {
    fn configured(&self) -> bool {
        self.api_key.is_some() || !self.auth_tokens.is_empty()
    }

    fn credentials_present(headers: &HeaderMap) -> bool {
        headers.contains_key("x-api-key") || headers.contains_key(axum::http::header::AUTHORIZATION)
    }

    fn is_valid(&self, headers: &HeaderMap) -> bool {
        if !self.configured() {
            return true;
        }
        if let Some(key) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
            if Some(key) == self.api_key.as_deref() {
                return true;
            }
        }
        if let Some(auth) = headers.get(axum::http::header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            if let Some(token) = auth.strip_prefix("Bearer ") {
                if self.auth_tokens.contains(token) {
                    return true;
                }
            }
        }
        false
    }
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let requirement = req
        .extensions()
        .get::<AuthRequirement>()
        .copied()
        .unwrap_or(AuthRequirement::Optional);

    let headers = req.headers().clone();
    let ok = match requirement {
        AuthRequirement::None => true,
        AuthRequirement::Required => state.auth.is_valid(&headers),
        AuthRequirement::Optional => {
            !AuthConfig::credentials_present(&headers) || state.auth.is_valid(&headers)
        }
    };

    if !ok {
        return Err(ApiError(SafekeeperError::Unauthenticated));
    }
    Ok(next.run(req).await)
}
