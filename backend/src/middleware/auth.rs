use crate::config::AppConfig;
use crate::error::HerdbookError;
use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Compares in constant time for equal-length inputs. No configured token
/// means nothing matches.
pub fn token_matches(expected: Option<&str>, supplied: &str) -> bool {
    match expected {
        Some(expected) if !expected.is_empty() => {
            bool::from(expected.as_bytes().ct_eq(supplied.as_bytes()))
        }
        _ => false,
    }
}

fn supplied_token(request: &Request) -> Option<String> {
    if let Some(value) = request.headers().get(ADMIN_TOKEN_HEADER) {
        return value.to_str().ok().map(str::to_string);
    }
    Query::<TokenQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(q)| q.token)
}

/// Rejects the request with 401 unless it carries the configured admin token
/// in the `X-Admin-Token` header or the `token` query parameter.
pub async fn require_admin_token(
    State(config): State<Arc<AppConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = supplied_token(&request)
        .map(|token| token_matches(config.admin_token.as_deref(), &token))
        .unwrap_or(false);

    if !authorized {
        tracing::warn!(path = %request.uri().path(), "admin request rejected");
        return HerdbookError::Unauthorized.into_response();
    }

    next.run(request).await
}
