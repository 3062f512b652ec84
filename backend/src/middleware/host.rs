use crate::config::AppConfig;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Exempt from the host allow-list and the https redirect.
pub const HEALTH_PATH: &str = "/api/ping";

/// Applies `ALLOWED_HOSTS` and `FORCE_SSL` to every request except the
/// health check.
pub async fn enforce_host_policy(
    State(config): State<Arc<AppConfig>>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path() == HEALTH_PATH {
        return next.run(request).await;
    }

    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !config.host_allowed(&host) {
        tracing::warn!(%host, "blocked request for host outside allow-list");
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "success": false, "error": format!("Blocked host: {}", host) })),
        )
            .into_response();
    }

    if config.force_ssl {
        let forwarded_http = request
            .headers()
            .get("x-forwarded-proto")
            .and_then(|h| h.to_str().ok())
            .map_or(false, |proto| proto.eq_ignore_ascii_case("http"));
        if forwarded_http && !host.is_empty() {
            let path = request
                .uri()
                .path_and_query()
                .map_or("/", |pq| pq.as_str());
            return Redirect::permanent(&format!("https://{}{}", host, path)).into_response();
        }
    }

    next.run(request).await
}
