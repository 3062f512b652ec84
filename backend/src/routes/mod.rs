use crate::middleware::host::enforce_host_policy;
use crate::state::AppState;
use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod dashboard;
pub mod system;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(system::router())
        .merge(admin::router(&state))
        .merge(dashboard::router(&state))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            enforce_host_policy,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
