use crate::commands;
use crate::middleware::auth::require_admin_token;
use crate::state::AppState;
use axum::{middleware, routing::get, Router};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/reports/daily",
            get(commands::dashboard::get_daily_report),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_token,
        ))
}
