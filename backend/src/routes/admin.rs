use crate::commands;
use crate::middleware::auth::require_admin_token;
use crate::state::AppState;
use axum::{middleware, routing::post, Router};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin/populate",
            post(commands::reconcile::populate_data),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_token,
        ))
}
