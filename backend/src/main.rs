use herdbook::config::{self, AppConfig};
use herdbook::db;
use herdbook::routes;
use herdbook::state::AppState;
use herdbook::store::PgHerdStore;
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    config::init_tracing();

    tracing::info!("Starting Herdbook backend...");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };
    tracing::debug!(?config, "configuration loaded");

    let pool = match db::init_pool(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to create database pool: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = db::init_database(&pool).await {
        tracing::error!("Failed to run migrations: {}", e);
        std::process::exit(1);
    }
    tracing::info!("Database connection established");

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(Arc::new(PgHerdStore::new(pool)), config);
    let app = routes::create_router(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("listening on {}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
