use std::net::SocketAddr;

use axum::{http::StatusCode, routing::get, Router};
use tower_http::trace::TraceLayer;

use server::config::AppConfig;
use server::handlers::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    let pool = server::db::establish_connection_pool(&config.database_url)?;

    let port = config.port;
    let state = AppState { pool, config };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/cron/catch-up", get(handlers::cron_catch_up))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}
