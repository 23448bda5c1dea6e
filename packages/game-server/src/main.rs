use axum::{routing::get, Router};
use shared::config::Settings;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod error;
pub mod routes;
pub mod state;

use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .merge(routes::game::routes())
        .merge(routes::leaderboard::routes())
        .merge(routes::websocket::routes())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let settings = Settings::from_env()?;
    let state = AppState::from_settings(&settings).await?;

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    info!("Game server listening on {}", settings.bind_addr);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
