use anyhow::Result;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

mod configuration;
mod routes;
mod state;

use configuration::Settings;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let settings = Settings::new()?;
    if settings.backend.api_key.is_empty() {
        // Startup still succeeds; requests fail at call time instead.
        warn!("no backend API key configured; chat requests will fail until one is set");
    }

    let state = AppState::from_settings(&settings);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(settings.server.socket_addr()).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
