use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use quotefall_server::config::Settings;
use quotefall_server::{build_state, routes};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env();
    tracing::info!(
        bind_addr = %settings.bind_addr,
        refresh_secs = settings.refresh_interval.as_secs(),
        "starting quotefall server"
    );

    let state = build_state(&settings);
    tracing::info!(
        providers = ?state.resolver.configured_providers(),
        "configured quote providers"
    );

    let app = routes::create_router(state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(settings.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
