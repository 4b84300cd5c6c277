//! Newsroom - server-rendered front end for a news and article platform

use anyhow::Result;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsroom::{
    backend::{BackendClient, Repositories},
    cache::create_cache,
    config::Config,
    services::LoginRateLimiter,
    web::{self, AppState},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "newsroom=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Newsroom...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    config.validate()?;
    tracing::info!("Configuration loaded");

    // Backend API client
    let client = Arc::new(BackendClient::new(&config.backend)?);
    tracing::info!("Backend API: {}", client.base_url());
    let repositories = Repositories::http(client);

    let cache = create_cache(&config.cache);
    let rate_limiter = Arc::new(LoginRateLimiter::new());

    // Start rate limiter cleanup task (runs every 5 minutes)
    {
        let limiter = rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(300));
            loop {
                interval.tick().await;
                limiter.cleanup().await;
            }
        });
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, repositories, cache, rate_limiter)?;
    tracing::info!("Templates loaded");

    // Build router
    let app = web::build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
