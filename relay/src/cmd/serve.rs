//! `relay serve` command — start the relay HTTP server.
//!
//! Loads TOML configuration, resolves provider credentials from the
//! environment, then runs an Axum HTTP server with CORS, request tracing,
//! optional static file serving, and graceful shutdown support.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, Method};
use dotenvy::dotenv;
use tower_http::cors::{self, CorsLayer};
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::cursor::CursorState;
use crate::error::RelayError;
use crate::provider::ProviderRegistry;
use crate::relay::Relay;
use crate::routes::{self, AppState};
use crate::signal::Shutdown;
use crate::telemetry;

/// Execute the `serve` command.
///
/// # Errors
///
/// Returns an error if configuration loading, provider resolution, or
/// server binding fails.
pub async fn run(config_path: &Path) -> Result<(), RelayError> {
    // Load .env variables
    dotenv().ok();

    let _telemetry = telemetry::init("relay=info,tower_http=info");

    let config = Config::load_or_default(config_path)?;
    let providers =
        ProviderRegistry::from_config(&config.providers, &|name| std::env::var(name).ok())?;
    let relay = Relay::new(providers, config.request_timeout_secs.map(Duration::from_secs))?;

    let state = Arc::new(AppState {
        relay,
        cursor: CursorState::default(),
    });

    let mut app = Router::new().merge(routes::routes().with_state(state));
    if let Some(ref dir) = config.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }
    let app = app
        .layer(telemetry::http_trace_layer())
        .layer(cors_layer(&config)?);

    let addr = SocketAddr::new(config.host, config.port);
    tracing::info!("Starting server at http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| RelayError::server_with(format!("failed to bind to {addr}"), e))?;

    let shutdown = Shutdown::install()
        .map_err(|e| RelayError::server_with("failed to register signal handlers", e))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.token().cancelled_owned())
        .await
        .map_err(|e| RelayError::server_with("server error", e))?;
    shutdown.drain().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Cross-origin layer: any origin by default, or the configured allow-list.
fn cors_layer(config: &Config) -> Result<CorsLayer, RelayError> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(cors::Any);

    if config.cors.allowed_origins.is_empty() {
        return Ok(layer.allow_origin(cors::Any));
    }

    let origins = config
        .cors
        .allowed_origins
        .iter()
        .map(|origin| {
            origin.parse::<HeaderValue>().map_err(|e| {
                RelayError::config_with(format!("invalid CORS origin '{origin}'"), e)
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(layer.allow_origin(cors::AllowOrigin::list(origins)))
}
