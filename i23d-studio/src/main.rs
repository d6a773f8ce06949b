//! i23d-studio - Image-to-3D Studio
//!
//! Local web front-end for the Meshy image-to-3D generation API: upload an
//! image, track smoothed progress while the service polls the remote task,
//! preview the resulting binary glTF, and export it as OBJ / PLY / STL.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use i23d_common::events::EventBus;
use i23d_studio::config::StudioConfig;
use i23d_studio::services::MeshyClient;
use i23d_studio::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // TOML config is needed before tracing for the default log level
    let toml_config = match i23d_common::config::load_toml_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Ignoring unreadable config file: {}", e);
            Default::default()
        }
    };

    let default_level = toml_config.logging.level.clone().unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!(
        "Starting i23d-studio (Image-to-3D Studio) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = StudioConfig::from_toml(&toml_config);

    // A missing credential is a user-visible configuration error surfaced
    // by the start action, not a startup failure.
    let client = i23d_common::config::resolve_meshy_api_key(&toml_config).and_then(|key| {
        match MeshyClient::new(key, config.api_base_url.clone()) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("Failed to initialize generation client: {}", e);
                None
            }
        }
    });
    if client.is_none() {
        warn!(
            "Meshy API key not configured; set {} (or {}) or add meshy_api_key to the config file",
            i23d_common::config::API_KEY_ENV,
            i23d_common::config::API_KEY_ENV_FALLBACK,
        );
    }

    let event_bus = EventBus::new(100);
    let state = AppState::new(config.clone(), client, event_bus);
    let shutdown = state.shutdown.clone();

    let app = i23d_studio::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                warn!("Failed to listen for shutdown signal");
            }
            info!("Shutting down");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
