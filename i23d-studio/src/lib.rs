//! i23d-studio library interface
//!
//! Exposes the application state and router for the binary and for
//! integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use i23d_common::events::EventBus;

use crate::config::StudioConfig;
use crate::models::GenerationSession;
use crate::services::MeshyClient;

/// Upload size ceiling; generation sources are photos, not archives
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared registry of generation sessions, keyed by session id
pub type SessionRegistry = Arc<RwLock<HashMap<Uuid, GenerationSession>>>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolved service configuration
    pub config: StudioConfig,
    /// Remote generation client; `None` when no credential is configured
    pub client: Option<Arc<MeshyClient>>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// In-memory session registry (nothing persists across restarts)
    pub sessions: SessionRegistry,
    /// Root cancellation token; child tokens stop pollers on shutdown
    pub shutdown: CancellationToken,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        config: StudioConfig,
        client: Option<Arc<MeshyClient>>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            config,
            client,
            event_bus,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            shutdown: CancellationToken::new(),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // UI routes (HTML pages)
        .merge(api::ui_routes())
        // API routes
        .merge(api::generation_routes())
        .route("/generate/events", get(api::generation_event_stream))
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
