//! Server-Sent Events for generation progress streaming

use axum::extract::State;
use axum::response::IntoResponse;

use crate::AppState;

/// GET /generate/events - SSE stream of generation lifecycle events
///
/// Streams GenerationStarted, GenerationProgress, GenerationSucceeded,
/// GenerationFailed, and AssetReady, with heartbeats between events.
pub async fn generation_event_stream(State(state): State<AppState>) -> impl IntoResponse {
    i23d_common::sse::event_stream(&state.event_bus, "i23d-studio")
}
