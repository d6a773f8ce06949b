//! Generation API handlers
//!
//! POST /generate/start, GET /generate/status, GET /generate/image,
//! GET /generate/asset, POST /generate/convert

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use i23d_common::events::StudioEvent;

use crate::{
    error::{ApiError, ApiResult},
    models::{GenerationFlags, GenerationSession, GenerationState, ImageKind, SourceImage},
    services::{export, load_glb, run_generation, ExportFormat},
    AppState,
};

/// POST /generate/start response
#[derive(Debug, Serialize)]
pub struct StartGenerationResponse {
    pub session_id: Uuid,
    pub state: GenerationState,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// GET /generate/status response
#[derive(Debug, Serialize)]
pub struct GenerationStatusResponse {
    pub session_id: Uuid,
    pub state: GenerationState,
    pub percent: u8,
    pub message: String,
    pub elapsed_seconds: u64,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
    pub asset_ready: bool,
    pub error: Option<String>,
}

/// POST /generate/convert request
#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub format: String,
}

/// POST /generate/start
///
/// Multipart upload: an `image` file part (jpeg/png) plus optional boolean
/// flag parts. Submits the task to the remote service and spawns the
/// background polling task; answers with the new session.
pub async fn start_generation(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<StartGenerationResponse>> {
    // Credential check comes first: a configuration error must surface
    // before any bytes leave the process.
    let client = state.client.clone().ok_or_else(|| {
        ApiError::Config(format!(
            "Meshy API key not configured. Set {} (or {}), or add meshy_api_key to the config file.",
            i23d_common::config::API_KEY_ENV,
            i23d_common::config::API_KEY_ENV_FALLBACK,
        ))
    })?;

    let mut image_bytes: Option<Vec<u8>> = None;
    let mut flags = GenerationFlags::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read image: {}", e)))?;
                image_bytes = Some(bytes.to_vec());
            }
            "enable_pbr" | "should_remesh" | "should_texture" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {}", e)))?;
                let parsed = parse_flag(&name, &value)?;
                match name.as_str() {
                    "enable_pbr" => flags.enable_pbr = parsed,
                    "should_remesh" => flags.should_remesh = parsed,
                    _ => flags.should_texture = parsed,
                }
            }
            _ => {}
        }
    }

    let image_bytes = image_bytes
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No image supplied".to_string()))?;

    let kind = infer::get(&image_bytes)
        .and_then(|t| ImageKind::from_mime(t.mime_type()))
        .ok_or_else(|| {
            ApiError::BadRequest("Unsupported image type (expected JPEG or PNG)".to_string())
        })?;

    // One live session at a time; finished sessions stay readable
    {
        let sessions = state.sessions.read().await;
        if sessions.values().any(|s| !s.is_terminal()) {
            return Err(ApiError::Conflict(
                "A generation session is already running".to_string(),
            ));
        }
    }

    let image = SourceImage {
        bytes: image_bytes,
        kind,
    };

    // Submission failure aborts the flow: no session is created
    let task_id = client.create_task(&image, &flags).await?;

    let session = GenerationSession::new(task_id.clone(), image, flags);
    let session_id = session.session_id;
    let response = StartGenerationResponse {
        session_id,
        state: session.state,
        started_at: session.started_at,
    };
    state.sessions.write().await.insert(session_id, session);

    tracing::info!(
        session_id = %session_id,
        task_id = %task_id,
        "Generation session started"
    );
    state.event_bus.emit_lossy(StudioEvent::GenerationStarted {
        session_id,
        timestamp: Utc::now(),
    });

    tokio::spawn(run_generation(
        client,
        state.sessions.clone(),
        session_id,
        task_id,
        state.event_bus.clone(),
        state.config.poll_timing(),
        state.shutdown.child_token(),
    ));

    Ok(Json(response))
}

/// GET /generate/status/{session_id}
pub async fn get_generation_status(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<GenerationStatusResponse>> {
    let sessions = state.sessions.read().await;
    let session = sessions
        .get(&session_id)
        .ok_or_else(|| ApiError::NotFound(format!("Generation session not found: {}", session_id)))?;

    Ok(Json(GenerationStatusResponse {
        session_id: session.session_id,
        state: session.state,
        percent: session.progress.percent,
        message: session.progress.message.clone(),
        elapsed_seconds: session.progress.elapsed_seconds,
        started_at: session.started_at,
        ended_at: session.ended_at,
        asset_ready: session.asset.is_some(),
        error: session.error.clone(),
    }))
}

/// GET /generate/image/{session_id}
///
/// Serves the uploaded source image for the side-by-side preview.
pub async fn get_source_image(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Response> {
    let sessions = state.sessions.read().await;
    let session = sessions
        .get(&session_id)
        .ok_or_else(|| ApiError::NotFound(format!("Generation session not found: {}", session_id)))?;

    let headers = [(header::CONTENT_TYPE, session.image.kind.mime().to_string())];
    Ok((headers, session.image.bytes.clone()).into_response())
}

/// GET /generate/asset/{session_id}
///
/// Serves the generated binary glTF once it has been downloaded.
pub async fn get_generated_asset(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Response> {
    let sessions = state.sessions.read().await;
    let session = sessions
        .get(&session_id)
        .ok_or_else(|| ApiError::NotFound(format!("Generation session not found: {}", session_id)))?;

    match (&session.asset, &session.error) {
        (Some(bytes), _) => {
            let headers = [
                (header::CONTENT_TYPE, "model/gltf-binary".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"model.glb\"".to_string(),
                ),
            ];
            Ok((headers, bytes.clone()).into_response())
        }
        (None, Some(error)) => Err(ApiError::NotFound(format!("Asset not available: {}", error))),
        (None, None) => Err(ApiError::NotFound("Asset not ready".to_string())),
    }
}

/// POST /generate/convert/{session_id}
///
/// Converts the downloaded asset into the requested format. Conversion
/// failures never touch the stored asset.
pub async fn convert_asset(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ConvertRequest>,
) -> ApiResult<Response> {
    let format = ExportFormat::from_str(&request.format)?;

    let glb = {
        let sessions = state.sessions.read().await;
        let session = sessions.get(&session_id).ok_or_else(|| {
            ApiError::NotFound(format!("Generation session not found: {}", session_id))
        })?;
        match (&session.asset, &session.error) {
            (Some(bytes), _) => bytes.clone(),
            (None, Some(error)) => {
                return Err(ApiError::NotFound(format!("Asset not available: {}", error)))
            }
            (None, None) => return Err(ApiError::NotFound("Asset not ready".to_string())),
        }
    };

    let mesh = load_glb(&glb)?;
    let bytes = export(&mesh, format)?;

    tracing::info!(
        session_id = %session_id,
        format = %format,
        input_bytes = glb.len(),
        output_bytes = bytes.len(),
        "Asset converted"
    );

    let headers = [
        (header::CONTENT_TYPE, format.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"model.{}\"", format.extension()),
        ),
    ];
    Ok((headers, bytes).into_response())
}

fn parse_flag(name: &str, value: &str) -> ApiResult<bool> {
    match value {
        "true" | "1" | "on" => Ok(true),
        "false" | "0" | "off" => Ok(false),
        other => Err(ApiError::BadRequest(format!(
            "Invalid value for {}: {}",
            name, other
        ))),
    }
}

/// Build generation routes
pub fn generation_routes() -> Router<AppState> {
    Router::new()
        .route("/generate/start", post(start_generation))
        .route("/generate/status/:session_id", get(get_generation_status))
        .route("/generate/image/:session_id", get(get_source_image))
        .route("/generate/asset/:session_id", get(get_generated_asset))
        .route("/generate/convert/:session_id", post(convert_asset))
}
