//! HTTP API integration tests
//!
//! Exercises the router with in-process requests; no credential is
//! configured, so no network traffic can occur.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use i23d_common::events::EventBus;
use i23d_studio::config::StudioConfig;
use i23d_studio::models::{GenerationFlags, GenerationSession, GenerationState, ImageKind, SourceImage};
use i23d_studio::{build_router, AppState};

const BOUNDARY: &str = "i23d-test-boundary";

fn test_state() -> AppState {
    AppState::new(StudioConfig::default(), None, EventBus::new(16))
}

fn png_bytes() -> Vec<u8> {
    // PNG signature plus filler; enough for type sniffing
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0u8; 24]);
    bytes
}

fn multipart_body(image: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(image) = image {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"image\"; filename=\"photo.png\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
        body.extend_from_slice(image);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"enable_pbr\"\r\n\r\ntrue\r\n");
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn start_request(image: Option<&[u8]>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/generate/start")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(image)))
        .unwrap()
}

async fn error_code(response: axum::response::Response) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    json["error"]["code"].as_str().unwrap_or_default().to_string()
}

/// Minimal valid binary glTF containing one indexed triangle
fn minimal_glb() -> Vec<u8> {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
    let indices: [u16; 3] = [0, 1, 2];

    let mut bin = Vec::new();
    for f in positions {
        bin.extend_from_slice(&f.to_le_bytes());
    }
    let idx_offset = bin.len();
    for i in indices {
        bin.extend_from_slice(&i.to_le_bytes());
    }
    let idx_len = bin.len() - idx_offset;
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let json = format!(
        concat!(
            r#"{{"asset":{{"version":"2.0"}},"scene":0,"scenes":[{{"nodes":[0]}}],"#,
            r#""nodes":[{{"mesh":0}}],"#,
            r#""meshes":[{{"primitives":[{{"attributes":{{"POSITION":0}},"indices":1}}]}}],"#,
            r#""buffers":[{{"byteLength":{}}}],"#,
            r#""bufferViews":[{{"buffer":0,"byteOffset":0,"byteLength":{}}},"#,
            r#"{{"buffer":0,"byteOffset":{},"byteLength":{}}}],"#,
            r#""accessors":[{{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","#,
            r#""min":[0,0,0],"max":[1,1,0]}},"#,
            r#"{{"bufferView":1,"componentType":5123,"count":3,"type":"SCALAR"}}]}}"#
        ),
        bin.len(),
        idx_offset,
        idx_offset,
        idx_len,
    );
    let mut json_bytes = json.into_bytes();
    while json_bytes.len() % 4 != 0 {
        json_bytes.push(b' ');
    }

    let total = 12 + 8 + json_bytes.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"JSON");
    glb.extend_from_slice(&json_bytes);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"BIN\0");
    glb.extend_from_slice(&bin);
    glb
}

async fn insert_session(state: &AppState, asset: Option<Vec<u8>>, error: Option<String>) -> Uuid {
    let mut session = GenerationSession::new(
        "task-test".to_string(),
        SourceImage {
            bytes: png_bytes(),
            kind: ImageKind::Png,
        },
        GenerationFlags::default(),
    );
    session.transition_to(GenerationState::Succeeded);
    session.asset = asset;
    session.error = error;
    let id = session.session_id;
    state.sessions.write().await.insert(id, session);
    id
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = build_router(test_state());
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "i23d-studio");
    assert_eq!(json["credential_configured"], false);
}

#[tokio::test]
async fn test_studio_page_is_served() {
    let app = build_router(test_state());
    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("Image to 3D Studio"));
    assert!(html.contains("model-viewer"));
}

#[tokio::test]
async fn test_start_without_credential_is_config_error() {
    // No credential configured: the start action must fail before any
    // remote call, even with a perfectly valid upload.
    let app = build_router(test_state());
    let response = app.oneshot(start_request(Some(&png_bytes()))).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(response).await, "CONFIG_ERROR");
}

#[tokio::test]
async fn test_start_without_image_is_validation_error() {
    // Credential configured (dummy key, never used: validation fails first)
    let client = i23d_studio::services::MeshyClient::new(
        "msy_dummy".to_string(),
        i23d_studio::services::meshy_client::DEFAULT_API_BASE_URL.to_string(),
    )
    .unwrap();
    let state = AppState::new(
        StudioConfig::default(),
        Some(std::sync::Arc::new(client)),
        EventBus::new(16),
    );
    let app = build_router(state);

    let response = app.oneshot(start_request(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(response).await, "BAD_REQUEST");
}

#[tokio::test]
async fn test_start_with_unsupported_image_type() {
    let client = i23d_studio::services::MeshyClient::new(
        "msy_dummy".to_string(),
        i23d_studio::services::meshy_client::DEFAULT_API_BASE_URL.to_string(),
    )
    .unwrap();
    let state = AppState::new(
        StudioConfig::default(),
        Some(std::sync::Arc::new(client)),
        EventBus::new(16),
    );
    let app = build_router(state);

    let response = app
        .oneshot(start_request(Some(b"just some text, not an image")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_start_while_session_running_is_conflict() {
    // A non-terminal session blocks new submissions; the conflict check
    // runs before any remote call, so the dummy client is never exercised.
    let client = i23d_studio::services::MeshyClient::new(
        "msy_dummy".to_string(),
        i23d_studio::services::meshy_client::DEFAULT_API_BASE_URL.to_string(),
    )
    .unwrap();
    let state = AppState::new(
        StudioConfig::default(),
        Some(std::sync::Arc::new(client)),
        EventBus::new(16),
    );
    let running = GenerationSession::new(
        "task-running".to_string(),
        SourceImage {
            bytes: png_bytes(),
            kind: ImageKind::Png,
        },
        GenerationFlags::default(),
    );
    state
        .sessions
        .write()
        .await
        .insert(running.session_id, running);
    let app = build_router(state);

    let response = app.oneshot(start_request(Some(&png_bytes()))).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(error_code(response).await, "CONFLICT");
}

#[tokio::test]
async fn test_status_unknown_session_is_not_found() {
    let app = build_router(test_state());
    let response = app
        .oneshot(
            Request::get(format!("/generate/status/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_code(response).await, "NOT_FOUND");
}

#[tokio::test]
async fn test_status_reports_session_fields() {
    let state = test_state();
    let id = insert_session(&state, Some(minimal_glb()), None).await;
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::get(format!("/generate/status/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["state"], "succeeded");
    assert_eq!(json["asset_ready"], true);
    assert!(json["ended_at"].is_string());
}

#[tokio::test]
async fn test_asset_download_and_content_type() {
    let state = test_state();
    let glb = minimal_glb();
    let id = insert_session(&state, Some(glb.clone()), None).await;
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::get(format!("/generate/asset/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "model/gltf-binary"
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.to_vec(), glb);
}

#[tokio::test]
async fn test_asset_endpoint_surfaces_download_error() {
    let state = test_state();
    let id = insert_session(&state, None, Some("Asset download failed: HTTP 500".to_string())).await;
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::get(format!("/generate/asset/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("download failed"));
}

#[tokio::test]
async fn test_convert_produces_obj_attachment() {
    let state = test_state();
    let id = insert_session(&state, Some(minimal_glb()), None).await;
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::post(format!("/generate/convert/{}", id))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"format": "obj"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"model.obj\""
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.starts_with("v 0 0 0"));
    assert!(text.lines().any(|l| l == "f 1 2 3"));
}

#[tokio::test]
async fn test_convert_unsupported_format() {
    let state = test_state();
    let id = insert_session(&state, Some(minimal_glb()), None).await;
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::post(format!("/generate/convert/{}", id))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"format": "step"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(response).await, "CONVERSION_ERROR");
}

#[tokio::test]
async fn test_convert_unknown_session_is_not_found() {
    let app = build_router(test_state());
    let response = app
        .oneshot(
            Request::post(format!("/generate/convert/{}", Uuid::new_v4()))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"format": "ply"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_convert_surfaces_download_error() {
    let state = test_state();
    let id = insert_session(&state, None, Some("Asset download failed: HTTP 500".to_string())).await;
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::post(format!("/generate/convert/{}", id))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"format": "obj"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("download failed"));
}

#[tokio::test]
async fn test_source_image_preview() {
    let state = test_state();
    let id = insert_session(&state, None, None).await;
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::get(format!("/generate/image/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
}
