//! Meshy image-to-3D API client
//!
//! Wraps the three remote calls the studio makes:
//! - task creation (POST, image embedded as a base64 data URI)
//! - task status lookup (GET by task id)
//! - asset download (GET on the result locator)
//!
//! The client is only constructed when a credential is configured, so a
//! missing key is caught before any network activity.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::{GenerationFlags, SourceImage};

/// Default API base; overridable for tests and self-hosted proxies
pub const DEFAULT_API_BASE_URL: &str = "https://api.meshy.ai";
const IMAGE_TO_3D_PATH: &str = "/openapi/v1/image-to-3d";
const USER_AGENT: &str = concat!("i23d/", env!("CARGO_PKG_VERSION"));

const SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);
const STATUS_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(180);

/// Meshy client errors
#[derive(Debug, Error)]
pub enum MeshyError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// API returned a non-success HTTP status
    #[error("Generation API error {0}: {1}")]
    Api(u16, String),

    /// Response body did not have the expected shape
    #[error("Unexpected API response: {0}")]
    Parse(String),

    /// Asset retrieval failed (transport or non-success status)
    #[error("Asset download failed: {0}")]
    Download(String),
}

/// Remote task outcome derived from a status snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Task not resolved yet (PENDING, IN_PROGRESS, or any unknown status)
    Running,
    /// Task succeeded; carries the binary glTF result locator
    Succeeded(String),
    /// Task failed remotely
    Failed,
}

#[derive(Debug, Serialize)]
struct CreateTaskRequest {
    image_url: String,
    enable_pbr: bool,
    should_remesh: bool,
    should_texture: bool,
}

#[derive(Debug, Deserialize)]
struct CreateTaskResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ModelUrls {
    glb: Option<String>,
}

/// Task status snapshot as returned by the generation API
#[derive(Debug, Deserialize)]
pub struct TaskSnapshot {
    status: String,
    #[serde(default)]
    model_urls: Option<ModelUrls>,
}

impl TaskSnapshot {
    /// Interpret the snapshot
    ///
    /// Only the SUCCEEDED and FAILED status strings are terminal; every
    /// other value means the task is still being worked on.
    pub fn outcome(&self) -> Result<TaskOutcome, MeshyError> {
        match self.status.as_str() {
            "SUCCEEDED" => {
                let url = self
                    .model_urls
                    .as_ref()
                    .and_then(|u| u.glb.clone())
                    .ok_or_else(|| {
                        MeshyError::Parse("SUCCEEDED task has no glb result locator".to_string())
                    })?;
                Ok(TaskOutcome::Succeeded(url))
            }
            "FAILED" => Ok(TaskOutcome::Failed),
            _ => Ok(TaskOutcome::Running),
        }
    }
}

/// Seam between the poller and the remote service, mockable in tests
#[async_trait]
pub trait RemoteGeneration: Send + Sync {
    /// Lightweight status lookup for a task
    async fn check_task(&self, task_id: &str) -> Result<TaskSnapshot, MeshyError>;

    /// Single blocking download of the finished asset
    async fn download_asset(&self, url: &str) -> Result<Vec<u8>, MeshyError>;
}

/// Meshy API client
pub struct MeshyClient {
    http: reqwest::Client,
    download: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MeshyClient {
    /// Create a new client for the given credential and API base
    pub fn new(api_key: String, base_url: String) -> Result<Self, MeshyError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(SUBMIT_TIMEOUT)
            .build()
            .map_err(|e| MeshyError::Network(e.to_string()))?;

        // Asset downloads get their own client with a generous timeout
        let download = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| MeshyError::Network(e.to_string()))?;

        Ok(Self {
            http,
            download,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn task_url(&self) -> String {
        format!("{}{}", self.base_url, IMAGE_TO_3D_PATH)
    }

    /// Submit an image-to-3D task; returns the remote task identifier
    ///
    /// No retry here: submission failure aborts the run and is surfaced to
    /// the user immediately.
    pub async fn create_task(
        &self,
        image: &SourceImage,
        flags: &GenerationFlags,
    ) -> Result<String, MeshyError> {
        let payload = CreateTaskRequest {
            image_url: data_uri(image),
            enable_pbr: flags.enable_pbr,
            should_remesh: flags.should_remesh,
            should_texture: flags.should_texture,
        };

        tracing::info!(
            image_kind = image.kind.mime(),
            image_bytes = image.bytes.len(),
            enable_pbr = flags.enable_pbr,
            should_remesh = flags.should_remesh,
            should_texture = flags.should_texture,
            "Submitting image-to-3D task"
        );

        let response = self
            .http
            .post(self.task_url())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MeshyError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MeshyError::Api(status.as_u16(), body));
        }

        let created: CreateTaskResponse = response
            .json()
            .await
            .map_err(|e| MeshyError::Parse(e.to_string()))?;

        tracing::info!(task_id = %created.result, "Image-to-3D task created");
        Ok(created.result)
    }
}

#[async_trait]
impl RemoteGeneration for MeshyClient {
    async fn check_task(&self, task_id: &str) -> Result<TaskSnapshot, MeshyError> {
        let url = format!("{}/{}", self.task_url(), task_id);
        tracing::debug!(task_id = %task_id, "Checking task status");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .timeout(STATUS_TIMEOUT)
            .send()
            .await
            .map_err(|e| MeshyError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MeshyError::Api(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| MeshyError::Parse(e.to_string()))
    }

    async fn download_asset(&self, url: &str) -> Result<Vec<u8>, MeshyError> {
        tracing::info!(url = %url, "Downloading generated asset");

        let response = self
            .download
            .get(url)
            .send()
            .await
            .map_err(|e| MeshyError::Download(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MeshyError::Download(format!("HTTP {}", status.as_u16())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MeshyError::Download(e.to_string()))?;

        tracing::info!(size_bytes = bytes.len(), "Asset download complete");
        Ok(bytes.to_vec())
    }
}

/// Inline data URI for the submission payload
pub fn data_uri(image: &SourceImage) -> String {
    format!(
        "data:{};base64,{}",
        image.kind.mime(),
        BASE64.encode(&image.bytes)
    )
}
