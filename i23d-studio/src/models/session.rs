//! Generation session state machine
//!
//! A session progresses through:
//! ESTIMATING → FINALIZING → SUCCEEDED | FAILED
//! (a coarse status check may pre-empt straight from ESTIMATING into a
//! terminal state). Terminal states are never left.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generation session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationState {
    /// Elapsed-time progress display with periodic coarse status checks
    Estimating,
    /// Past the estimate window; polling the remote service until it resolves
    Finalizing,
    /// Remote task succeeded; result locator recorded
    Succeeded,
    /// Remote task failed, submission failed, or the poll ceiling was hit
    Failed,
}

impl GenerationState {
    /// Lowercase state name used in events and API responses
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationState::Estimating => "estimating",
            GenerationState::Finalizing => "finalizing",
            GenerationState::Succeeded => "succeeded",
            GenerationState::Failed => "failed",
        }
    }

    /// Whether the state is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationState::Succeeded | GenerationState::Failed)
    }
}

/// Declared format of the uploaded source image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    /// MIME type for HTTP responses and the submission data URI
    pub fn mime(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
        }
    }

    /// Map a sniffed MIME type to a supported image kind
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            _ => None,
        }
    }
}

/// Uploaded source image, immutable once stored on the session
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub bytes: Vec<u8>,
    pub kind: ImageKind,
}

/// Submission options forwarded to the remote generation service
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GenerationFlags {
    /// Request physically-based-rendering materials
    pub enable_pbr: bool,
    /// Request remeshing of the generated geometry
    pub should_remesh: bool,
    /// Request texturing of the generated geometry
    pub should_texture: bool,
}

impl Default for GenerationFlags {
    fn default() -> Self {
        Self {
            enable_pbr: true,
            should_remesh: true,
            should_texture: true,
        }
    }
}

/// Displayed progress for the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayProgress {
    /// Percentage shown to the user (0-100); a smoothing estimate, not a
    /// remote measurement
    pub percent: u8,
    /// Current operation description
    pub message: String,
    /// Seconds since the session started
    pub elapsed_seconds: u64,
}

impl Default for DisplayProgress {
    fn default() -> Self {
        Self {
            percent: 0,
            message: String::from("Preparing model generation..."),
            elapsed_seconds: 0,
        }
    }
}

/// Generation session (in-memory state)
///
/// The session is the explicit per-run context object: current task, source
/// image, displayed progress, result locator, and fetched asset all live
/// here rather than in ambient globals.
#[derive(Debug, Clone)]
pub struct GenerationSession {
    /// Unique session identifier
    pub session_id: Uuid,

    /// Current state
    pub state: GenerationState,

    /// Remote task identifier
    pub task_id: String,

    /// Uploaded source image
    pub image: SourceImage,

    /// Submission options
    pub flags: GenerationFlags,

    /// Displayed progress
    pub progress: DisplayProgress,

    /// Result locator, present only after the remote task succeeded
    pub result_url: Option<String>,

    /// Downloaded binary glTF asset
    pub asset: Option<Vec<u8>>,

    /// Failure description (remote failure, poll timeout, or download error)
    pub error: Option<String>,

    /// Session start time
    pub started_at: DateTime<Utc>,

    /// Session end time (terminal states only)
    pub ended_at: Option<DateTime<Utc>>,
}

impl GenerationSession {
    /// Create a new session in the Estimating state
    pub fn new(task_id: String, image: SourceImage, flags: GenerationFlags) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: GenerationState::Estimating,
            task_id,
            image,
            flags,
            progress: DisplayProgress::default(),
            result_url: None,
            asset: None,
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to a new state
    ///
    /// Terminal states are never left; a transition out of Succeeded or
    /// Failed is ignored with a warning.
    pub fn transition_to(&mut self, new_state: GenerationState) {
        if self.state.is_terminal() {
            tracing::warn!(
                session_id = %self.session_id,
                current = self.state.as_str(),
                requested = new_state.as_str(),
                "Ignoring transition out of terminal state"
            );
            return;
        }

        tracing::debug!(
            session_id = %self.session_id,
            from = self.state.as_str(),
            to = new_state.as_str(),
            "Session state transition"
        );
        self.state = new_state;

        if new_state.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
    }

    /// Update the displayed progress
    pub fn update_progress(&mut self, percent: u8, message: String, elapsed_seconds: u64) {
        self.progress.percent = percent;
        self.progress.message = message;
        self.progress.elapsed_seconds = elapsed_seconds;
    }

    /// Whether the session reached a terminal state
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
