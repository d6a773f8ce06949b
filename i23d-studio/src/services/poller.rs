//! Generation polling loop
//!
//! Drives one session from submission to resolution:
//! - while estimating, a short display tick refreshes the smoothed progress
//!   and a coarser cadence performs a lightweight remote status check that
//!   can pre-empt the estimate window in either direction;
//! - past the window, the session finalizes on a plain fixed-interval poll,
//!   swallowing transient errors, until the remote service resolves the
//!   task (optionally bounded by a configured check ceiling);
//! - on success the asset is fetched exactly once and stored on the session.
//!
//! The transition rules live in `PollerFsm` so they can be exercised
//! without any I/O; the async driver owns the clock and the remote client.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use i23d_common::events::{EventBus, StudioEvent};

use crate::models::{GenerationSession, GenerationState};
use crate::services::meshy_client::{RemoteGeneration, TaskOutcome};
use crate::services::progress;
use crate::SessionRegistry;

/// Polling cadence and bounds
#[derive(Debug, Clone)]
pub struct PollTiming {
    /// Display refresh tick while estimating
    pub display_tick: Duration,
    /// Cadence of lightweight remote checks while estimating
    pub coarse_check_every: Duration,
    /// Poll interval while finalizing
    pub finalizing_every: Duration,
    /// Elapsed-time window of the progress estimate
    pub estimate_window: Duration,
    /// Ceiling on finalizing checks; `None` polls until the remote service
    /// resolves the task
    pub max_finalizing_checks: Option<u32>,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            display_tick: Duration::from_secs(1),
            coarse_check_every: Duration::from_secs(15),
            finalizing_every: Duration::from_secs(5),
            estimate_window: progress::ESTIMATE_WINDOW,
            max_finalizing_checks: None,
        }
    }
}

/// Pure poller state machine
///
/// Holds the only four states a session can display and the only legal
/// moves between them: Estimating → Finalizing on window expiry, and
/// either non-terminal state → Succeeded/Failed on a remote outcome.
/// Terminal states are never left.
#[derive(Debug)]
pub struct PollerFsm {
    state: GenerationState,
    result_url: Option<String>,
}

impl PollerFsm {
    pub fn new() -> Self {
        Self {
            state: GenerationState::Estimating,
            result_url: None,
        }
    }

    pub fn state(&self) -> GenerationState {
        self.state
    }

    /// Result locator, present once a Succeeded outcome was observed
    pub fn result_url(&self) -> Option<&str> {
        self.result_url.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Apply a remote status outcome
    pub fn on_outcome(&mut self, outcome: TaskOutcome) {
        if self.state.is_terminal() {
            return;
        }
        match outcome {
            TaskOutcome::Running => {}
            TaskOutcome::Succeeded(url) => {
                self.result_url = Some(url);
                self.state = GenerationState::Succeeded;
            }
            TaskOutcome::Failed => {
                self.state = GenerationState::Failed;
            }
        }
    }

    /// The estimate window elapsed without a resolution
    pub fn on_window_elapsed(&mut self) {
        if self.state == GenerationState::Estimating {
            self.state = GenerationState::Finalizing;
        }
    }
}

impl Default for PollerFsm {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive one generation session to resolution
///
/// Runs as a background task spawned by the start handler. All session
/// mutation goes through the shared registry; this task is the sole writer
/// for its session.
pub async fn run_generation<B: RemoteGeneration>(
    backend: Arc<B>,
    sessions: SessionRegistry,
    session_id: Uuid,
    task_id: String,
    event_bus: EventBus,
    timing: PollTiming,
    shutdown: CancellationToken,
) {
    let started = Instant::now();
    let mut fsm = PollerFsm::new();
    let mut next_coarse_check = timing.coarse_check_every;

    tracing::info!(session_id = %session_id, task_id = %task_id, "Generation polling started");

    // Estimating: time-based display with piggybacked coarse checks
    while started.elapsed() < timing.estimate_window {
        if shutdown.is_cancelled() {
            tracing::info!(session_id = %session_id, "Polling stopped by shutdown");
            return;
        }

        let elapsed = started.elapsed();
        let percent = progress::estimate_percent(elapsed);
        let message = progress::estimating_message(elapsed);
        update_session(&sessions, session_id, |s| {
            s.update_progress(percent, message.clone(), elapsed.as_secs());
        })
        .await;
        event_bus.emit_lossy(StudioEvent::GenerationProgress {
            session_id,
            state: fsm.state().as_str().to_string(),
            percent,
            message,
            elapsed_seconds: elapsed.as_secs(),
            timestamp: Utc::now(),
        });

        if elapsed >= next_coarse_check {
            next_coarse_check += timing.coarse_check_every;
            coarse_check(&*backend, &task_id, session_id, &mut fsm, "estimating").await;
            if fsm.is_terminal() {
                break;
            }
        }

        sleep(timing.display_tick).await;
    }

    // Finalizing: fixed-interval poll until the remote service resolves.
    // Deliberately not the coarse-check cadence from above; this phase is a
    // plain status loop.
    if !fsm.is_terminal() {
        fsm.on_window_elapsed();
        let elapsed_secs = started.elapsed().as_secs();
        update_session(&sessions, session_id, |s| {
            s.transition_to(GenerationState::Finalizing);
            s.update_progress(
                progress::FINALIZING_PERCENT,
                progress::finalizing_message(),
                elapsed_secs,
            );
        })
        .await;
        event_bus.emit_lossy(StudioEvent::GenerationProgress {
            session_id,
            state: fsm.state().as_str().to_string(),
            percent: progress::FINALIZING_PERCENT,
            message: progress::finalizing_message(),
            elapsed_seconds: elapsed_secs,
            timestamp: Utc::now(),
        });

        let mut checks: u32 = 0;
        while !fsm.is_terminal() {
            if shutdown.is_cancelled() {
                tracing::info!(session_id = %session_id, "Polling stopped by shutdown");
                return;
            }

            coarse_check(&*backend, &task_id, session_id, &mut fsm, "finalizing").await;
            if fsm.is_terminal() {
                break;
            }

            checks += 1;
            if let Some(max) = timing.max_finalizing_checks {
                if checks >= max {
                    tracing::error!(
                        session_id = %session_id,
                        checks,
                        "Finalizing check ceiling reached"
                    );
                    fail_session(
                        &sessions,
                        &event_bus,
                        session_id,
                        "Generation timed out waiting for the remote service",
                    )
                    .await;
                    return;
                }
            }

            update_session(&sessions, session_id, |s| {
                s.progress.elapsed_seconds = started.elapsed().as_secs();
            })
            .await;
            sleep(timing.finalizing_every).await;
        }
    }

    match fsm.state() {
        GenerationState::Succeeded => {
            let Some(url) = fsm.result_url().map(str::to_string) else {
                fail_session(
                    &sessions,
                    &event_bus,
                    session_id,
                    "Generation service returned no result locator",
                )
                .await;
                return;
            };

            tracing::info!(session_id = %session_id, url = %url, "Remote task succeeded");
            let elapsed_secs = started.elapsed().as_secs();
            update_session(&sessions, session_id, |s| {
                s.result_url = Some(url.clone());
                s.transition_to(GenerationState::Succeeded);
                s.update_progress(progress::DONE_PERCENT, progress::done_message(), elapsed_secs);
            })
            .await;
            event_bus.emit_lossy(StudioEvent::GenerationProgress {
                session_id,
                state: GenerationState::Succeeded.as_str().to_string(),
                percent: progress::DONE_PERCENT,
                message: progress::done_message(),
                elapsed_seconds: elapsed_secs,
                timestamp: Utc::now(),
            });
            event_bus.emit_lossy(StudioEvent::GenerationSucceeded {
                session_id,
                timestamp: Utc::now(),
            });

            // Fetch the asset exactly once; failure is terminal for the run
            match backend.download_asset(&url).await {
                Ok(bytes) => {
                    let size_bytes = bytes.len();
                    update_session(&sessions, session_id, |s| {
                        s.asset = Some(bytes);
                    })
                    .await;
                    event_bus.emit_lossy(StudioEvent::AssetReady {
                        session_id,
                        size_bytes,
                        timestamp: Utc::now(),
                    });
                }
                Err(e) => {
                    tracing::error!(session_id = %session_id, error = %e, "Asset download failed");
                    let message = format!("Asset download failed: {}", e);
                    update_session(&sessions, session_id, |s| {
                        s.error = Some(message.clone());
                    })
                    .await;
                    event_bus.emit_lossy(StudioEvent::GenerationFailed {
                        session_id,
                        message,
                        timestamp: Utc::now(),
                    });
                }
            }
        }
        GenerationState::Failed => {
            tracing::warn!(session_id = %session_id, "Remote task failed");
            fail_session(&sessions, &event_bus, session_id, "3D generation failed").await;
        }
        state => {
            // Only reachable through the shutdown returns above
            tracing::debug!(session_id = %session_id, state = state.as_str(), "Polling ended early");
        }
    }
}

/// One status check; transient failures are logged and swallowed so the
/// loop retries on its fixed interval
async fn coarse_check<B: RemoteGeneration + ?Sized>(
    backend: &B,
    task_id: &str,
    session_id: Uuid,
    fsm: &mut PollerFsm,
    phase: &'static str,
) {
    match backend.check_task(task_id).await {
        Ok(snapshot) => match snapshot.outcome() {
            Ok(outcome) => fsm.on_outcome(outcome),
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    phase,
                    error = %e,
                    "Malformed status response, will retry"
                );
            }
        },
        Err(e) => {
            tracing::debug!(
                session_id = %session_id,
                phase,
                error = %e,
                "Transient status check failure, will retry"
            );
        }
    }
}

async fn update_session<F>(sessions: &SessionRegistry, session_id: Uuid, mutate: F)
where
    F: FnOnce(&mut GenerationSession),
{
    let mut map = sessions.write().await;
    if let Some(session) = map.get_mut(&session_id) {
        mutate(session);
    }
}

async fn fail_session(
    sessions: &SessionRegistry,
    event_bus: &EventBus,
    session_id: Uuid,
    message: &str,
) {
    update_session(sessions, session_id, |s| {
        s.transition_to(GenerationState::Failed);
        s.error = Some(message.to_string());
        s.progress.message = message.to_string();
    })
    .await;
    event_bus.emit_lossy(StudioEvent::GenerationFailed {
        session_id,
        message: message.to_string(),
        timestamp: Utc::now(),
    });
}
