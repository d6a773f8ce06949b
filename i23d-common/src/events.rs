//! Event types for the i23d event system
//!
//! Provides the shared event definitions and EventBus used to push
//! generation progress from the background session task to connected
//! SSE clients.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Studio event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// The serialized `type` tag doubles as the SSE event name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StudioEvent {
    /// A generation session was created and submitted to the remote service
    GenerationStarted {
        /// Session that was started
        session_id: Uuid,
        /// When the session started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Displayed progress changed
    ///
    /// Emitted on every display tick while the session is live. The percent
    /// is the smoothed elapsed-time estimate, not a remote measurement.
    GenerationProgress {
        /// Session being reported
        session_id: Uuid,
        /// Session state name ("estimating", "finalizing", ...)
        state: String,
        /// Displayed percentage (0-100)
        percent: u8,
        /// User-facing progress message
        message: String,
        /// Seconds since the session started
        elapsed_seconds: u64,
        /// When the update was produced
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The remote service reported the task succeeded
    GenerationSucceeded {
        /// Session that succeeded
        session_id: Uuid,
        /// When success was observed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The session failed (remote failure, submission error, or timeout)
    GenerationFailed {
        /// Session that failed
        session_id: Uuid,
        /// User-facing failure message
        message: String,
        /// When the failure was observed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The generated asset was downloaded and is ready to preview/export
    AssetReady {
        /// Session owning the asset
        session_id: Uuid,
        /// Size of the downloaded asset in bytes
        size_bytes: usize,
        /// When the download completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl StudioEvent {
    /// Event type name, used as the SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            StudioEvent::GenerationStarted { .. } => "GenerationStarted",
            StudioEvent::GenerationProgress { .. } => "GenerationProgress",
            StudioEvent::GenerationSucceeded { .. } => "GenerationSucceeded",
            StudioEvent::GenerationFailed { .. } => "GenerationFailed",
            StudioEvent::AssetReady { .. } => "AssetReady",
        }
    }

    /// Session the event belongs to
    pub fn session_id(&self) -> Uuid {
        match self {
            StudioEvent::GenerationStarted { session_id, .. }
            | StudioEvent::GenerationProgress { session_id, .. }
            | StudioEvent::GenerationSucceeded { session_id, .. }
            | StudioEvent::GenerationFailed { session_id, .. }
            | StudioEvent::AssetReady { session_id, .. } => *session_id,
        }
    }
}

/// Broadcast bus for studio events
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StudioEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    ///
    /// Old events are dropped once `capacity` unconsumed events are buffered.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring the no-subscriber case
    ///
    /// Progress events are advisory; a session must make progress whether or
    /// not a browser is currently connected.
    pub fn emit_lossy(&self, event: StudioEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::trace!("No subscribers for event: {:?}", e.0.event_type());
        }
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress_event(percent: u8) -> StudioEvent {
        StudioEvent::GenerationProgress {
            session_id: Uuid::new_v4(),
            state: "estimating".to_string(),
            percent,
            message: "working".to_string(),
            elapsed_seconds: 1,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_event_type_names() {
        assert_eq!(progress_event(10).event_type(), "GenerationProgress");
        let failed = StudioEvent::GenerationFailed {
            session_id: Uuid::new_v4(),
            message: "boom".to_string(),
            timestamp: chrono::Utc::now(),
        };
        assert_eq!(failed.event_type(), "GenerationFailed");
    }

    #[test]
    fn test_event_serialization_tag() {
        let json = serde_json::to_value(progress_event(42)).unwrap();
        assert_eq!(json["type"], "GenerationProgress");
        assert_eq!(json["percent"], 42);
    }

    #[tokio::test]
    async fn test_bus_delivers_to_subscriber() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let event = progress_event(5);
        let id = event.session_id();
        bus.emit_lossy(event);
        let received = rx.recv().await.unwrap();
        assert_eq!(received.session_id(), id);
    }

    #[test]
    fn test_emit_without_subscribers_does_not_panic() {
        let bus = EventBus::new(4);
        bus.emit_lossy(progress_event(1));
    }
}
