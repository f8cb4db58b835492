//! Event types for reporting execution tracking progress
//!
//! Events are sent from the tracker to the frontend (or any consumer)
//! to report status transitions, log updates and fetch failures.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::execution::ExecutionStatus;

/// Trait for sending tracker events
///
/// This abstracts over the transport mechanism (UI channel, mpsc, etc.)
/// allowing the tracker to be used in different contexts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel closed)
    fn send(&self, event: TrackerEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Events emitted while following one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TrackerEvent {
    /// Tracking of a run began
    #[serde(rename_all = "camelCase")]
    TrackingStarted { execution_id: String },

    /// The mirrored remote status changed
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        execution_id: String,
        previous: Option<ExecutionStatus>,
        status: ExecutionStatus,
    },

    /// The log list grew
    #[serde(rename_all = "camelCase")]
    LogsUpdated { execution_id: String, count: usize },

    /// A fetch failed; polling continues
    #[serde(rename_all = "camelCase")]
    FetchFailed { execution_id: String, error: String },

    /// The run reached a terminal status and polling stopped
    #[serde(rename_all = "camelCase")]
    TrackingFinished {
        execution_id: String,
        status: ExecutionStatus,
    },

    /// Polling was cancelled locally
    #[serde(rename_all = "camelCase")]
    TrackingCancelled { execution_id: String },
}

impl TrackerEvent {
    /// Execution this event concerns
    pub fn execution_id(&self) -> &str {
        match self {
            Self::TrackingStarted { execution_id }
            | Self::StatusChanged { execution_id, .. }
            | Self::LogsUpdated { execution_id, .. }
            | Self::FetchFailed { execution_id, .. }
            | Self::TrackingFinished { execution_id, .. }
            | Self::TrackingCancelled { execution_id } => execution_id,
        }
    }
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: TrackerEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: Mutex<Vec<TrackerEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<TrackerEvent> {
        self.events.lock().clone()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: TrackerEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}
