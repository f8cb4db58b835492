//! Error types for the Flowdeck core

use thiserror::Error;

/// Result type alias using FlowError
pub type Result<T> = std::result::Result<T, FlowError>;

/// Failure reported by an external collaborator (descriptor service,
/// execution backend).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection could not be established or was dropped
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete in time
    #[error("Request timed out")]
    Timeout,

    /// The acting session is no longer authenticated
    #[error("Session is not authorized")]
    Unauthorized,

    /// Non-success response from the service
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Whether this failure means the authenticated session is gone
    pub fn is_session_loss(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Errors that can occur in the Flowdeck core
#[derive(Debug, Error)]
pub enum FlowError {
    /// Fetching descriptors for a registry sync failed
    #[error("Registry fetch failed: {0}")]
    RegistryFetch(#[source] TransportError),

    /// A newer sync was issued while this one was in flight
    #[error("Registry sync superseded by a newer request")]
    SyncSuperseded,

    /// Descriptor cannot be indexed (no usable id)
    #[error("Invalid node descriptor: {0}")]
    InvalidDescriptor(String),

    /// Backend call failed outside the polling loop
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Tracker operation issued before any run was started
    #[error("No execution is being tracked")]
    NotTracking,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FlowError {
    /// Create an invalid descriptor error with a message
    pub fn invalid_descriptor(msg: impl Into<String>) -> Self {
        Self::InvalidDescriptor(msg.into())
    }

    /// The transport failure behind this error, if any
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::RegistryFetch(e) | Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}
