use std::time::Duration;

use thiserror::Error;

/// Failure of a persistence or fetch request, as reported to store consumers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The transport never produced a response (unreachable host, timeout, ...).
    #[error("{0}")]
    Network(String),
    /// The remote answered with a non-OK status.
    #[error("{message}")]
    ServerRejected { status: u16, message: String },
    /// The remote answered OK but the body did not have the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),
    /// The local state could not be turned into a request body.
    #[error("failed to encode request: {0}")]
    Encode(String),
    /// The mutation was dropped before its request settled.
    #[error("request cancelled before it settled")]
    Cancelled,
}

impl SyncError {
    /// Human-readable message suitable for display next to the reverted view.
    pub fn message(&self) -> &str {
        match self {
            SyncError::Network(message) => message,
            SyncError::ServerRejected { message, .. } => message,
            SyncError::Decode(message) => message,
            SyncError::Encode(message) => message,
            SyncError::Cancelled => "request cancelled before it settled",
        }
    }

    /// HTTP status of a rejected request, if the remote answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::ServerRejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<TransportError> for SyncError {
    fn from(err: TransportError) -> Self {
        SyncError::Network(err.to_string())
    }
}

/// Failure raised by a [`Transport`](crate::Transport) before any response arrived.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("{0}")]
    Connect(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Other(String),
}
