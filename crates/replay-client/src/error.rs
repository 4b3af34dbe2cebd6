//! Error types for compute service calls.
//!
//! Every variant is terminal for the controller run that issued the call:
//! controllers never retry, they halt and keep their last good state.

/// Errors that can occur while calling the compute service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComputeError {
    /// The request never produced a response (connection refused, reset,
    /// DNS failure and similar).
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered but reported a failure, either through a
    /// non-success status or an `{"error": ...}` body.
    #[error("service error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Application {
        /// HTTP status, when the failure came from a non-success response.
        status: Option<u16>,
        /// Failure description reported by the service.
        message: String,
    },

    /// The response body could not be decoded into the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ComputeError {
    /// Build an application error that did not come with a status code.
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application {
            status: None,
            message: message.into(),
        }
    }

    /// Whether the failure happened below the HTTP layer.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<serde_json::Error> for ComputeError {
    fn from(source: serde_json::Error) -> Self {
        Self::Decode(source.to_string())
    }
}
