//! Session error types.

use thiserror::Error;

use super::types::SessionId;

/// Failures while a session processes a request.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session was closed before or while the request ran.
    #[error("Session {0} is closed")]
    Closed(SessionId),

    /// Request handling panicked.
    #[error("Request handling panicked: {0}")]
    Panicked(String),
}

impl SessionError {
    /// Build a panic error from the payload caught by `catch_unwind`.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self::Panicked(message)
    }
}
