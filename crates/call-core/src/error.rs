//! Error types for the call session library

use thiserror::Error;

/// Result type for call session operations
pub type CallResult<T> = Result<T, CallError>;

/// Errors that can occur while setting up or driving a call session
///
/// Only credential failures are fatal to session creation. Everything the
/// engine reports while a session is alive is converted into a
/// [`CallStatus`](crate::types::CallStatus) or a log line before it can
/// reach the session's caller.
#[derive(Debug, Error)]
pub enum CallError {
    /// Credentials could not be fetched or were malformed
    #[error("Credential error: {reason}")]
    Credential { reason: String },

    /// Engine login was refused
    #[error("Login failed: {reason}")]
    Login { reason: String },

    /// An engine request failed
    #[error("Engine error in {operation}: {reason}")]
    Engine { operation: String, reason: String },

    /// Out-of-band push notification failed
    #[error("Push notification to {peer_id} failed: {reason}")]
    PushNotify { peer_id: String, reason: String },

    /// Engine did not acknowledge a call within the allotted time
    #[error("Call not acknowledged after {seconds} seconds")]
    CallTimeout { seconds: u64 },

    /// Operation is not valid in the current session state
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// Session has no successful engine login
    #[error("Session is not logged in")]
    NotLoggedIn,

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Adapter-level failure from an external collaborator
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CallError {
    /// Create a credential error
    pub fn credential(reason: impl Into<String>) -> Self {
        Self::Credential {
            reason: reason.into(),
        }
    }

    /// Create a login error
    pub fn login(reason: impl Into<String>) -> Self {
        Self::Login {
            reason: reason.into(),
        }
    }

    /// Create an engine error for the named operation
    pub fn engine(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Engine {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a push notification error
    pub fn push_notify(peer_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PushNotify {
            peer_id: peer_id.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether retrying the failed operation can succeed without caller changes
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CallError::Login { .. }
                | CallError::Engine { .. }
                | CallError::CallTimeout { .. }
                | CallError::Other(_)
        )
    }
}
