//! Session configuration
//!
//! [`SessionConfig`] follows the builder style used across the library:
//! start from [`SessionConfig::new`] (or [`Default`]) and chain `with_*`
//! setters. Configurations can also be loaded from JSON.
//!
//! ```rust
//! use callkit_call_core::SessionConfig;
//!
//! let config = SessionConfig::new()
//!     .with_call_timeout_secs(45)
//!     .with_remote_view("peer-video")
//!     .with_auto_push(true);
//!
//! assert_eq!(config.call_timeout().as_secs(), 45);
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{CallError, CallResult};
use crate::types::ViewTarget;

/// Default time the engine waits for the callee to pick up
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

/// Default rendering target for the remote stream
pub const DEFAULT_REMOTE_VIEW: &str = "remote-video-wrap";

/// Default rendering target for the local preview
pub const DEFAULT_LOCAL_VIEW: &str = "local-video-wrap";

/// Configuration for a [`CallSession`](crate::session::CallSession)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds the engine waits for pickup before reporting a timeout
    pub call_timeout_secs: u64,
    /// Where the remote stream is rendered
    pub remote_view: ViewTarget,
    /// Where the local preview is rendered
    pub local_view: ViewTarget,
    /// Start the local preview once the engine accepts a video call
    pub start_local_view: bool,
    /// Refuse `call()` while another call attempt is still active
    pub reject_concurrent_calls: bool,
    /// Send push notifications automatically on call and cancel
    pub auto_push: bool,
    /// Capacity of the status broadcast channel
    pub event_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
            remote_view: ViewTarget::new(DEFAULT_REMOTE_VIEW),
            local_view: ViewTarget::new(DEFAULT_LOCAL_VIEW),
            start_local_view: false,
            reject_concurrent_calls: true,
            auto_push: false,
            event_buffer: 256,
        }
    }
}

impl SessionConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON; absent fields keep their defaults
    pub fn from_json(json: &str) -> CallResult<Self> {
        let config: SessionConfig = serde_json::from_str(json)
            .map_err(|e| CallError::config(format!("invalid session config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the pickup timeout in seconds
    pub fn with_call_timeout_secs(mut self, secs: u64) -> Self {
        self.call_timeout_secs = secs;
        self
    }

    /// Set the remote rendering target
    pub fn with_remote_view(mut self, target: impl Into<String>) -> Self {
        self.remote_view = ViewTarget::new(target);
        self
    }

    /// Set the local preview target
    pub fn with_local_view(mut self, target: impl Into<String>) -> Self {
        self.local_view = ViewTarget::new(target);
        self
    }

    /// Start the local preview after a video call is accepted by the engine
    pub fn with_start_local_view(mut self, enable: bool) -> Self {
        self.start_local_view = enable;
        self
    }

    /// Guard against placing a call while another is active
    pub fn with_reject_concurrent_calls(mut self, enable: bool) -> Self {
        self.reject_concurrent_calls = enable;
        self
    }

    /// Send push notifications automatically alongside call and hangup
    pub fn with_auto_push(mut self, enable: bool) -> Self {
        self.auto_push = enable;
        self
    }

    /// Set the status broadcast capacity
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Pickup timeout as a [`Duration`]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> CallResult<()> {
        if self.call_timeout_secs == 0 {
            return Err(CallError::config("call timeout must be at least one second"));
        }
        if self.remote_view.as_str().is_empty() {
            return Err(CallError::config("remote view target must not be empty"));
        }
        if self.local_view.as_str().is_empty() {
            return Err(CallError::config("local view target must not be empty"));
        }
        if self.event_buffer == 0 {
            return Err(CallError::config("event buffer must hold at least one event"));
        }
        Ok(())
    }
}
