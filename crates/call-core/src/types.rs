//! Core data types shared across the call session library
//!
//! - [`CallIdentity`] - who is calling whom
//! - [`CallKind`] - negotiated media type of a call
//! - [`CallStatus`] - application-visible projection of engine events
//! - [`PushAction`] - out-of-band alert action
//! - [`ViewTarget`] - opaque rendering target handle

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of one call session (one engine login lifetime)
pub type SessionId = uuid::Uuid;

/// Identity of one call attempt
///
/// The local user is fixed for the lifetime of the session; the remote peer
/// is assigned when the call is placed. A new identity is built for every
/// call attempt rather than mutating an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallIdentity {
    local_user_id: String,
    remote_user_id: String,
}

impl CallIdentity {
    /// Create an identity for a call between `local` and `remote`
    pub fn new(local_user_id: impl Into<String>, remote_user_id: impl Into<String>) -> Self {
        Self {
            local_user_id: local_user_id.into(),
            remote_user_id: remote_user_id.into(),
        }
    }

    /// Local user identifier
    pub fn local_user_id(&self) -> &str {
        &self.local_user_id
    }

    /// Remote peer identifier
    pub fn remote_user_id(&self) -> &str {
        &self.remote_user_id
    }
}

/// Media type of a call as negotiated with the engine
///
/// The numeric codes (`0`, `1`, `2`) are the values engines and push
/// backends exchange on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    /// No call has been placed yet
    #[default]
    Unknown,
    /// Audio-only call
    Audio,
    /// Audio and video call
    Video,
}

impl CallKind {
    /// Wire code for this kind
    pub fn code(self) -> u8 {
        match self {
            CallKind::Unknown => 0,
            CallKind::Audio => 1,
            CallKind::Video => 2,
        }
    }

    /// Whether remote video should be rendered for this kind
    pub fn is_video(self) -> bool {
        self == CallKind::Video
    }
}

impl TryFrom<u8> for CallKind {
    type Error = crate::error::CallError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(CallKind::Unknown),
            1 => Ok(CallKind::Audio),
            2 => Ok(CallKind::Video),
            other => Err(crate::error::CallError::config(format!(
                "unknown call kind code {}",
                other
            ))),
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallKind::Unknown => write!(f, "unknown"),
            CallKind::Audio => write!(f, "audio"),
            CallKind::Video => write!(f, "video"),
        }
    }
}

/// Application-visible call status
///
/// Exactly one status is current at any instant. Statuses are pushed to the
/// application through [`StatusListener`](crate::events::StatusListener);
/// they are never polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallStatus {
    /// Call placed, waiting for the peer to join
    #[serde(rename = "calling")]
    Calling,
    /// Peer joined the call
    #[serde(rename = "connected")]
    Connected,
    /// Peer left the call
    #[serde(rename = "leave")]
    Leave,
    /// Call was cancelled before pickup
    #[serde(rename = "rejected")]
    Rejected,
    /// Call was hung up
    #[serde(rename = "hangup")]
    Hangup,
    /// Peer line is busy
    #[serde(rename = "busy")]
    Busy,
    /// Call was not picked up in time
    #[serde(rename = "timeout")]
    Timeout,
    /// Peer did not respond
    #[serde(rename = "noresponse")]
    NoResponse,
    /// Call ended
    #[serde(rename = "callEnd")]
    Ended,
    /// Engine reported an error; the session stays alive
    #[serde(rename = "callError")]
    Error,
    /// Remote video became available again
    #[serde(rename = "video-call")]
    VideoModeActive,
    /// Remote video is unavailable; presented as an audio call
    #[serde(rename = "audio-call")]
    AudioModeActive,
    /// Engine login was refused; the session cannot place calls
    #[serde(rename = "loginError")]
    LoginFailed,
}

impl CallStatus {
    /// Stable wire code of this status
    pub fn as_str(self) -> &'static str {
        match self {
            CallStatus::Calling => "calling",
            CallStatus::Connected => "connected",
            CallStatus::Leave => "leave",
            CallStatus::Rejected => "rejected",
            CallStatus::Hangup => "hangup",
            CallStatus::Busy => "busy",
            CallStatus::Timeout => "timeout",
            CallStatus::NoResponse => "noresponse",
            CallStatus::Ended => "callEnd",
            CallStatus::Error => "callError",
            CallStatus::VideoModeActive => "video-call",
            CallStatus::AudioModeActive => "audio-call",
            CallStatus::LoginFailed => "loginError",
        }
    }

    /// Default human-readable message shown alongside the status
    pub fn default_message(self) -> &'static str {
        match self {
            CallStatus::Calling => "Waiting for the other party to join...",
            CallStatus::Connected => "Call in progress...",
            CallStatus::Leave => "The other party hung up",
            CallStatus::Rejected => "The other party declined the call",
            CallStatus::Hangup => "The other party hung up",
            CallStatus::Busy => "The other party is busy...",
            CallStatus::Timeout => "Call connection timed out",
            CallStatus::NoResponse => "The other party did not respond",
            CallStatus::Ended => "Call ended",
            CallStatus::Error => "The call encountered an error",
            CallStatus::VideoModeActive => "Switched to video call",
            CallStatus::AudioModeActive => "Switched to audio call",
            CallStatus::LoginFailed => "Login failed",
        }
    }

    /// Whether this status ends the current call attempt
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CallStatus::Leave
                | CallStatus::Rejected
                | CallStatus::Hangup
                | CallStatus::Busy
                | CallStatus::Timeout
                | CallStatus::NoResponse
                | CallStatus::Ended
        )
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action carried by an out-of-band push notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushAction {
    /// A call is being placed to the recipient
    Initiate,
    /// A previously announced call was cancelled, possibly before pickup
    Cancel,
}

impl PushAction {
    /// Wire code for this action
    pub fn code(self) -> u8 {
        match self {
            PushAction::Initiate => 0,
            PushAction::Cancel => 1,
        }
    }
}

impl TryFrom<u8> for PushAction {
    type Error = crate::error::CallError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(PushAction::Initiate),
            1 => Ok(PushAction::Cancel),
            other => Err(crate::error::CallError::config(format!(
                "unknown push action code {}",
                other
            ))),
        }
    }
}

/// Opaque handle naming where a media stream is rendered
///
/// For browser-backed engines this is a container element id; native
/// engines may use a surface or window name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewTarget(String);

impl ViewTarget {
    /// Wrap a target handle
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Raw handle
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
