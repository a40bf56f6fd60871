//! Call session state machine
//!
//! ```text
//!           call()            UserEnter
//!   Idle ───────────► Calling ─────────► Connected
//!     ▲                  │                   │
//!     │                  │ Busy / Rejected   │ Leave / Hangup / Ended
//!     │                  │ Timeout /         │
//!     │                  ▼ NoResponse        ▼
//!     └──── call() ─── Ended(status) ◄───────┘
//! ```
//!
//! Every branch ending in `Ended` is terminal for the current attempt; the
//! next `call()` starts over at `Calling`. `Error` leaves the phase alone.

use crate::engine::{EngineEventKind, SubscriptionId};
use crate::types::{CallIdentity, CallKind, CallStatus};

/// Phase of the current call attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    /// Logged in, no call placed yet
    Idle,
    /// Call placed, waiting for the peer
    Calling,
    /// Peer joined
    Connected,
    /// Attempt finished with the given terminal status
    Ended(CallStatus),
}

impl CallPhase {
    /// Whether a call attempt is in progress
    pub fn is_active(self) -> bool {
        matches!(self, CallPhase::Calling | CallPhase::Connected)
    }

    /// Phase reached after `status` is emitted
    pub fn after(self, status: CallStatus) -> CallPhase {
        match status {
            CallStatus::Calling => CallPhase::Calling,
            CallStatus::Connected => CallPhase::Connected,
            terminal if terminal.is_terminal() => CallPhase::Ended(terminal),
            _ => self,
        }
    }
}

/// How the current call is presented to the user
///
/// A video call whose remote track disappears is presented as audio without
/// touching the negotiated [`CallKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaPresentation {
    None,
    Audio,
    Video,
}

/// Mutable aggregate owned by one session
#[derive(Debug, Clone)]
pub struct SessionState {
    local_user_id: String,
    identity: Option<CallIdentity>,
    kind: CallKind,
    phase: CallPhase,
    presentation: MediaPresentation,
    logged_in: bool,
    closed: bool,
}

impl SessionState {
    pub fn new(local_user_id: impl Into<String>) -> Self {
        Self {
            local_user_id: local_user_id.into(),
            identity: None,
            kind: CallKind::Unknown,
            phase: CallPhase::Idle,
            presentation: MediaPresentation::None,
            logged_in: false,
            closed: false,
        }
    }

    pub fn local_user_id(&self) -> &str {
        &self.local_user_id
    }

    pub fn identity(&self) -> Option<&CallIdentity> {
        self.identity.as_ref()
    }

    /// Remote user of the current or last call
    pub fn peer(&self) -> Option<&str> {
        self.identity.as_ref().map(CallIdentity::remote_user_id)
    }

    pub fn kind(&self) -> CallKind {
        self.kind
    }

    pub fn phase(&self) -> CallPhase {
        self.phase
    }

    pub fn presentation(&self) -> MediaPresentation {
        self.presentation
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn set_logged_in(&mut self, logged_in: bool) {
        self.logged_in = logged_in;
    }

    pub fn close(&mut self) {
        self.closed = true;
        self.logged_in = false;
    }

    /// Start a new attempt; identity and kind are set before the engine is
    /// asked to dial, so no event can observe an unset kind
    pub fn begin_call(&mut self, peer_id: &str, kind: CallKind) -> CallIdentity {
        let identity = CallIdentity::new(self.local_user_id.clone(), peer_id);
        self.identity = Some(identity.clone());
        self.kind = kind;
        self.phase = CallPhase::Calling;
        self.presentation = if kind.is_video() {
            MediaPresentation::Video
        } else {
            MediaPresentation::Audio
        };
        identity
    }

    /// Fold an emitted status into the phase and presentation
    pub fn record(&mut self, status: CallStatus) {
        self.phase = self.phase.after(status);
        match status {
            CallStatus::AudioModeActive => self.presentation = MediaPresentation::Audio,
            CallStatus::VideoModeActive => self.presentation = MediaPresentation::Video,
            _ => {}
        }
    }
}

/// Engine subscriptions held by a session
///
/// Registration happens once and removal happens once; later attempts are
/// no-ops so handlers are never doubled or removed twice.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    entries: Vec<(EngineEventKind, SubscriptionId)>,
    registered: bool,
    retired: bool,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether subscriptions may still be registered
    pub fn can_register(&self) -> bool {
        !self.registered && !self.retired
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Store the registered subscriptions
    pub fn install(&mut self, entries: Vec<(EngineEventKind, SubscriptionId)>) {
        self.entries = entries;
        self.registered = true;
    }

    /// Hand back every subscription for removal, exactly once
    pub fn retire(&mut self) -> Vec<(EngineEventKind, SubscriptionId)> {
        self.retired = true;
        self.registered = false;
        std::mem::take(&mut self.entries)
    }

    pub fn entries(&self) -> &[(EngineEventKind, SubscriptionId)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
