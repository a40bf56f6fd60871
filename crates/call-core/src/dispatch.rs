//! Engine event routing table
//!
//! [`project`] is the single place where an [`EngineEvent`] becomes an
//! application status plus at most one view side effect:
//!
//! | Engine event                          | Status            | Side effect                      |
//! |---------------------------------------|-------------------|----------------------------------|
//! | `Error`                               | `Error`           | -                                |
//! | `UserEnter`                           | `Connected`       | video calls: start remote view   |
//! | `UserLeave`                           | `Leave`           | -                                |
//! | `LineBusy`                            | `Busy`            | -                                |
//! | `CallingCancel`                       | `Rejected`        | -                                |
//! | `CallingTimeout`                      | `Timeout`         | -                                |
//! | `NoResponse`                          | `NoResponse`      | -                                |
//! | `CallEnd`                             | `Ended`           | -                                |
//! | `VideoAvailabilityChanged(false)`     | `AudioModeActive` | stop remote view                 |
//! | `VideoAvailabilityChanged(true)`      | `VideoModeActive` | -                                |
//! | `AudioAvailabilityChanged`            | -                 | -                                |
//!
//! The match is exhaustive over [`EngineEvent`], so adding an event kind
//! fails to compile until it is routed here.

use crate::engine::EngineEvent;
use crate::types::{CallKind, CallStatus};

/// View binding change requested by an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEffect {
    StartRemoteView { peer_id: String },
    StopRemoteView { peer_id: String },
}

/// Outcome of routing one engine event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Projection {
    pub status: Option<CallStatus>,
    pub message: Option<String>,
    pub effect: Option<ViewEffect>,
}

impl Projection {
    fn status(status: CallStatus) -> Self {
        Self {
            status: Some(status),
            message: Some(status.default_message().to_string()),
            effect: None,
        }
    }

    fn with_effect(mut self, effect: Option<ViewEffect>) -> Self {
        self.effect = effect;
        self
    }

    fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }
}

/// Route an engine event
///
/// `kind` is the negotiated kind of the current call and `peer` its remote
/// user. View effects target the current peer; an event that needs a view
/// effect while no peer is known yields the status alone.
pub fn project(event: &EngineEvent, kind: CallKind, peer: Option<&str>) -> Projection {
    match event {
        EngineEvent::Error { code, message } => {
            let detail = match code {
                Some(code) => format!("{} ({}: {})", CallStatus::Error.default_message(), code, message),
                None => format!("{} ({})", CallStatus::Error.default_message(), message),
            };
            Projection::status(CallStatus::Error).with_message(detail)
        }
        EngineEvent::UserEnter { .. } => {
            let effect = if kind.is_video() {
                peer.map(|peer_id| ViewEffect::StartRemoteView {
                    peer_id: peer_id.to_string(),
                })
            } else {
                None
            };
            Projection::status(CallStatus::Connected).with_effect(effect)
        }
        EngineEvent::UserLeave { .. } => Projection::status(CallStatus::Leave),
        EngineEvent::LineBusy { .. } => Projection::status(CallStatus::Busy),
        EngineEvent::CallingCancel { .. } => Projection::status(CallStatus::Rejected),
        EngineEvent::CallingTimeout { .. } => Projection::status(CallStatus::Timeout),
        EngineEvent::NoResponse { .. } => Projection::status(CallStatus::NoResponse),
        EngineEvent::CallEnd => Projection::status(CallStatus::Ended),
        EngineEvent::VideoAvailabilityChanged { available: false, .. } => {
            let effect = peer.map(|peer_id| ViewEffect::StopRemoteView {
                peer_id: peer_id.to_string(),
            });
            Projection::status(CallStatus::AudioModeActive).with_effect(effect)
        }
        EngineEvent::VideoAvailabilityChanged { available: true, .. } => {
            Projection::status(CallStatus::VideoModeActive)
        }
        EngineEvent::AudioAvailabilityChanged { .. } => Projection::default(),
    }
}
