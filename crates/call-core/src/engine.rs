//! Real-time engine capability
//!
//! The engine owns connection establishment and media transport. This crate
//! only calls into it through [`CallEngine`] and listens to the closed set of
//! events described by [`EngineEvent`].
//!
//! # Event subscription
//!
//! Handlers are registered per [`EngineEventKind`] with [`CallEngine::on`]
//! and removed with [`CallEngine::off`]; every `on` must be paired with
//! exactly one `off`. Engine adapters usually embed an [`EventRegistry`],
//! which implements the bookkeeping and the ordered fan-out:
//!
//! ```rust
//! use callkit_call_core::engine::{EngineEvent, EngineEventKind, EventRegistry};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let registry = EventRegistry::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = seen.clone();
//!
//! let id = registry.on(EngineEventKind::LineBusy, Arc::new(move |_event: EngineEvent| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! }));
//! registry.emit(&EngineEvent::LineBusy { user_id: "bob".into() });
//! assert!(registry.off(EngineEventKind::LineBusy, id));
//! registry.emit(&EngineEvent::LineBusy { user_id: "bob".into() });
//!
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! ```

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::CallResult;
use crate::types::{CallKind, ViewTarget};

/// Tag of an engine event, used as the subscription key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineEventKind {
    Error,
    UserEnter,
    UserLeave,
    LineBusy,
    CallingCancel,
    CallingTimeout,
    NoResponse,
    CallEnd,
    VideoAvailabilityChanged,
    AudioAvailabilityChanged,
}

impl EngineEventKind {
    /// Every event kind the engine can emit, in subscription order
    pub const ALL: [EngineEventKind; 10] = [
        EngineEventKind::Error,
        EngineEventKind::UserEnter,
        EngineEventKind::UserLeave,
        EngineEventKind::LineBusy,
        EngineEventKind::CallingCancel,
        EngineEventKind::CallingTimeout,
        EngineEventKind::NoResponse,
        EngineEventKind::CallEnd,
        EngineEventKind::VideoAvailabilityChanged,
        EngineEventKind::AudioAvailabilityChanged,
    ];
}

impl fmt::Display for EngineEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Event emitted by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Engine-level failure; the session stays usable
    Error { code: Option<i32>, message: String },
    /// Peer joined the call
    UserEnter { user_id: String },
    /// Peer left the call
    UserLeave { user_id: String },
    /// Peer is already on another call
    LineBusy { user_id: String },
    /// Caller cancelled before pickup
    CallingCancel { user_id: String },
    /// Nobody picked up within the call timeout
    CallingTimeout { user_id: Option<String> },
    /// Peer did not respond to the invitation
    NoResponse { user_id: String },
    /// Call finished
    CallEnd,
    /// Peer's video track appeared or disappeared
    VideoAvailabilityChanged { user_id: String, available: bool },
    /// Peer's microphone appeared or disappeared
    AudioAvailabilityChanged { user_id: String, available: bool },
}

impl EngineEvent {
    /// Subscription tag of this event
    pub fn kind(&self) -> EngineEventKind {
        match self {
            EngineEvent::Error { .. } => EngineEventKind::Error,
            EngineEvent::UserEnter { .. } => EngineEventKind::UserEnter,
            EngineEvent::UserLeave { .. } => EngineEventKind::UserLeave,
            EngineEvent::LineBusy { .. } => EngineEventKind::LineBusy,
            EngineEvent::CallingCancel { .. } => EngineEventKind::CallingCancel,
            EngineEvent::CallingTimeout { .. } => EngineEventKind::CallingTimeout,
            EngineEvent::NoResponse { .. } => EngineEventKind::NoResponse,
            EngineEvent::CallEnd => EngineEventKind::CallEnd,
            EngineEvent::VideoAvailabilityChanged { .. } => {
                EngineEventKind::VideoAvailabilityChanged
            }
            EngineEvent::AudioAvailabilityChanged { .. } => {
                EngineEventKind::AudioAvailabilityChanged
            }
        }
    }
}

/// Identifier returned by [`CallEngine::on`], needed to remove the handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Engine event callback
pub type EventHandler = Arc<dyn Fn(EngineEvent) + Send + Sync>;

/// Parameters of an outgoing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub peer_id: String,
    pub kind: CallKind,
    pub timeout_secs: u64,
}

/// A user's stream bound to a rendering target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewBinding {
    pub user_id: String,
    pub target: ViewTarget,
}

impl ViewBinding {
    pub fn new(user_id: impl Into<String>, target: ViewTarget) -> Self {
        Self {
            user_id: user_id.into(),
            target,
        }
    }
}

/// The real-time communication engine
///
/// Request methods are asynchronous; their completion only means the engine
/// accepted the request. Call outcomes always arrive as [`EngineEvent`]s.
#[async_trait]
pub trait CallEngine: Send + Sync {
    /// Log the local user in with a signed token
    async fn login(&self, user_id: &str, token: &str) -> CallResult<()>;

    /// Log out; fire-and-forget
    async fn logout(&self) -> CallResult<()>;

    /// Place a call; a missed pickup is reported as `CallingTimeout`
    async fn call(&self, request: CallRequest) -> CallResult<()>;

    /// Hang up or cancel the current call; fire-and-forget
    async fn hangup(&self) -> CallResult<()>;

    /// Render the local camera into a target
    async fn start_local_view(&self, binding: ViewBinding) -> CallResult<()>;

    /// Render a remote user's stream into a target
    async fn start_remote_view(&self, binding: ViewBinding) -> CallResult<()>;

    /// Stop rendering a remote user's stream
    async fn stop_remote_view(&self, binding: ViewBinding) -> CallResult<()>;

    /// Register a handler for one event kind
    fn on(&self, kind: EngineEventKind, handler: EventHandler) -> SubscriptionId;

    /// Remove a handler; returns false if it was not registered
    fn off(&self, kind: EngineEventKind, id: SubscriptionId) -> bool;
}

/// Builds an engine instance bound to an application identifier
#[cfg_attr(test, mockall::automock)]
pub trait EngineConnector: Send + Sync {
    fn connect(&self, application_id: &str) -> CallResult<Arc<dyn CallEngine>>;
}

/// Subscription table for engine adapters
///
/// Handlers for the same kind run in registration order. `emit` snapshots
/// the handler list before invoking it, so handlers may call `on`/`off`
/// without deadlocking.
#[derive(Default)]
pub struct EventRegistry {
    handlers: DashMap<EngineEventKind, Vec<(SubscriptionId, EventHandler)>>,
    next_id: AtomicU64,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler
    pub fn on(&self, kind: EngineEventKind, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.handlers.entry(kind).or_default().push((id, handler));
        id
    }

    /// Remove a handler
    pub fn off(&self, kind: EngineEventKind, id: SubscriptionId) -> bool {
        let Some(mut entry) = self.handlers.get_mut(&kind) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|(existing, _)| *existing != id);
        before != entry.len()
    }

    /// Deliver an event to every handler registered for its kind
    pub fn emit(&self, event: &EngineEvent) -> usize {
        let handlers: Vec<EventHandler> = match self.handlers.get(&event.kind()) {
            Some(entry) => entry.iter().map(|(_, handler)| handler.clone()).collect(),
            None => return 0,
        };
        for handler in &handlers {
            handler(event.clone());
        }
        handlers.len()
    }

    /// Number of handlers registered for `kind`
    pub fn handler_count(&self, kind: EngineEventKind) -> usize {
        self.handlers.get(&kind).map(|entry| entry.len()).unwrap_or(0)
    }

    /// Number of handlers across all kinds
    pub fn total_handlers(&self) -> usize {
        self.handlers.iter().map(|entry| entry.value().len()).sum()
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("total_handlers", &self.total_handlers())
            .finish()
    }
}
