//! Status notifications delivered to the application
//!
//! Statuses reach the application in two ways:
//!
//! - **[`StatusListener`]** - the callback handed to the session factory.
//!   It is invoked synchronously, in emission order, for every status.
//! - **[`StatusEmitter`]** - a broadcast of [`StatusEvent`]s that any number
//!   of observers can subscribe to via
//!   [`CallSession::subscribe`](crate::session::CallSession::subscribe).
//!
//! Closures implement [`StatusListener`]:
//!
//! ```rust
//! use callkit_call_core::{CallStatus, StatusListener};
//!
//! let listener = |status: CallStatus, message: Option<&str>| {
//!     println!("{} {}", status, message.unwrap_or_default());
//! };
//! listener.on_status(CallStatus::Calling, Some("dialing"));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

use crate::types::{CallStatus, SessionId};

/// Application callback for status transitions
///
/// A session never invokes its listener concurrently, but calls may come
/// from different threads: `Calling` is reported from the task that called
/// [`CallSession::call`](crate::session::CallSession::call), event-driven
/// statuses from the session's dispatcher task. Keep `on_status` short and
/// non-blocking.
pub trait StatusListener: Send + Sync {
    fn on_status(&self, status: CallStatus, message: Option<&str>);
}

impl<F> StatusListener for F
where
    F: Fn(CallStatus, Option<&str>) + Send + Sync,
{
    fn on_status(&self, status: CallStatus, message: Option<&str>) {
        self(status, message)
    }
}

/// One emitted status with its context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub session_id: SessionId,
    pub status: CallStatus,
    pub message: Option<String>,
    /// Remote user of the call the status belongs to, if any
    pub peer_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Broadcast fan-out of [`StatusEvent`]s
#[derive(Debug, Clone)]
pub struct StatusEmitter {
    sender: broadcast::Sender<StatusEvent>,
}

impl StatusEmitter {
    /// Create an emitter holding up to `capacity` unread events per receiver
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn emit(&self, event: StatusEvent) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for StatusEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Listener forwarding statuses into an unbounded channel
///
/// Lets an async task consume statuses in order without blocking the
/// session.
#[derive(Debug, Clone)]
pub struct ChannelStatusListener {
    sender: mpsc::UnboundedSender<(CallStatus, Option<String>)>,
}

impl ChannelStatusListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(CallStatus, Option<String>)>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl StatusListener for ChannelStatusListener {
    fn on_status(&self, status: CallStatus, message: Option<&str>) {
        let _ = self.sender.send((status, message.map(str::to_string)));
    }
}
