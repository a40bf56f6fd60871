//! One-to-one call session
//!
//! A [`CallSession`] binds one engine login lifetime. It owns the identity
//! and kind of the current call, drives the [`CallPhase`] machine, registers
//! the engine event handlers, and reports every transition to the
//! application's [`StatusListener`].
//!
//! # Event flow
//!
//! ```text
//!  engine ──on(kind)──► handler ──mpsc──► dispatcher task ──► handle_event
//!                                                               │
//!                                        dispatch::project ◄────┤
//!                                        view side effect  ◄────┤
//!                                        StatusListener    ◄────┘
//! ```
//!
//! Events are handled one at a time, in the order the engine emitted them.
//!
//! # Status ordering
//!
//! [`CallSession::call`] reports [`CallStatus::Calling`] before the engine
//! sees the request. Every later status comes from an engine event;
//! [`CallSession::hangup`] is a request and never changes the status itself.
//!
//! # Usage
//!
//! ```rust,no_run
//! use callkit_call_core::{CallKind, CallSession};
//!
//! async fn place_call(session: &CallSession) -> Result<(), Box<dyn std::error::Error>> {
//!     session.call("bob", CallKind::Video).await?;
//!     // ... statuses arrive through the listener ...
//!     session.hangup().await?;
//!     session.logout().await;
//!     Ok(())
//! }
//! ```

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::dispatch::{self, ViewEffect};
use crate::engine::{CallEngine, CallRequest, EngineEvent, EngineEventKind, EventHandler, ViewBinding};
use crate::error::{CallError, CallResult};
use crate::events::{StatusEmitter, StatusEvent, StatusListener};
use crate::push::PushNotifier;
use crate::recovery::{retry_with_backoff, RetryConfig};
use crate::state::{CallPhase, MediaPresentation, SessionState, SubscriptionSet};
use crate::types::{CallIdentity, CallKind, CallStatus, PushAction, SessionId};

/// Handle to a call session
///
/// Cloning is cheap; all clones drive the same session.
#[derive(Clone)]
pub struct CallSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: SessionId,
    engine: Arc<dyn CallEngine>,
    signed_token: String,
    config: SessionConfig,
    listener: Arc<dyn StatusListener>,
    emitter: StatusEmitter,
    push: RwLock<Option<Arc<dyn PushNotifier>>>,
    state: Mutex<SessionState>,
    subscriptions: Mutex<SubscriptionSet>,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<EngineEvent>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    delivery: ReentrantMutex<()>,
}

impl CallSession {
    /// Create a session bound to `engine`
    ///
    /// The session is inert until [`login`](Self::login) succeeds; usually
    /// [`CallSessionFactory`](crate::factory::CallSessionFactory) does both.
    pub fn new(
        local_user_id: impl Into<String>,
        engine: Arc<dyn CallEngine>,
        signed_token: impl Into<String>,
        config: SessionConfig,
        listener: Arc<dyn StatusListener>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let emitter = StatusEmitter::new(config.event_buffer.max(1));
        Self {
            inner: Arc::new(SessionInner {
                id: SessionId::new_v4(),
                engine,
                signed_token: signed_token.into(),
                config,
                listener,
                emitter,
                push: RwLock::new(None),
                state: Mutex::new(SessionState::new(local_user_id)),
                subscriptions: Mutex::new(SubscriptionSet::new()),
                event_tx,
                event_rx: Mutex::new(Some(event_rx)),
                dispatcher: Mutex::new(None),
                delivery: ReentrantMutex::new(()),
            }),
        }
    }

    /// Attach the backend used by [`push_notify`](Self::push_notify)
    pub fn set_push_notifier(&self, notifier: Arc<dyn PushNotifier>) {
        *self.inner.push.write() = Some(notifier);
    }

    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn local_user_id(&self) -> String {
        self.inner.state.lock().local_user_id().to_string()
    }

    /// Identity of the current or last call attempt
    pub fn identity(&self) -> Option<CallIdentity> {
        self.inner.state.lock().identity().cloned()
    }

    pub fn peer(&self) -> Option<String> {
        self.inner.state.lock().peer().map(str::to_string)
    }

    /// Negotiated kind of the current call
    pub fn kind(&self) -> CallKind {
        self.inner.state.lock().kind()
    }

    pub fn phase(&self) -> CallPhase {
        self.inner.state.lock().phase()
    }

    /// Presentation of the current call, which may differ from [`kind`](Self::kind)
    pub fn presentation(&self) -> MediaPresentation {
        self.inner.state.lock().presentation()
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.state.lock().is_logged_in()
    }

    /// Number of engine handlers currently registered by this session
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.lock().len()
    }

    /// Receive every status this session emits from now on
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.inner.emitter.subscribe()
    }

    /// Log in to the engine and register the event handlers
    ///
    /// A refused login is reported as [`CallStatus::LoginFailed`] and
    /// returned; the session stays constructed and a later `login()` may
    /// succeed. Logging in again after success is a no-op.
    pub async fn login(&self) -> CallResult<()> {
        let local_user_id = {
            let state = self.inner.state.lock();
            if state.is_closed() {
                return Err(CallError::invalid_state("session has been logged out"));
            }
            if state.is_logged_in() {
                return Ok(());
            }
            state.local_user_id().to_string()
        };

        match self
            .inner
            .engine
            .login(&local_user_id, &self.inner.signed_token)
            .await
        {
            Ok(()) => {
                let closed = {
                    let mut state = self.inner.state.lock();
                    if !state.is_closed() {
                        state.set_logged_in(true);
                    }
                    state.is_closed()
                };
                if closed {
                    // logout() ran while the engine was logging in
                    warn!(session_id = %self.id(), user_id = %local_user_id, "session closed during login, logging out");
                    if let Err(e) = self.inner.engine.logout().await {
                        warn!(session_id = %self.id(), error = %e, "logout request failed");
                    }
                    return Err(CallError::invalid_state("session was logged out during login"));
                }
                info!(session_id = %self.id(), user_id = %local_user_id, "logged in");
                self.register_subscriptions();
                Ok(())
            }
            Err(e) => {
                error!(session_id = %self.id(), user_id = %local_user_id, error = %e, "login failed");
                let message = match &e {
                    CallError::Login { reason } => reason.clone(),
                    other => other.to_string(),
                };
                self.emit(CallStatus::LoginFailed, Some(message.as_str()));
                Err(match e {
                    CallError::Login { .. } => e,
                    other => CallError::login(other.to_string()),
                })
            }
        }
    }

    /// Retry [`login`](Self::login) with backoff; runs only when called
    pub async fn login_with_retry(&self, config: &RetryConfig) -> CallResult<()> {
        retry_with_backoff("login", config, || self.login()).await
    }

    /// Place a call to `peer_id`
    ///
    /// [`CallStatus::Calling`] is reported before the engine round-trip. A
    /// failed or unacknowledged engine request is only logged; the outcome
    /// arrives later as an engine event such as `CallingTimeout`.
    ///
    /// # Errors
    ///
    /// * `NotLoggedIn` - no successful login yet
    /// * `InvalidState` - the session was logged out, or another call is
    ///   active and `reject_concurrent_calls` is set
    /// * `Configuration` - `kind` is [`CallKind::Unknown`]
    pub async fn call(&self, peer_id: impl Into<String>, kind: CallKind) -> CallResult<()> {
        let peer_id = peer_id.into();
        if kind == CallKind::Unknown {
            return Err(CallError::config("call kind must be audio or video"));
        }

        {
            let mut state = self.inner.state.lock();
            if state.is_closed() {
                return Err(CallError::invalid_state("session has been logged out"));
            }
            if !state.is_logged_in() {
                return Err(CallError::NotLoggedIn);
            }
            if self.inner.config.reject_concurrent_calls && state.phase().is_active() {
                return Err(CallError::invalid_state(format!(
                    "a call to {} is already in progress",
                    state.peer().unwrap_or("unknown peer")
                )));
            }
            state.begin_call(&peer_id, kind);
        }

        self.emit(CallStatus::Calling, Some(CallStatus::Calling.default_message()));

        if self.inner.config.auto_push {
            self.push_notify(&peer_id, PushAction::Initiate);
        }

        let timeout_secs = self.inner.config.call_timeout_secs;
        let request = CallRequest {
            peer_id: peer_id.clone(),
            kind,
            timeout_secs,
        };
        let call = self.inner.engine.call(request);
        match tokio::time::timeout(Duration::from_secs(timeout_secs), call).await {
            Ok(Ok(())) => {
                info!(session_id = %self.id(), peer_id = %peer_id, kind = %kind, "call request accepted");
                if kind.is_video() && self.inner.config.start_local_view {
                    self.start_local_view().await;
                }
            }
            Ok(Err(e)) => {
                warn!(session_id = %self.id(), peer_id = %peer_id, error = %e, "call request failed");
            }
            Err(_) => {
                let e = CallError::CallTimeout { seconds: timeout_secs };
                warn!(session_id = %self.id(), peer_id = %peer_id, error = %e, "call request not acknowledged");
            }
        }
        Ok(())
    }

    /// Ask the engine to hang up or cancel the current call
    ///
    /// The resulting status arrives later through the event table.
    pub async fn hangup(&self) -> CallResult<()> {
        let (phase, peer) = {
            let state = self.inner.state.lock();
            (state.phase(), state.peer().map(str::to_string))
        };
        if !phase.is_active() {
            return Err(CallError::invalid_state(format!(
                "no active call to hang up ({:?})",
                phase
            )));
        }

        if let Err(e) = self.inner.engine.hangup().await {
            warn!(session_id = %self.id(), error = %e, "hangup request failed");
        }

        if self.inner.config.auto_push && phase == CallPhase::Calling {
            if let Some(peer_id) = peer {
                self.push_notify(&peer_id, PushAction::Cancel);
            }
        }
        Ok(())
    }

    /// Alert `peer_id` out of band; failures are only logged
    ///
    /// The notification runs on the current Tokio runtime. Outside a runtime
    /// it is dropped with a warning.
    pub fn push_notify(&self, peer_id: &str, action: PushAction) {
        let Some(notifier) = self.inner.push.read().clone() else {
            debug!(session_id = %self.id(), peer_id, "no push notifier configured");
            return;
        };
        let Ok(runtime) = Handle::try_current() else {
            warn!(session_id = %self.id(), peer_id, action = action.code(), "no tokio runtime, push notification dropped");
            return;
        };
        let session_id = self.id();
        let peer_id = peer_id.to_string();
        runtime.spawn(async move {
            if let Err(e) = notifier.notify(&peer_id, action).await {
                warn!(%session_id, peer_id = %peer_id, action = action.code(), error = %e, "push notification failed");
            }
        });
    }

    /// Render the local camera into the configured local view
    pub async fn start_local_view(&self) {
        let binding = ViewBinding::new(self.local_user_id(), self.inner.config.local_view.clone());
        if let Err(e) = self.inner.engine.start_local_view(binding).await {
            warn!(session_id = %self.id(), error = %e, "failed to start local view");
        }
    }

    /// Route one engine event
    ///
    /// This is what the dispatcher task runs for every delivered event.
    pub async fn handle_event(&self, event: EngineEvent) {
        let projection = {
            let state = self.inner.state.lock();
            dispatch::project(&event, state.kind(), state.peer())
        };
        debug!(session_id = %self.id(), event = %event.kind(), status = ?projection.status, "engine event");

        if let EngineEvent::AudioAvailabilityChanged { user_id, available } = &event {
            info!(session_id = %self.id(), user_id = %user_id, available, "remote audio availability changed");
        }

        if let Some(effect) = projection.effect {
            self.apply_view_effect(effect).await;
        }
        if let Some(status) = projection.status {
            self.emit(status, projection.message.as_deref());
        }
    }

    /// Remove every handler, stop dispatching, and log out of the engine
    ///
    /// Calling it again is a no-op.
    pub async fn logout(&self) {
        let was_logged_in = {
            let mut state = self.inner.state.lock();
            if state.is_closed() {
                return;
            }
            let was_logged_in = state.is_logged_in();
            state.close();
            was_logged_in
        };

        let removed = self.inner.remove_subscriptions();
        if let Some(handle) = self.inner.dispatcher.lock().take() {
            handle.abort();
        }

        if was_logged_in {
            if let Err(e) = self.inner.engine.logout().await {
                warn!(session_id = %self.id(), error = %e, "logout request failed");
            }
        }
        info!(session_id = %self.id(), removed, "session closed");
    }

    fn register_subscriptions(&self) {
        let mut subscriptions = self.inner.subscriptions.lock();
        if !subscriptions.can_register() {
            return;
        }
        let Some(event_rx) = self.inner.event_rx.lock().take() else {
            return;
        };

        let entries = EngineEventKind::ALL
            .iter()
            .map(|&kind| {
                let tx = self.inner.event_tx.clone();
                let handler: EventHandler = Arc::new(move |event: EngineEvent| {
                    let _ = tx.send(event);
                });
                (kind, self.inner.engine.on(kind, handler))
            })
            .collect::<Vec<_>>();
        debug!(session_id = %self.id(), count = entries.len(), "event handlers registered");
        subscriptions.install(entries);
        drop(subscriptions);

        let handle = tokio::spawn(dispatch_events(Arc::downgrade(&self.inner), event_rx));
        *self.inner.dispatcher.lock() = Some(handle);
    }

    async fn apply_view_effect(&self, effect: ViewEffect) {
        let target = self.inner.config.remote_view.clone();
        match effect {
            ViewEffect::StartRemoteView { peer_id } => {
                let binding = ViewBinding::new(peer_id.clone(), target);
                match self.inner.engine.start_remote_view(binding).await {
                    Ok(()) => debug!(session_id = %self.id(), peer_id = %peer_id, "remote view started"),
                    Err(e) => warn!(session_id = %self.id(), peer_id = %peer_id, error = %e, "failed to start remote view"),
                }
            }
            ViewEffect::StopRemoteView { peer_id } => {
                let binding = ViewBinding::new(peer_id.clone(), target);
                match self.inner.engine.stop_remote_view(binding).await {
                    Ok(()) => debug!(session_id = %self.id(), peer_id = %peer_id, "remote view stopped"),
                    Err(e) => warn!(session_id = %self.id(), peer_id = %peer_id, error = %e, "failed to stop remote view"),
                }
            }
        }
    }

    fn emit(&self, status: CallStatus, message: Option<&str>) {
        // `Calling` comes from the caller's task, everything else from the
        // dispatcher; listener calls must not overlap.
        let _delivery = self.inner.delivery.lock();
        let peer_id = {
            let mut state = self.inner.state.lock();
            state.record(status);
            state.peer().map(str::to_string)
        };
        self.inner.listener.on_status(status, message);
        self.inner.emitter.emit(StatusEvent {
            session_id: self.inner.id,
            status,
            message: message.map(str::to_string),
            peer_id,
            timestamp: Utc::now(),
        });
    }
}

impl SessionInner {
    fn remove_subscriptions(&self) -> usize {
        let entries = self.subscriptions.lock().retire();
        for (kind, id) in &entries {
            if !self.engine.off(*kind, *id) {
                warn!(session_id = %self.id, event = %kind, "engine had no handler to remove");
            }
        }
        entries.len()
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        // Handlers must not outlive the session even without logout()
        self.remove_subscriptions();
        if let Some(handle) = self.dispatcher.lock().take() {
            handle.abort();
        }
    }
}

async fn dispatch_events(session: Weak<SessionInner>, mut events: mpsc::UnboundedReceiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        let Some(inner) = session.upgrade() else {
            break;
        };
        CallSession { inner }.handle_event(event).await;
    }
}

impl fmt::Debug for CallSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("CallSession")
            .field("id", &self.inner.id)
            .field("local_user_id", &state.local_user_id())
            .field("peer", &state.peer())
            .field("kind", &state.kind())
            .field("phase", &state.phase())
            .field("logged_in", &state.is_logged_in())
            .finish()
    }
}
