//! Shared fakes for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

use callkit_call_core::engine::{
    CallEngine, CallRequest, EngineConnector, EngineEvent, EngineEventKind, EventHandler,
    EventRegistry, SubscriptionId, ViewBinding,
};
use callkit_call_core::{
    CallError, CallResult, CallSession, CallSessionFactory, CallStatus, Credentials, PushAction,
    PushNotifier, SessionConfig, StaticCredentialProvider, StatusListener,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Engine request observed by [`FakeEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Login { user_id: String, token: String },
    Logout,
    Call(CallRequest),
    Hangup,
    StartLocalView(ViewBinding),
    StartRemoteView(ViewBinding),
    StopRemoteView(ViewBinding),
    On(EngineEventKind, SubscriptionId),
    Off(EngineEventKind, SubscriptionId),
}

/// In-memory engine recording every request into a shared journal
pub struct FakeEngine {
    pub application_id: String,
    registry: EventRegistry,
    calls: Mutex<Vec<EngineCall>>,
    journal: Journal,
    failing_logins: AtomicUsize,
    fail_call: AtomicBool,
    stall_call: AtomicBool,
    fail_views: AtomicBool,
    login_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeEngine {
    pub fn new(application_id: &str, journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            application_id: application_id.to_string(),
            registry: EventRegistry::new(),
            calls: Mutex::new(Vec::new()),
            journal,
            failing_logins: AtomicUsize::new(0),
            fail_call: AtomicBool::new(false),
            stall_call: AtomicBool::new(false),
            fail_views: AtomicBool::new(false),
            login_gate: Mutex::new(None),
        })
    }

    /// Refuse the next `count` logins
    pub fn fail_logins(&self, count: usize) {
        self.failing_logins.store(count, Ordering::SeqCst);
    }

    pub fn fail_calls(&self) {
        self.fail_call.store(true, Ordering::SeqCst);
    }

    /// Never complete call requests
    pub fn stall_calls(&self) {
        self.stall_call.store(true, Ordering::SeqCst);
    }

    /// Refuse every view binding request
    pub fn fail_views(&self) {
        self.fail_views.store(true, Ordering::SeqCst);
    }

    /// Hold logins until the returned gate is notified
    pub fn gate_logins(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.login_gate.lock() = Some(gate.clone());
        gate
    }

    /// Deliver an event to every registered handler
    pub fn emit(&self, event: EngineEvent) -> usize {
        self.registry.emit(&event)
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn handler_count(&self) -> usize {
        self.registry.total_handlers()
    }

    pub fn view_calls(&self) -> Vec<EngineCall> {
        self.calls()
            .into_iter()
            .filter(|call| {
                matches!(
                    call,
                    EngineCall::StartLocalView(_)
                        | EngineCall::StartRemoteView(_)
                        | EngineCall::StopRemoteView(_)
                )
            })
            .collect()
    }

    fn record(&self, call: EngineCall) {
        self.journal.push(format!("engine:{}", call_name(&call)));
        self.calls.lock().push(call);
    }
}

fn call_name(call: &EngineCall) -> &'static str {
    match call {
        EngineCall::Login { .. } => "login",
        EngineCall::Logout => "logout",
        EngineCall::Call(_) => "call",
        EngineCall::Hangup => "hangup",
        EngineCall::StartLocalView(_) => "start_local_view",
        EngineCall::StartRemoteView(_) => "start_remote_view",
        EngineCall::StopRemoteView(_) => "stop_remote_view",
        EngineCall::On(..) => "on",
        EngineCall::Off(..) => "off",
    }
}

impl FakeEngine {
    fn view_result(&self, operation: &str) -> CallResult<()> {
        if self.fail_views.load(Ordering::SeqCst) {
            return Err(CallError::engine(operation, "view target not found"));
        }
        Ok(())
    }
}

#[async_trait]
impl CallEngine for FakeEngine {
    async fn login(&self, user_id: &str, token: &str) -> CallResult<()> {
        self.record(EngineCall::Login {
            user_id: user_id.to_string(),
            token: token.to_string(),
        });
        let gate = self.login_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let remaining = self.failing_logins.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_logins.store(remaining - 1, Ordering::SeqCst);
            return Err(CallError::login("signature rejected"));
        }
        Ok(())
    }

    async fn logout(&self) -> CallResult<()> {
        self.record(EngineCall::Logout);
        Ok(())
    }

    async fn call(&self, request: CallRequest) -> CallResult<()> {
        self.record(EngineCall::Call(request));
        if self.stall_call.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_call.load(Ordering::SeqCst) {
            return Err(CallError::engine("call", "peer offline"));
        }
        Ok(())
    }

    async fn hangup(&self) -> CallResult<()> {
        self.record(EngineCall::Hangup);
        Ok(())
    }

    async fn start_local_view(&self, binding: ViewBinding) -> CallResult<()> {
        self.record(EngineCall::StartLocalView(binding));
        self.view_result("start_local_view")
    }

    async fn start_remote_view(&self, binding: ViewBinding) -> CallResult<()> {
        self.record(EngineCall::StartRemoteView(binding));
        self.view_result("start_remote_view")
    }

    async fn stop_remote_view(&self, binding: ViewBinding) -> CallResult<()> {
        self.record(EngineCall::StopRemoteView(binding));
        self.view_result("stop_remote_view")
    }

    fn on(&self, kind: EngineEventKind, handler: EventHandler) -> SubscriptionId {
        let id = self.registry.on(kind, handler);
        self.record(EngineCall::On(kind, id));
        id
    }

    fn off(&self, kind: EngineEventKind, id: SubscriptionId) -> bool {
        self.record(EngineCall::Off(kind, id));
        self.registry.off(kind, id)
    }
}

/// Ordered log shared by the engine and the listener
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: String) {
        self.0.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// Connector handing out [`FakeEngine`]s and counting them
pub struct FakeConnector {
    pub journal: Journal,
    pub engines: Mutex<Vec<Arc<FakeEngine>>>,
    failing_logins: usize,
}

impl FakeConnector {
    pub fn new(journal: Journal) -> Arc<Self> {
        Self::with_failing_logins(journal, 0)
    }

    pub fn with_failing_logins(journal: Journal, failing_logins: usize) -> Arc<Self> {
        Arc::new(Self {
            journal,
            engines: Mutex::new(Vec::new()),
            failing_logins,
        })
    }

    pub fn engine_count(&self) -> usize {
        self.engines.lock().len()
    }

    pub fn last_engine(&self) -> Arc<FakeEngine> {
        self.engines.lock().last().cloned().expect("no engine was created")
    }
}

impl EngineConnector for FakeConnector {
    fn connect(&self, application_id: &str) -> CallResult<Arc<dyn CallEngine>> {
        let engine = FakeEngine::new(application_id, self.journal.clone());
        engine.fail_logins(self.failing_logins);
        self.engines.lock().push(engine.clone());
        Ok(engine)
    }
}

/// Listener recording statuses and exposing them as a channel
pub struct RecordingListener {
    journal: Journal,
    sender: mpsc::UnboundedSender<(CallStatus, Option<String>)>,
}

impl RecordingListener {
    pub fn new(journal: Journal) -> (Arc<Self>, StatusStream) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Arc::new(Self { journal, sender }), StatusStream(receiver))
    }
}

impl StatusListener for RecordingListener {
    fn on_status(&self, status: CallStatus, message: Option<&str>) {
        self.journal.push(format!("status:{}", status));
        let _ = self.sender.send((status, message.map(str::to_string)));
    }
}

pub struct StatusStream(mpsc::UnboundedReceiver<(CallStatus, Option<String>)>);

impl StatusStream {
    /// Next status, failing the test if none arrives within a second
    pub async fn next(&mut self) -> CallStatus {
        tokio::time::timeout(Duration::from_secs(1), self.0.recv())
            .await
            .expect("timed out waiting for a status")
            .expect("status channel closed")
            .0
    }

    /// Next status with its message
    pub async fn next_with_message(&mut self) -> (CallStatus, Option<String>) {
        tokio::time::timeout(Duration::from_secs(1), self.0.recv())
            .await
            .expect("timed out waiting for a status")
            .expect("status channel closed")
    }

    /// Assert nothing was emitted so far
    pub fn assert_idle(&mut self) {
        match self.0.try_recv() {
            Err(mpsc::error::TryRecvError::Empty) => {}
            other => panic!("expected no status, got {:?}", other),
        }
    }
}

/// Push backend recording every notification
pub struct RecordingPushNotifier {
    sender: mpsc::UnboundedSender<(String, PushAction)>,
    fail: bool,
}

impl RecordingPushNotifier {
    pub fn new(fail: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<(String, PushAction)>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Arc::new(Self { sender, fail }), receiver)
    }
}

#[async_trait]
impl PushNotifier for RecordingPushNotifier {
    async fn notify(&self, peer_id: &str, action: PushAction) -> CallResult<()> {
        let _ = self.sender.send((peer_id.to_string(), action));
        if self.fail {
            return Err(CallError::push_notify(peer_id, "backend unavailable"));
        }
        Ok(())
    }
}

/// Everything a session test needs
pub struct Harness {
    pub session: CallSession,
    pub engine: Arc<FakeEngine>,
    pub connector: Arc<FakeConnector>,
    pub statuses: StatusStream,
    pub journal: Journal,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(SessionConfig::default()).await
    }

    pub async fn with_config(config: SessionConfig) -> Self {
        init_tracing();
        let journal = Journal::default();
        let connector = FakeConnector::new(journal.clone());
        let (listener, statuses) = RecordingListener::new(journal.clone());
        let provider = Arc::new(StaticCredentialProvider::new(
            Credentials::new("1400000001", "signed-token")
                .with_call_timeout_secs(config.call_timeout_secs),
        ));

        let session = CallSessionFactory::new(provider, connector.clone())
            .with_config(config)
            .create("alice", listener)
            .await
            .expect("session creation failed");
        let engine = connector.last_engine();

        Self {
            session,
            engine,
            connector,
            statuses,
            journal,
        }
    }

    /// Place a call and consume the optimistic `Calling` status
    pub async fn dial(&mut self, peer_id: &str, kind: callkit_call_core::CallKind) {
        self.session.call(peer_id, kind).await.expect("call failed");
        assert_eq!(self.statuses.next().await, CallStatus::Calling);
    }
}
