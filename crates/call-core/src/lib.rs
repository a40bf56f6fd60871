//! # Call Core - One-to-One Call Session Controller
//!
//! Client-side controller for audio/video calls placed through a managed
//! real-time communication engine. The engine owns transport and media; this
//! crate owns the call session on top of it:
//!
//! - **Identity and kind** of the current call
//! - **Lifecycle**: `Idle → Calling → Connected → Ended`
//! - **Event routing**: every engine event maps to one application status and
//!   at most one view binding change (see [`dispatch`])
//! - **Subscriptions**: registered once at login, removed once at logout
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use callkit_call_core::{
//!     CallKind, CallSessionFactory, CallStatus, Credentials, StaticCredentialProvider,
//!     engine::EngineConnector,
//! };
//! use std::sync::Arc;
//!
//! async fn run(connector: Arc<dyn EngineConnector>) -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = Arc::new(StaticCredentialProvider::new(
//!         Credentials::new("1400000001", "signed-token"),
//!     ));
//!     let factory = CallSessionFactory::new(credentials, connector);
//!
//!     let session = factory
//!         .create("alice", Arc::new(|status: CallStatus, message: Option<&str>| {
//!             println!("{}: {}", status, message.unwrap_or_default());
//!         }))
//!         .await?;
//!
//!     session.call("bob", CallKind::Video).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Collaborators
//!
//! The engine, the credential source and the push backend are traits
//! ([`CallEngine`], [`CredentialProvider`], [`PushNotifier`]); applications
//! plug in adapters for their platform.

pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod factory;
pub mod push;
pub mod recovery;
pub mod session;
pub mod state;
pub mod types;

pub use config::SessionConfig;
pub use credentials::{CredentialProvider, Credentials, StaticCredentialProvider};
pub use engine::{CallEngine, EngineConnector, EngineEvent, EngineEventKind};
pub use error::{CallError, CallResult};
pub use events::{ChannelStatusListener, StatusEmitter, StatusEvent, StatusListener};
pub use factory::CallSessionFactory;
pub use push::{LoggingPushNotifier, PushNotifier};
pub use session::CallSession;
pub use state::{CallPhase, MediaPresentation};
pub use types::{CallIdentity, CallKind, CallStatus, PushAction, SessionId, ViewTarget};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
