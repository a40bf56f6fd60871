//! Session construction
//!
//! [`CallSessionFactory`] performs the setup sequence for a new session:
//!
//! 1. fetch credentials from the [`CredentialProvider`]
//! 2. build an engine bound to the application id via the [`EngineConnector`]
//! 3. log in, which registers every event handler before returning
//!
//! A credential failure stops the sequence before any engine exists. A
//! refused login still yields a session: the listener receives
//! [`CallStatus::LoginFailed`](crate::types::CallStatus::LoginFailed) and the
//! caller decides whether to retry with
//! [`CallSession::login`](crate::session::CallSession::login).

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::credentials::CredentialProvider;
use crate::engine::EngineConnector;
use crate::error::{CallError, CallResult};
use crate::events::StatusListener;
use crate::push::PushNotifier;
use crate::session::CallSession;

/// Builds ready-to-use [`CallSession`]s
#[derive(Clone)]
pub struct CallSessionFactory {
    credentials: Arc<dyn CredentialProvider>,
    connector: Arc<dyn EngineConnector>,
    push: Option<Arc<dyn PushNotifier>>,
    config: SessionConfig,
}

impl CallSessionFactory {
    pub fn new(credentials: Arc<dyn CredentialProvider>, connector: Arc<dyn EngineConnector>) -> Self {
        Self {
            credentials,
            connector,
            push: None,
            config: SessionConfig::default(),
        }
    }

    /// Use `config` for every session this factory creates
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a push backend to every session this factory creates
    pub fn with_push_notifier(mut self, notifier: Arc<dyn PushNotifier>) -> Self {
        self.push = Some(notifier);
        self
    }

    /// Create and log in a session for `local_user_id`
    ///
    /// # Errors
    ///
    /// * `Credential` - the provider failed or returned malformed data; no
    ///   engine was created
    /// * `Configuration` - the user id or session config is unusable
    /// * whatever the connector returns when it cannot build an engine
    pub async fn create(
        &self,
        local_user_id: impl Into<String>,
        listener: Arc<dyn StatusListener>,
    ) -> CallResult<CallSession> {
        let local_user_id = local_user_id.into();
        if local_user_id.trim().is_empty() {
            return Err(CallError::config("local user id must not be empty"));
        }
        self.config.validate()?;

        let credentials = self.credentials.fetch().await.map_err(|e| match e {
            CallError::Credential { .. } => e,
            other => CallError::credential(other.to_string()),
        })?;
        credentials.validate()?;
        debug!(user_id = %local_user_id, application_id = %credentials.application_id, "credentials fetched");

        let mut config = self.config.clone();
        if credentials.call_timeout_secs > 0 {
            config.call_timeout_secs = credentials.call_timeout_secs;
        }

        let engine = self.connector.connect(&credentials.application_id)?;
        let session = CallSession::new(
            local_user_id,
            engine,
            credentials.signed_token,
            config,
            listener,
        );
        if let Some(notifier) = &self.push {
            session.set_push_notifier(notifier.clone());
        }

        match session.login().await {
            Ok(()) => info!(session_id = %session.id(), "session ready"),
            Err(e) => warn!(session_id = %session.id(), error = %e, "session created without login"),
        }
        Ok(session)
    }
}
