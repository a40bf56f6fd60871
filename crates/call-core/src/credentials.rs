//! Short-lived engine credentials
//!
//! A [`CredentialProvider`] supplies the application identifier the engine is
//! bound to and a signed, time-limited token for the local user. Fetching is
//! a pure data fetch; providers hold no session state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_CALL_TIMEOUT_SECS;
use crate::error::{CallError, CallResult};

fn default_call_timeout_secs() -> u64 {
    DEFAULT_CALL_TIMEOUT_SECS
}

/// Credentials needed to bind and log in to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Application identifier the engine instance is bound to
    pub application_id: String,
    /// Signed identity token for the local user
    pub signed_token: String,
    /// Pickup timeout requested by the backend
    #[serde(default = "default_call_timeout_secs", rename = "callTimeoutSeconds")]
    pub call_timeout_secs: u64,
}

impl Credentials {
    /// Create credentials with the default pickup timeout
    pub fn new(application_id: impl Into<String>, signed_token: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            signed_token: signed_token.into(),
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
        }
    }

    /// Override the pickup timeout
    pub fn with_call_timeout_secs(mut self, secs: u64) -> Self {
        self.call_timeout_secs = secs;
        self
    }

    /// Parse credentials from a backend JSON payload
    pub fn from_json(json: &str) -> CallResult<Self> {
        let credentials: Credentials = serde_json::from_str(json)
            .map_err(|e| CallError::credential(format!("malformed credential payload: {}", e)))?;
        credentials.validate()?;
        Ok(credentials)
    }

    /// Reject empty identifiers and tokens
    pub fn validate(&self) -> CallResult<()> {
        if self.application_id.trim().is_empty() {
            return Err(CallError::credential("application id is empty"));
        }
        if self.signed_token.trim().is_empty() {
            return Err(CallError::credential("signed token is empty"));
        }
        Ok(())
    }
}

/// Source of engine credentials for the current user
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Fetch a fresh credential set
    async fn fetch(&self) -> CallResult<Credentials>;
}

/// Provider returning a fixed credential set
///
/// Useful when the token is minted elsewhere and handed to the process at
/// startup.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    credentials: Credentials,
}

impl StaticCredentialProvider {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn fetch(&self) -> CallResult<Credentials> {
        Ok(self.credentials.clone())
    }
}
