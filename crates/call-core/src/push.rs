//! Out-of-band push notifications
//!
//! When the callee is offline or backgrounded the engine alone cannot ring
//! them. A [`PushNotifier`] asks a backend to alert the recipient. Sessions
//! call it fire-and-forget: failures are logged, never surfaced as a status.

use async_trait::async_trait;
use tracing::info;

use crate::error::CallResult;
use crate::types::PushAction;

/// Backend hook that alerts a recipient outside the engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushNotifier: Send + Sync {
    /// Notify `peer_id` that a call is being placed or was cancelled
    async fn notify(&self, peer_id: &str, action: PushAction) -> CallResult<()>;
}

/// Notifier that only records the request in the log
///
/// Stands in when no push backend is configured.
#[derive(Debug, Clone, Default)]
pub struct LoggingPushNotifier;

#[async_trait]
impl PushNotifier for LoggingPushNotifier {
    async fn notify(&self, peer_id: &str, action: PushAction) -> CallResult<()> {
        info!(peer_id, action = action.code(), "push notification requested");
        Ok(())
    }
}
