//! Platform operations on active sessions.

use crate::session_manager::PlatformSessionManager;
use formdesk_core::error::Result;
use formdesk_core::platform::{Dialog, Participant};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_DIALOG_LIMIT: usize = 100;
pub const DEFAULT_PARTICIPANT_LIMIT: usize = 1000;

/// Tally of a bulk invitation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteSummary {
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl InviteSummary {
    pub fn record(&mut self, user_id: i64, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.success += 1,
            Err(e) => {
                self.failed += 1;
                self.errors
                    .push(format!("Failed to invite user {}: {}", user_id, e));
            }
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.failed
    }
}

/// Every call names its session; unknown or pending sessions fail with
/// `NotFound`.
#[derive(Clone)]
pub struct ClientOperations {
    sessions: Arc<PlatformSessionManager>,
}

impl ClientOperations {
    pub fn new(sessions: Arc<PlatformSessionManager>) -> Self {
        Self { sessions }
    }

    pub async fn dialogs(&self, session: &str, limit: usize) -> Result<Vec<Dialog>> {
        let client = self.sessions.get(session).await?;
        client.dialogs(limit).await.inspect_err(|e| {
            tracing::error!("[ClientOperations] Failed to get dialogs: {}", e)
        })
    }

    pub async fn send_message(&self, session: &str, peer: i64, text: &str) -> Result<()> {
        let client = self.sessions.get(session).await?;
        client.send_message(peer, text).await.inspect_err(|e| {
            tracing::error!("[ClientOperations] Failed to send message to {}: {}", peer, e)
        })?;
        tracing::info!("[ClientOperations] Message sent to {}", peer);
        Ok(())
    }

    pub async fn participants(
        &self,
        session: &str,
        chat_id: i64,
        limit: usize,
    ) -> Result<Vec<Participant>> {
        let client = self.sessions.get(session).await?;
        client.participants(chat_id, limit).await.inspect_err(|e| {
            tracing::error!("[ClientOperations] Failed to get participants of {}: {}", chat_id, e)
        })
    }

    pub async fn invite_user(&self, session: &str, channel_id: i64, user_id: i64) -> Result<()> {
        let client = self.sessions.get(session).await?;
        client
            .invite_to_channel(channel_id, user_id)
            .await
            .inspect_err(|e| {
                tracing::error!("[ClientOperations] Failed to invite {}: {}", user_id, e)
            })?;
        tracing::info!("[ClientOperations] User {} invited to {}", user_id, channel_id);
        Ok(())
    }

    /// Invites `user_ids` one at a time, pausing `delay` between invites.
    ///
    /// Individual failures are counted in the summary; only an unknown
    /// session fails the whole call.
    pub async fn invite_users(
        &self,
        session: &str,
        channel_id: i64,
        user_ids: &[i64],
        delay: Duration,
    ) -> Result<InviteSummary> {
        self.sessions.get(session).await?;

        let mut summary = InviteSummary::default();
        for (index, &user_id) in user_ids.iter().enumerate() {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let outcome = self.invite_user(session, channel_id, user_id).await;
            summary.record(user_id, outcome);
        }
        tracing::info!(
            "[ClientOperations] Bulk invite to {}: {} ok, {} failed",
            channel_id,
            summary.success,
            summary.failed
        );
        Ok(summary)
    }

    /// Looks up the account registered for `phone`.
    ///
    /// Lookup failures on the platform side read as "no account".
    pub async fn check_phone(&self, session: &str, phone: &str) -> Result<Option<Participant>> {
        let client = self.sessions.get(session).await?;
        match client.resolve(phone).await {
            Ok(found) => Ok(found),
            Err(e) => {
                tracing::debug!("[ClientOperations] Phone {} not found or error: {}", phone, e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeBehavior, FakeConnector, credentials};

    async fn operations(behavior: FakeBehavior) -> (ClientOperations, Arc<FakeConnector>) {
        let connector = Arc::new(FakeConnector::new(FakeBehavior {
            authorized: true,
            ..behavior
        }));
        let sessions = Arc::new(PlatformSessionManager::new(connector.clone()));
        sessions.create_session("main", &credentials()).await.unwrap();
        (ClientOperations::new(sessions), connector)
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let (ops, _) = operations(FakeBehavior::default()).await;

        assert!(ops.dialogs("nope", 10).await.unwrap_err().is_not_found());
        assert!(ops.send_message("nope", 1, "hi").await.unwrap_err().is_not_found());
        assert!(
            ops.invite_users("nope", 1, &[1, 2], Duration::ZERO)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_invite_users_tallies_failures() {
        let (ops, connector) = operations(FakeBehavior {
            failing_invites: vec![2],
            ..FakeBehavior::default()
        })
        .await;

        let summary = ops
            .invite_users("main", -100, &[1, 2, 3], Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(summary.success, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 3);
        assert!(summary.errors[0].starts_with("Failed to invite user 2:"));
        assert_eq!(connector.client("main").invited(), vec![(-100, 1), (-100, 3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invite_users_pauses_between_invites() {
        let (ops, _) = operations(FakeBehavior::default()).await;
        let started = tokio::time::Instant::now();

        ops.invite_users("main", 1, &[1, 2, 3], Duration::from_secs(2))
            .await
            .unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(4));
        assert!(elapsed < Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_check_phone() {
        let (ops, _) = operations(FakeBehavior::default()).await;

        let found = ops.check_phone("main", "+79001112233").await.unwrap();
        assert_eq!(found.unwrap().id, 77);
        assert!(ops.check_phone("main", "+71111111111").await.unwrap().is_none());
        assert!(ops.check_phone("main", "+70000000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_participants_and_dialogs() {
        let (ops, connector) = operations(FakeBehavior::default()).await;

        assert_eq!(ops.participants("main", 1, 3).await.unwrap().len(), 3);
        assert_eq!(ops.dialogs("main", DEFAULT_DIALOG_LIMIT).await.unwrap().len(), 3);
        ops.send_message("main", 9, "hello").await.unwrap();
        assert_eq!(connector.client("main").sent(), vec![(9, "hello".to_string())]);
    }
}
