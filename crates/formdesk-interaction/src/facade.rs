//! Headless, synchronous API of the automation client.
//!
//! All network work runs on one [`AsyncBridge`] loop; long-running bulk
//! invitations run on the [`TaskRegistry`] worker pool and call back into the
//! loop for every invite. Callers never need a runtime of their own.
//!
//! # Usage
//!
//! ```ignore
//! let facade = ClientFacade::new(&config.client, connector, profiles)?;
//! facade.create_session("main", &credentials)?;
//! facade.spawn_bulk_invite("invite-1", "main", channel_id, user_ids);
//! facade.shutdown();
//! ```

use crate::auto_responder::AutoResponder;
use crate::operations::{ClientOperations, InviteSummary};
use crate::profiles::ProfileManager;
use crate::session_manager::{PlatformSessionManager, SessionState};
use formdesk_core::config::ClientConfig;
use formdesk_core::error::Result;
use formdesk_core::platform::{Credentials, Dialog, Participant, PlatformConnector};
use formdesk_core::profile::{Profile, ProfileRepository};
use formdesk_core::task::{TaskInfo, TaskStatus};
use formdesk_execution::{AsyncBridge, TaskRegistry};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const BRIDGE_NAME: &str = "formdesk-client";

type Reports = Arc<Mutex<HashMap<String, InviteSummary>>>;

pub struct ClientFacade {
    bridge: Arc<AsyncBridge>,
    tasks: TaskRegistry,
    sessions: Arc<PlatformSessionManager>,
    operations: ClientOperations,
    responder: Arc<AutoResponder>,
    profiles: ProfileManager,
    reports: Reports,
    blocking_timeout: Duration,
    invite_delay: Duration,
    closed: AtomicBool,
}

impl ClientFacade {
    /// Starts the client loop and the worker pool.
    pub fn new(
        config: &ClientConfig,
        connector: Arc<dyn PlatformConnector>,
        profile_repository: Arc<dyn ProfileRepository>,
    ) -> Result<Self> {
        let bridge = AsyncBridge::with_shutdown_timeout(
            BRIDGE_NAME,
            Duration::from_secs(config.shutdown_timeout_secs),
        );
        bridge.start()?;

        let sessions = Arc::new(PlatformSessionManager::new(connector));
        tracing::info!(
            "[ClientFacade] Initialized with {} workers",
            config.worker_threads
        );
        Ok(Self {
            bridge: Arc::new(bridge),
            tasks: TaskRegistry::new(config.worker_threads),
            operations: ClientOperations::new(Arc::clone(&sessions)),
            sessions,
            responder: Arc::new(AutoResponder::new()),
            profiles: ProfileManager::new(profile_repository),
            reports: Arc::new(Mutex::new(HashMap::new())),
            blocking_timeout: Duration::from_secs(config.blocking_timeout_secs),
            invite_delay: Duration::from_secs(config.invite_delay_secs),
            closed: AtomicBool::new(false),
        })
    }

    /// Runs `future` on the client loop and blocks for at most `timeout`.
    pub fn run_blocking<F, T>(&self, future: F, timeout: Duration) -> Result<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.bridge.submit(future)?.wait_timeout(timeout)
    }

    fn call<F, T>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.run_blocking(future, self.blocking_timeout)?
    }

    // ============================================================================
    // Sessions
    // ============================================================================

    pub fn create_session(&self, name: &str, credentials: &Credentials) -> Result<SessionState> {
        let sessions = Arc::clone(&self.sessions);
        let (name, credentials) = (name.to_string(), credentials.clone());
        self.call(async move { sessions.create_session(&name, &credentials).await })
    }

    pub fn authorize(&self, name: &str, code: &str, password: Option<&str>) -> Result<()> {
        let sessions = Arc::clone(&self.sessions);
        let (name, code) = (name.to_string(), code.to_string());
        let password = password.map(str::to_string);
        self.call(async move { sessions.authorize(&name, &code, password.as_deref()).await })
    }

    pub fn list_sessions(&self) -> Result<Vec<String>> {
        let sessions = Arc::clone(&self.sessions);
        self.call(async move { Ok(sessions.list().await) })
    }

    // ============================================================================
    // Operations
    // ============================================================================

    pub fn dialogs(&self, session: &str, limit: usize) -> Result<Vec<Dialog>> {
        let operations = self.operations.clone();
        let session = session.to_string();
        self.call(async move { operations.dialogs(&session, limit).await })
    }

    pub fn send_message(&self, session: &str, peer: i64, text: &str) -> Result<()> {
        let operations = self.operations.clone();
        let (session, text) = (session.to_string(), text.to_string());
        self.call(async move { operations.send_message(&session, peer, &text).await })
    }

    pub fn participants(&self, session: &str, chat_id: i64, limit: usize) -> Result<Vec<Participant>> {
        let operations = self.operations.clone();
        let session = session.to_string();
        self.call(async move { operations.participants(&session, chat_id, limit).await })
    }

    pub fn check_phone(&self, session: &str, phone: &str) -> Result<Option<Participant>> {
        let operations = self.operations.clone();
        let (session, phone) = (session.to_string(), phone.to_string());
        self.call(async move { operations.check_phone(&session, &phone).await })
    }

    pub fn start_auto_responder(&self, session: &str, text: &str) -> Result<()> {
        let responder = Arc::clone(&self.responder);
        let sessions = Arc::clone(&self.sessions);
        let (session, text) = (session.to_string(), text.to_string());
        self.call(async move { responder.start(&sessions, &session, text).await })
    }

    pub fn stop_auto_responder(&self) -> bool {
        self.responder.stop()
    }

    // ============================================================================
    // Background invitations
    // ============================================================================

    /// Queues a bulk invitation as a background task.
    ///
    /// Each invite is marshalled onto the client loop; the worker sleeps for
    /// the configured delay between invites. The tally is available from
    /// [`invite_report`](Self::invite_report), also for a run that stopped
    /// early. Returns `false` if `task_id` is already tracked.
    pub fn spawn_bulk_invite(
        &self,
        task_id: &str,
        session: &str,
        channel_id: i64,
        user_ids: Vec<i64>,
    ) -> bool {
        let bridge = Arc::clone(&self.bridge);
        let operations = self.operations.clone();
        let reports = Arc::clone(&self.reports);
        let (id, session) = (task_id.to_string(), session.to_string());
        let (delay, timeout) = (self.invite_delay, self.blocking_timeout);

        self.tasks.add(task_id, move || {
            let mut summary = InviteSummary::default();
            let mut result = Ok(());

            for (index, user_id) in user_ids.into_iter().enumerate() {
                if index > 0 && !delay.is_zero() {
                    thread::sleep(delay);
                }
                let operations = operations.clone();
                let session = session.clone();
                let outcome = bridge
                    .submit(async move { operations.invite_user(&session, channel_id, user_id).await })
                    .and_then(|handle| handle.wait_timeout(timeout))
                    .and_then(|outcome| outcome);

                if let Err(e) = &outcome {
                    if e.is_not_found() || e.is_unavailable() {
                        tracing::error!("[ClientFacade] Bulk invite '{}' aborted: {}", id, e);
                        result = Err(e.clone());
                        break;
                    }
                }
                summary.record(user_id, outcome);
            }

            tracing::info!(
                "[ClientFacade] Bulk invite '{}': {} ok, {} failed",
                id,
                summary.success,
                summary.failed
            );
            reports
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(id, summary);
            result
        })
    }

    pub fn invite_report(&self, task_id: &str) -> Option<InviteSummary> {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(task_id)
            .cloned()
    }

    pub fn task_status(&self, task_id: &str) -> Option<TaskStatus> {
        self.tasks.status(task_id)
    }

    pub fn tasks(&self) -> Vec<TaskInfo> {
        self.tasks.list()
    }

    pub fn cancel_task(&self, task_id: &str) -> bool {
        self.tasks.cancel(task_id)
    }

    /// Forgets finished tasks and their reports.
    pub fn cleanup_tasks(&self) -> usize {
        let removed = self.tasks.cleanup();
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|id, _| self.tasks.status(id).is_some());
        removed
    }

    // ============================================================================
    // Profiles
    // ============================================================================

    pub fn create_profile(&self, name: &str, data: Map<String, Value>) -> Result<Profile> {
        let profiles = self.profiles.clone();
        let name = name.to_string();
        self.call(async move { profiles.create(&name, data).await })
    }

    pub fn update_profile(&self, name: &str, data: Map<String, Value>) -> Result<Profile> {
        let profiles = self.profiles.clone();
        let name = name.to_string();
        self.call(async move { profiles.update(&name, data).await })
    }

    pub fn delete_profile(&self, name: &str) -> Result<()> {
        let profiles = self.profiles.clone();
        let name = name.to_string();
        self.call(async move { profiles.delete(&name).await })
    }

    pub fn get_profile(&self, name: &str) -> Result<Option<Profile>> {
        let profiles = self.profiles.clone();
        let name = name.to_string();
        self.call(async move { profiles.get(&name).await })
    }

    pub fn list_profiles(&self) -> Result<Vec<String>> {
        let profiles = self.profiles.clone();
        self.call(async move { profiles.list().await })
    }

    /// Disconnects every session, drains the worker pool, then stops the
    /// loop. Safe to call more than once.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.responder.stop();
        let sessions = Arc::clone(&self.sessions);
        match self.run_blocking(async move { sessions.disconnect_all().await }, self.blocking_timeout) {
            Ok(count) => tracing::info!("[ClientFacade] Disconnected {} sessions", count),
            Err(e) => tracing::error!("[ClientFacade] Error during shutdown: {}", e),
        }
        self.tasks.shutdown();
        self.bridge.shutdown();
        tracing::info!("[ClientFacade] Shutdown completed");
    }
}

impl Drop for ClientFacade {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeBehavior, FakeConnector, credentials};
    use formdesk_infrastructure::JsonProfileRepository;
    use serde_json::json;
    use std::time::Instant;

    struct Fixture {
        facade: ClientFacade,
        connector: Arc<FakeConnector>,
        _dir: tempfile::TempDir,
    }

    fn fixture(behavior: FakeBehavior) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(FakeConnector::new(FakeBehavior {
            authorized: true,
            ..behavior
        }));
        let config = ClientConfig {
            worker_threads: 2,
            invite_delay_secs: 0,
            blocking_timeout_secs: 5,
            ..ClientConfig::default()
        };
        let profiles = Arc::new(JsonProfileRepository::new(dir.path().join("profiles.json")));
        let facade = ClientFacade::new(&config, connector.clone(), profiles).unwrap();
        Fixture {
            facade,
            connector,
            _dir: dir,
        }
    }

    fn wait_terminal(facade: &ClientFacade, id: &str) -> TaskStatus {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let status = facade.task_status(id).unwrap();
            if status.is_terminal() || Instant::now() > deadline {
                return status;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_session_calls_run_on_the_loop() {
        let f = fixture(FakeBehavior::default());

        assert_eq!(
            f.facade.create_session("main", &credentials()).unwrap(),
            SessionState::Active
        );
        f.facade.send_message("main", 9, "hello").unwrap();

        assert_eq!(f.facade.list_sessions().unwrap(), vec!["main"]);
        assert_eq!(
            f.connector.client("main").sent(),
            vec![(9, "hello".to_string())]
        );
        assert!(f.facade.dialogs("ghost", 10).unwrap_err().is_not_found());
    }

    #[test]
    fn test_bulk_invite_task_reports_tally() {
        let f = fixture(FakeBehavior {
            failing_invites: vec![2],
            ..FakeBehavior::default()
        });
        f.facade.create_session("main", &credentials()).unwrap();

        assert!(f.facade.spawn_bulk_invite("invite-1", "main", -100, vec![1, 2, 3]));
        assert!(!f.facade.spawn_bulk_invite("invite-1", "main", -100, vec![4]));

        assert_eq!(wait_terminal(&f.facade, "invite-1"), TaskStatus::Completed);
        let report = f.facade.invite_report("invite-1").unwrap();
        assert_eq!((report.success, report.failed), (2, 1));
        assert_eq!(
            f.connector.client("main").invited(),
            vec![(-100, 1), (-100, 3)]
        );
    }

    #[test]
    fn test_bulk_invite_on_unknown_session_fails() {
        let f = fixture(FakeBehavior::default());

        f.facade.spawn_bulk_invite("invite-x", "ghost", 1, vec![1, 2]);

        assert_eq!(wait_terminal(&f.facade, "invite-x"), TaskStatus::Failed);
        assert_eq!(f.facade.invite_report("invite-x").unwrap().total(), 0);

        assert_eq!(f.facade.cleanup_tasks(), 1);
        assert!(f.facade.task_status("invite-x").is_none());
        assert!(f.facade.invite_report("invite-x").is_none());
    }

    #[test]
    fn test_run_blocking_timeout() {
        let f = fixture(FakeBehavior::default());

        let err = f
            .facade
            .run_blocking(
                async { tokio::time::sleep(Duration::from_secs(10)).await },
                Duration::from_millis(20),
            )
            .unwrap_err();

        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_profiles_through_facade() {
        let f = fixture(FakeBehavior::default());
        let data = json!({"message": "hi"}).as_object().cloned().unwrap();

        f.facade.create_profile("promo", data).unwrap();

        assert_eq!(f.facade.list_profiles().unwrap(), vec!["promo"]);
        assert!(f.facade.get_profile("promo").unwrap().is_some());
        f.facade.delete_profile("promo").unwrap();
        assert!(f.facade.get_profile("promo").unwrap().is_none());
    }

    #[test]
    fn test_shutdown_disconnects_and_is_idempotent() {
        let f = fixture(FakeBehavior::default());
        f.facade.create_session("main", &credentials()).unwrap();
        let client = f.connector.client("main");
        assert!(client.is_connected());

        f.facade.shutdown();
        f.facade.shutdown();

        assert!(!client.is_connected());
        assert!(
            f.facade
                .create_session("late", &credentials())
                .unwrap_err()
                .is_unavailable()
        );
        assert!(!f.facade.spawn_bulk_invite("late", "main", 1, vec![1]));
    }
}
