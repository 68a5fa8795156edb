//! Hand-written platform doubles.

use async_trait::async_trait;
use formdesk_core::error::{FormdeskError, Result};
use formdesk_core::platform::{
    Credentials, Dialog, IncomingMessage, Participant, PlatformClient, PlatformConnector,
    SignInOutcome,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, mpsc};

pub const VALID_CODE: &str = "12345";
pub const PASSWORD: &str = "hunter2";

/// How clients created by [`FakeConnector`] behave.
#[derive(Clone, Default)]
pub struct FakeBehavior {
    pub authorized: bool,
    pub two_factor: bool,
    pub failing_invites: Vec<i64>,
    pub fail_disconnect: bool,
    pub sign_in_gate: Option<Arc<SignInGate>>,
}

/// Holds `sign_in` open: signals `entered`, then waits for `release`.
#[derive(Default)]
pub struct SignInGate {
    pub entered: Notify,
    pub release: Notify,
}

pub struct FakeClient {
    behavior: FakeBehavior,
    authorized: AtomicBool,
    connected: AtomicBool,
    codes_requested: Mutex<Vec<String>>,
    sent: Mutex<Vec<(i64, String)>>,
    invited: Mutex<Vec<(i64, i64)>>,
    incoming: Mutex<Option<mpsc::Sender<IncomingMessage>>>,
}

impl FakeClient {
    fn new(behavior: FakeBehavior) -> Self {
        Self {
            authorized: AtomicBool::new(behavior.authorized),
            behavior,
            connected: AtomicBool::new(false),
            codes_requested: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            invited: Mutex::new(Vec::new()),
            incoming: Mutex::new(None),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn codes_requested(&self) -> Vec<String> {
        self.codes_requested.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn invited(&self) -> Vec<(i64, i64)> {
        self.invited.lock().unwrap().clone()
    }

    /// Pushes a message into the incoming stream, if someone subscribed.
    pub async fn deliver(&self, message: IncomingMessage) {
        let sender = self.incoming.lock().unwrap().clone();
        if let Some(sender) = sender {
            sender.send(message).await.unwrap();
        }
    }

    fn ensure_authorized(&self) -> Result<()> {
        if self.authorized.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(FormdeskError::transport("not authorized"))
        }
    }
}

#[async_trait]
impl PlatformClient for FakeClient {
    async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn is_authorized(&self) -> Result<bool> {
        Ok(self.authorized.load(Ordering::SeqCst))
    }

    async fn request_code(&self, phone: &str) -> Result<()> {
        self.codes_requested.lock().unwrap().push(phone.to_string());
        Ok(())
    }

    async fn sign_in(&self, code: &str) -> Result<SignInOutcome> {
        if let Some(gate) = &self.behavior.sign_in_gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if code != VALID_CODE {
            return Err(FormdeskError::invalid_input("invalid phone code"));
        }
        if self.behavior.two_factor {
            return Ok(SignInOutcome::PasswordRequired);
        }
        self.authorized.store(true, Ordering::SeqCst);
        Ok(SignInOutcome::Authorized)
    }

    async fn sign_in_password(&self, password: &str) -> Result<()> {
        if password != PASSWORD {
            return Err(FormdeskError::invalid_input("invalid password"));
        }
        self.authorized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        if self.behavior.fail_disconnect {
            return Err(FormdeskError::transport("connection reset"));
        }
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn dialogs(&self, limit: usize) -> Result<Vec<Dialog>> {
        self.ensure_authorized()?;
        Ok((0..3)
            .map(|i| Dialog {
                id: i,
                name: format!("chat {}", i),
                kind: "Channel".to_string(),
                unread_count: 0,
            })
            .take(limit)
            .collect())
    }

    async fn send_message(&self, peer: i64, text: &str) -> Result<()> {
        self.ensure_authorized()?;
        self.sent.lock().unwrap().push((peer, text.to_string()));
        Ok(())
    }

    async fn participants(&self, _chat_id: i64, limit: usize) -> Result<Vec<Participant>> {
        self.ensure_authorized()?;
        Ok((1..=5)
            .map(|id| Participant {
                id,
                first_name: Some(format!("user{}", id)),
                last_name: None,
                username: None,
                phone: None,
                is_bot: id == 5,
            })
            .take(limit)
            .collect())
    }

    async fn invite_to_channel(&self, channel_id: i64, user_id: i64) -> Result<()> {
        self.ensure_authorized()?;
        if self.behavior.failing_invites.contains(&user_id) {
            return Err(FormdeskError::transport("USER_PRIVACY_RESTRICTED"));
        }
        self.invited.lock().unwrap().push((channel_id, user_id));
        Ok(())
    }

    async fn resolve(&self, query: &str) -> Result<Option<Participant>> {
        self.ensure_authorized()?;
        if query == "+70000000000" {
            return Err(FormdeskError::transport("FLOOD_WAIT"));
        }
        Ok((query == "+79001112233").then(|| Participant {
            id: 77,
            first_name: Some("Anna".to_string()),
            last_name: None,
            username: Some("anna".to_string()),
            phone: Some(query.trim_start_matches('+').to_string()),
            is_bot: false,
        }))
    }

    async fn subscribe_incoming(&self) -> Result<mpsc::Receiver<IncomingMessage>> {
        let (tx, rx) = mpsc::channel(16);
        *self.incoming.lock().unwrap() = Some(tx);
        Ok(rx)
    }
}

/// Connector that remembers every client it created.
#[derive(Default)]
pub struct FakeConnector {
    behavior: FakeBehavior,
    clients: Mutex<HashMap<String, Arc<FakeClient>>>,
}

impl FakeConnector {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn authorized() -> Self {
        Self::new(FakeBehavior {
            authorized: true,
            ..FakeBehavior::default()
        })
    }

    pub fn client(&self, session_name: &str) -> Arc<FakeClient> {
        self.clients.lock().unwrap()[session_name].clone()
    }
}

impl PlatformConnector for FakeConnector {
    fn create_client(
        &self,
        session_name: &str,
        _credentials: &Credentials,
    ) -> Arc<dyn PlatformClient> {
        let client = Arc::new(FakeClient::new(self.behavior.clone()));
        self.clients
            .lock()
            .unwrap()
            .insert(session_name.to_string(), client.clone());
        client
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        api_id: 1,
        api_hash: "hash".to_string(),
        phone: "+79990000000".to_string(),
    }
}
