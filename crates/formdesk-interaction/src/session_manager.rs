//! Named platform sessions.
//!
//! A session is either waiting for its login code (`AwaitingCode`) or
//! signed in (`Active`). Only active sessions are handed out to callers.

use formdesk_core::error::{FormdeskError, Result};
use formdesk_core::platform::{Credentials, PlatformClient, PlatformConnector, SignInOutcome};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// A login code was requested and sign-in is pending.
    AwaitingCode,
    Active,
}

struct SessionEntry {
    client: Arc<dyn PlatformClient>,
    state: SessionState,
}

/// Client map keyed by session name.
pub struct PlatformSessionManager {
    connector: Arc<dyn PlatformConnector>,
    clients: Mutex<HashMap<String, SessionEntry>>,
}

impl PlatformSessionManager {
    pub fn new(connector: Arc<dyn PlatformConnector>) -> Self {
        Self {
            connector,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Connects a new session.
    ///
    /// An already-authorized session becomes active immediately. Otherwise a
    /// login code is requested for `credentials.phone` and the session waits
    /// for [`authorize`](Self::authorize). An existing session with the same
    /// name is replaced.
    pub async fn create_session(
        &self,
        name: &str,
        credentials: &Credentials,
    ) -> Result<SessionState> {
        let client = self.connector.create_client(name, credentials);
        client.connect().await.inspect_err(|e| {
            tracing::error!("[SessionManager] Failed to connect session '{}': {}", name, e)
        })?;

        let state = if client.is_authorized().await? {
            tracing::info!("[SessionManager] Session '{}' already authorized", name);
            SessionState::Active
        } else {
            client.request_code(&credentials.phone).await?;
            tracing::info!("[SessionManager] Code sent to {}", credentials.phone);
            SessionState::AwaitingCode
        };

        let previous = self
            .clients
            .lock()
            .await
            .insert(name.to_string(), SessionEntry { client, state });
        if let Some(previous) = previous {
            tracing::warn!("[SessionManager] Session '{}' replaced", name);
            if let Err(e) = previous.client.disconnect().await {
                tracing::error!("[SessionManager] Error disconnecting '{}': {}", name, e);
            }
        }
        Ok(state)
    }

    /// Signs a pending session in with the login code.
    ///
    /// When the account has two-factor authentication, `password` is used
    /// for the second step; without one the call fails.
    pub async fn authorize(&self, name: &str, code: &str, password: Option<&str>) -> Result<()> {
        let client = {
            let clients = self.clients.lock().await;
            let entry = clients
                .get(name)
                .ok_or_else(|| FormdeskError::not_found("Session", name))?;
            if entry.state == SessionState::Active {
                tracing::debug!("[SessionManager] Session '{}' is already active", name);
                return Ok(());
            }
            entry.client.clone()
        };

        match client.sign_in(code).await? {
            SignInOutcome::Authorized => {
                tracing::info!("[SessionManager] Session '{}' authorized with code", name);
            }
            SignInOutcome::PasswordRequired => {
                let Some(password) = password else {
                    tracing::error!(
                        "[SessionManager] Two-factor authentication required for '{}' but no password provided",
                        name
                    );
                    return Err(FormdeskError::invalid_input(
                        "two-factor authentication required but no password provided",
                    ));
                };
                client.sign_in_password(password).await?;
                tracing::info!("[SessionManager] Session '{}' authorized with password", name);
            }
        }

        let mut clients = self.clients.lock().await;
        match clients.get_mut(name) {
            Some(entry) if Arc::ptr_eq(&entry.client, &client) => {
                entry.state = SessionState::Active;
                Ok(())
            }
            _ => {
                tracing::warn!(
                    "[SessionManager] Session '{}' was replaced during sign-in",
                    name
                );
                Err(FormdeskError::invalid_input(format!(
                    "session '{}' was replaced during sign-in",
                    name
                )))
            }
        }
    }

    /// The client of an active session.
    pub async fn get(&self, name: &str) -> Result<Arc<dyn PlatformClient>> {
        match self.clients.lock().await.get(name) {
            Some(entry) if entry.state == SessionState::Active => Ok(entry.client.clone()),
            _ => Err(FormdeskError::not_found("Session", name)),
        }
    }

    pub async fn state(&self, name: &str) -> Option<SessionState> {
        self.clients.lock().await.get(name).map(|entry| entry.state)
    }

    /// Names of the active sessions, sorted.
    pub async fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .clients
            .lock()
            .await
            .iter()
            .filter(|(_, entry)| entry.state == SessionState::Active)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Disconnects and forgets every session. Returns how many disconnected cleanly.
    pub async fn disconnect_all(&self) -> usize {
        let drained: Vec<(String, SessionEntry)> = self.clients.lock().await.drain().collect();
        let mut disconnected = 0;
        for (name, entry) in drained {
            match entry.client.disconnect().await {
                Ok(()) => {
                    tracing::info!("[SessionManager] Disconnected session: {}", name);
                    disconnected += 1;
                }
                Err(e) => tracing::error!("[SessionManager] Error disconnecting {}: {}", name, e),
            }
        }
        disconnected
    }
}
