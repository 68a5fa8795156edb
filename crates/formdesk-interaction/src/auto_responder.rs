//! Canned replies to private messages.
//!
//! [`AutoResponder::start`] subscribes to a session's incoming messages and
//! spawns a listener on the current tokio runtime (the client loop, when
//! called through the facade). Only one listener runs at a time.

use crate::session_manager::PlatformSessionManager;
use formdesk_core::error::Result;
use formdesk_core::platform::{IncomingMessage, PlatformClient};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

struct ActiveResponder {
    session: String,
    token: CancellationToken,
}

#[derive(Default)]
pub struct AutoResponder {
    active: Mutex<Option<ActiveResponder>>,
}

impl AutoResponder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts replying with `text` on `session`, replacing a running responder.
    pub async fn start(
        &self,
        sessions: &PlatformSessionManager,
        session: &str,
        text: impl Into<String>,
    ) -> Result<()> {
        let client = sessions.get(session).await?;
        let incoming = client.subscribe_incoming().await?;

        let token = CancellationToken::new();
        let previous = self
            .active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(ActiveResponder {
                session: session.to_string(),
                token: token.clone(),
            });
        if let Some(previous) = previous {
            tracing::info!(
                "[AutoResponder] Replacing responder on '{}'",
                previous.session
            );
            previous.token.cancel();
        }

        tokio::spawn(respond_loop(client, incoming, text.into(), token));
        tracing::info!("[AutoResponder] Activated on '{}'", session);
        Ok(())
    }

    /// Stops the running responder. Returns `false` if none was active.
    pub fn stop(&self) -> bool {
        match self.active.lock().unwrap_or_else(|e| e.into_inner()).take() {
            Some(active) => {
                active.token.cancel();
                tracing::info!("[AutoResponder] Deactivated on '{}'", active.session);
                true
            }
            None => false,
        }
    }

    /// Session the responder is running on.
    pub fn active_session(&self) -> Option<String> {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|active| active.session.clone())
    }
}

impl Drop for AutoResponder {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn respond_loop(
    client: Arc<dyn PlatformClient>,
    mut incoming: mpsc::Receiver<IncomingMessage>,
    text: String,
    token: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = token.cancelled() => break,
            message = incoming.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };
        if !message.is_private {
            continue;
        }
        match client.send_message(message.chat_id, &text).await {
            Ok(()) => tracing::info!("[AutoResponder] Auto-responded to {}", message.sender_id),
            Err(e) => tracing::error!("[AutoResponder] Auto-responder error: {}", e),
        }
    }
    tracing::debug!("[AutoResponder] Listener stopped");
}
