//! Messaging platform client interface used by the automation client.
//!
//! The platform SDK (session files, MTProto, rate limits) is an external
//! collaborator. These traits are the narrow surface the automation client
//! consumes; implementations wrap the real SDK.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::Result;

/// API credentials and phone number used to open a platform session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub api_id: i32,
    pub api_hash: String,
    pub phone: String,
}

/// A chat visible to the signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    pub id: i64,
    pub name: String,
    /// Entity kind reported by the platform (user, chat, channel).
    pub kind: String,
    pub unread_count: u32,
}

/// A member of a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub is_bot: bool,
}

/// A message received by the signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub sender_id: i64,
    pub is_private: bool,
    pub text: String,
}

/// Result of submitting a login code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInOutcome {
    Authorized,
    /// The account has two-factor authentication enabled.
    PasswordRequired,
}

/// One connected platform session.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn connect(&self) -> Result<()>;

    async fn is_authorized(&self) -> Result<bool>;

    /// Asks the platform to send a login code to `phone`.
    async fn request_code(&self, phone: &str) -> Result<()>;

    async fn sign_in(&self, code: &str) -> Result<SignInOutcome>;

    async fn sign_in_password(&self, password: &str) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    async fn dialogs(&self, limit: usize) -> Result<Vec<Dialog>>;

    async fn send_message(&self, peer: i64, text: &str) -> Result<()>;

    async fn participants(&self, chat_id: i64, limit: usize) -> Result<Vec<Participant>>;

    async fn invite_to_channel(&self, channel_id: i64, user_id: i64) -> Result<()>;

    /// Resolves a username or phone to an account, if one exists.
    async fn resolve(&self, query: &str) -> Result<Option<Participant>>;

    /// Stream of incoming messages for this session.
    async fn subscribe_incoming(&self) -> Result<mpsc::Receiver<IncomingMessage>>;
}

/// Creates platform clients for named sessions.
pub trait PlatformConnector: Send + Sync {
    fn create_client(&self, session_name: &str, credentials: &Credentials)
        -> Arc<dyn PlatformClient>;
}
