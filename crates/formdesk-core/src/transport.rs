//! Messaging transport interface for the form bot.
//!
//! The bot only needs to deliver text and photos to one recipient and to
//! receive inbound events tagged with the sender's identity. Everything else
//! about the platform stays behind this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::identity::UserId;

/// Platform reference to an uploaded photo (a file id), stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoRef(pub String);

impl PhotoRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhotoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An inline button carrying callback data back to the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub text: String,
    pub data: String,
}

impl Button {
    pub fn new(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
        }
    }
}

/// Rows of inline buttons attached to an outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

/// Body of an inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InboundPayload {
    /// The start command.
    Start,
    /// Explicit abort of the current conversation.
    Cancel,
    Text(String),
    Photo(PhotoRef),
    /// Inline button press with its callback data.
    Callback(String),
}

/// One inbound event from the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub sender: UserId,
    /// Display name of the sender, used in admin notices.
    pub sender_name: String,
    pub payload: InboundPayload,
}

impl InboundEvent {
    pub fn new(sender: UserId, sender_name: impl Into<String>, payload: InboundPayload) -> Self {
        Self {
            sender,
            sender_name: sender_name.into(),
            payload,
        }
    }
}

/// Outbound side of the messaging platform.
///
/// Implementations report delivery failures as `FormdeskError::Transport`;
/// callers decide whether to log and continue.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Delivers a text message, optionally with inline buttons.
    async fn send_text(
        &self,
        recipient: UserId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()>;

    /// Delivers a previously uploaded photo with a caption.
    async fn send_photo(&self, recipient: UserId, photo: &PhotoRef, caption: &str) -> Result<()>;
}
