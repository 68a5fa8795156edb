//! Application layer for the form bot.
//!
//! This crate wires the questionnaire and admin review state machines to a
//! [`FormRepository`](formdesk_core::form::FormRepository) and a
//! [`MessageTransport`](formdesk_core::transport::MessageTransport).

pub mod admin_review_service;
pub mod conversation_service;
pub mod dispatcher;
pub mod notifier;
pub mod render;

#[cfg(test)]
mod test_support;

pub use admin_review_service::AdminReviewService;
pub use conversation_service::ConversationService;
pub use dispatcher::BotDispatcher;
pub use notifier::AdminNotifier;
