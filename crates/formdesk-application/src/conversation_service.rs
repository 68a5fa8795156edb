//! Questionnaire dispatch for conversants.
//!
//! Drives a [`Session`](formdesk_core::session::Session) per identity through
//! the form steps and performs the terminal handoff once the last step is
//! answered.
//!
//! # Terminal handoff
//!
//! 1. Persist the record (upsert by identity). A failure is logged and the
//!    handoff continues.
//! 2. Notify every admin with the form text and the review keyboard, then the
//!    photos.
//! 3. Acknowledge the conversant.
//! 4. Clear the session.

use crate::notifier::AdminNotifier;
use crate::render;
use formdesk_core::error::Result;
use formdesk_core::form::{FormFlow, FormRecord, FormRepository, FormStatus};
use formdesk_core::identity::UserId;
use formdesk_core::session::{Advance, SessionStore, StepInput};
use formdesk_core::transport::MessageTransport;
use std::sync::Arc;

pub struct ConversationService {
    flow: FormFlow,
    repository: Arc<dyn FormRepository>,
    transport: Arc<dyn MessageTransport>,
    notifier: AdminNotifier,
    /// Maximum notification length before the short form is used.
    notification_limit: usize,
}

impl ConversationService {
    pub fn new(
        flow: FormFlow,
        repository: Arc<dyn FormRepository>,
        transport: Arc<dyn MessageTransport>,
        notifier: AdminNotifier,
        notification_limit: usize,
    ) -> Self {
        Self {
            flow,
            repository,
            transport,
            notifier,
            notification_limit,
        }
    }

    pub fn flow(&self) -> &FormFlow {
        &self.flow
    }

    /// Handles the start command from a non-admin.
    ///
    /// Admins are told about the newcomer (and warned if the identity was
    /// rejected before), then a fresh session begins with the first prompt.
    /// An existing session is discarded.
    pub async fn start(
        &self,
        sessions: &mut SessionStore,
        user_id: UserId,
        display_name: &str,
    ) -> Result<()> {
        self.notifier
            .broadcast_text(&render::new_user_notice(user_id, display_name), None)
            .await;

        match self.repository.find_by_user(user_id).await {
            Ok(Some(previous)) if previous.status == FormStatus::Rejected => {
                tracing::info!(
                    "[ConversationService] Previously rejected user {} started a new form",
                    user_id
                );
                self.notifier
                    .broadcast_text(&render::rejected_before_warning(user_id), None)
                    .await;
                if let Err(e) = self
                    .transport
                    .send_text(user_id, render::CAREFUL_CHECK, None)
                    .await
                {
                    tracing::error!(
                        "[ConversationService] Failed to warn user {} about review: {}",
                        user_id,
                        e
                    );
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(
                    "[ConversationService] Failed to look up previous form of {}: {}",
                    user_id,
                    e
                );
            }
        }

        let step = sessions.start(user_id, &self.flow).step;
        tracing::debug!("[ConversationService] Session started for {}", user_id);
        self.transport
            .send_text(
                user_id,
                &format!("{}\n\n{}", render::WELCOME, step.prompt()),
                None,
            )
            .await
    }

    /// Aborts the conversant's session, if any.
    pub async fn cancel(&self, sessions: &mut SessionStore, user_id: UserId) -> Result<()> {
        if sessions.clear(user_id) {
            tracing::debug!("[ConversationService] Session of {} cancelled", user_id);
        }
        self.transport
            .send_text(user_id, render::CANCELLED, None)
            .await
    }

    /// Offers `input` to the conversant's current step.
    ///
    /// Returns `false` when the identity has no active session.
    pub async fn handle_input(
        &self,
        sessions: &mut SessionStore,
        user_id: UserId,
        input: StepInput,
    ) -> Result<bool> {
        let Some(session) = sessions.get_mut(user_id) else {
            return Ok(false);
        };

        match session.advance(&self.flow, input) {
            Advance::Next(step) => {
                self.transport
                    .send_text(user_id, step.prompt(), None)
                    .await?;
            }
            Advance::Rejected { expected } => {
                tracing::debug!(
                    "[ConversationService] Rejected input from {} at {}: expected {}",
                    user_id,
                    session.step,
                    expected
                );
                self.transport
                    .send_text(user_id, &render::wrong_shape(session.step), None)
                    .await?;
            }
            Advance::Completed(record) => {
                let result = self.hand_off(&record).await;
                sessions.clear(user_id);
                result?;
            }
        }
        Ok(true)
    }

    async fn hand_off(&self, record: &FormRecord) -> Result<()> {
        let user_id = record.user_id;

        match self.repository.upsert(record).await {
            Ok(()) => tracing::info!("[ConversationService] Form of {} saved", user_id),
            Err(e) => tracing::error!(
                "[ConversationService] Failed to save form of {}: {}",
                user_id,
                e
            ),
        }

        let text = render::submission_notification(record, self.notification_limit);
        let keyboard = render::review_keyboard(user_id);
        let delivered = self.notifier.broadcast_text(&text, Some(&keyboard)).await;
        self.notifier.broadcast_photos(record).await;
        tracing::debug!(
            "[ConversationService] Form of {} delivered to {} admin(s)",
            user_id,
            delivered
        );

        self.transport
            .send_text(user_id, render::SUBMITTED, None)
            .await
    }
}
