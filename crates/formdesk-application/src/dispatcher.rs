//! Routing of inbound platform events.
//!
//! # Usage
//!
//! ```ignore
//! let mut dispatcher = BotDispatcher::from_config(&config.bot, repository, transport);
//! dispatcher.dispatch(event).await?;
//! ```
//!
//! The dispatcher owns the session and admin-state tables, so callers
//! serialize events through a single `&mut` borrow.

use crate::admin_review_service::AdminReviewService;
use crate::conversation_service::ConversationService;
use crate::notifier::AdminNotifier;
use crate::render;
use formdesk_core::admin::AdminStateStore;
use formdesk_core::config::BotConfig;
use formdesk_core::error::Result;
use formdesk_core::form::{FormFlow, FormRepository};
use formdesk_core::identity::{AllowList, UserId};
use formdesk_core::session::{SessionStore, StepInput};
use formdesk_core::transport::{InboundEvent, InboundPayload, MessageTransport};
use std::sync::Arc;

pub struct BotDispatcher {
    conversation: ConversationService,
    admin_review: AdminReviewService,
    transport: Arc<dyn MessageTransport>,
    admins: AllowList,
    sessions: SessionStore,
    admin_states: AdminStateStore,
}

impl BotDispatcher {
    pub fn new(
        conversation: ConversationService,
        admin_review: AdminReviewService,
        transport: Arc<dyn MessageTransport>,
        admins: AllowList,
    ) -> Self {
        Self {
            conversation,
            admin_review,
            transport,
            admins,
            sessions: SessionStore::new(),
            admin_states: AdminStateStore::new(),
        }
    }

    /// Builds both services from the bot settings.
    pub fn from_config(
        config: &BotConfig,
        repository: Arc<dyn FormRepository>,
        transport: Arc<dyn MessageTransport>,
    ) -> Self {
        let admins = config.allow_list();
        if admins.is_empty() {
            tracing::warn!("[BotDispatcher] No admin identities configured");
        }
        let notifier = AdminNotifier::new(transport.clone(), admins.clone());
        let conversation = ConversationService::new(
            FormFlow::new(config.back_side_marker.clone()),
            repository.clone(),
            transport.clone(),
            notifier.clone(),
            config.notification_limit,
        );
        let admin_review = AdminReviewService::new(repository, transport.clone(), notifier);
        Self::new(conversation, admin_review, transport, admins)
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn admin_states(&self) -> &AdminStateStore {
        &self.admin_states
    }

    /// Routes one event.
    ///
    /// Errors are delivery failures towards the sender; everything else is
    /// handled (and logged) inside the services.
    pub async fn dispatch(&mut self, event: InboundEvent) -> Result<()> {
        let sender = event.sender;
        let is_admin = self.admins.contains(sender);
        tracing::debug!("[BotDispatcher] Inbound event from {} (admin: {})", sender, is_admin);

        match event.payload {
            InboundPayload::Start if is_admin => {
                self.admin_states.clear(sender);
                self.admin_review.show_panel(sender).await
            }
            InboundPayload::Start => {
                self.conversation
                    .start(&mut self.sessions, sender, &event.sender_name)
                    .await
            }
            InboundPayload::Cancel => {
                self.admin_states.clear(sender);
                self.conversation.cancel(&mut self.sessions, sender).await
            }
            InboundPayload::Callback(data) => {
                self.admin_review
                    .handle_callback(&mut self.admin_states, sender, &data)
                    .await
            }
            InboundPayload::Text(text) => {
                if is_admin
                    && self
                        .admin_review
                        .handle_text(&mut self.admin_states, sender, &text)
                        .await?
                {
                    return Ok(());
                }
                self.offer(sender, StepInput::Text(text)).await
            }
            InboundPayload::Photo(photo) => self.offer(sender, StepInput::Photo(photo)).await,
        }
    }

    async fn offer(&mut self, sender: UserId, input: StepInput) -> Result<()> {
        let handled = self
            .conversation
            .handle_input(&mut self.sessions, sender, input)
            .await?;
        if !handled {
            self.transport
                .send_text(sender, render::NO_SESSION, None)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryFormRepository, RecordingTransport};
    use formdesk_core::admin::AdminState;
    use formdesk_core::form::{FormStatus, FormStep, SearchField};
    use formdesk_core::transport::PhotoRef;
    use formdesk_infrastructure::SqliteFormRepository;

    const ADMIN: UserId = UserId(1);
    const USER: UserId = UserId(42);

    fn config() -> BotConfig {
        BotConfig {
            admin_ids: vec![ADMIN.0],
            ..BotConfig::default()
        }
    }

    fn dispatcher(
        repository: Arc<dyn FormRepository>,
    ) -> (BotDispatcher, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = BotDispatcher::from_config(&config(), repository, transport.clone());
        (dispatcher, transport)
    }

    fn text(sender: UserId, body: &str) -> InboundEvent {
        InboundEvent::new(sender, "Anna", InboundPayload::Text(body.to_string()))
    }

    fn photo(sender: UserId, id: &str) -> InboundEvent {
        InboundEvent::new(sender, "Anna", InboundPayload::Photo(PhotoRef::new(id)))
    }

    fn event(sender: UserId, payload: InboundPayload) -> InboundEvent {
        InboundEvent::new(sender, "Anna", payload)
    }

    #[tokio::test]
    async fn test_admin_start_shows_panel() {
        let (mut dispatcher, transport) = dispatcher(Arc::new(MemoryFormRepository::default()));

        dispatcher
            .dispatch(event(ADMIN, InboundPayload::Start))
            .await
            .unwrap();

        assert_eq!(transport.texts_to(ADMIN), vec![render::ADMIN_WELCOME]);
        assert!(dispatcher.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_text_without_session_gets_hint() {
        let (mut dispatcher, transport) = dispatcher(Arc::new(MemoryFormRepository::default()));

        dispatcher.dispatch(text(USER, "hello")).await.unwrap();
        dispatcher.dispatch(photo(USER, "p")).await.unwrap();

        assert_eq!(
            transport.texts_to(USER),
            vec![render::NO_SESSION, render::NO_SESSION]
        );
    }

    #[tokio::test]
    async fn test_admin_text_goes_to_pending_search() {
        let repository = Arc::new(MemoryFormRepository::default());
        let (mut dispatcher, transport) = dispatcher(repository);

        dispatcher
            .dispatch(event(
                ADMIN,
                InboundPayload::Callback("search_phone".to_string()),
            ))
            .await
            .unwrap();
        assert_eq!(
            dispatcher.admin_states().get(ADMIN),
            Some(AdminState::AwaitingQuery(SearchField::Phone))
        );

        dispatcher.dispatch(text(ADMIN, "+7900")).await.unwrap();

        assert!(dispatcher.admin_states().get(ADMIN).is_none());
        assert_eq!(
            transport.last_text_to(ADMIN),
            Some(render::search_not_found(SearchField::Phone, "+7900"))
        );
    }

    #[tokio::test]
    async fn test_cancel_clears_session() {
        let (mut dispatcher, transport) = dispatcher(Arc::new(MemoryFormRepository::default()));

        dispatcher
            .dispatch(event(USER, InboundPayload::Start))
            .await
            .unwrap();
        assert_eq!(dispatcher.sessions().len(), 1);

        dispatcher
            .dispatch(event(USER, InboundPayload::Cancel))
            .await
            .unwrap();

        assert!(dispatcher.sessions().is_empty());
        assert_eq!(transport.last_text_to(USER).as_deref(), Some(render::CANCELLED));
    }

    #[tokio::test]
    async fn test_full_submission_and_review_against_sqlite() {
        let repository: Arc<dyn FormRepository> =
            Arc::new(SqliteFormRepository::in_memory().unwrap());
        let (mut dispatcher, transport) = dispatcher(repository.clone());

        dispatcher
            .dispatch(event(USER, InboundPayload::Start))
            .await
            .unwrap();
        for step in FormStep::text_steps() {
            let answer = match step {
                FormStep::Citizenship => "РФ".to_string(),
                FormStep::Fullname => "Анна Смирнова".to_string(),
                other => format!("{}", other),
            };
            dispatcher.dispatch(text(USER, &answer)).await.unwrap();
        }
        dispatcher.dispatch(photo(USER, "front")).await.unwrap();
        dispatcher.dispatch(photo(USER, "selfie")).await.unwrap();

        assert!(dispatcher.sessions().is_empty());
        assert_eq!(transport.last_text_to(USER).as_deref(), Some(render::SUBMITTED));

        let saved = repository.find_by_user(USER).await.unwrap().unwrap();
        assert_eq!(saved.fullname, "Анна Смирнова");
        assert_eq!(saved.status, FormStatus::Pending);

        dispatcher
            .dispatch(event(
                ADMIN,
                InboundPayload::Callback(format!("mark_rejected:{}", USER)),
            ))
            .await
            .unwrap();

        let saved = repository.find_by_user(USER).await.unwrap().unwrap();
        assert_eq!(saved.status, FormStatus::Rejected);
    }
}
