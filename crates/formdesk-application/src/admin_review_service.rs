//! Admin triage of submitted forms.
//!
//! Handles the admin keyboards (status changes, summaries, statistics) and
//! the two single-round-trip admin states: a pending search query and a
//! pending reply to a conversant. Every entry point is gated by the allow-list.

use crate::notifier::{AdminNotifier, send_photos};
use crate::render;
use chrono::{Duration, Utc};
use formdesk_core::admin::{
    AdminAction, AdminState, AdminStateStore, SUMMARY_MONTH_DAYS, SUMMARY_WEEK_DAYS,
};
use formdesk_core::error::Result;
use formdesk_core::form::{FormRepository, FormStatus, SearchField};
use formdesk_core::identity::UserId;
use formdesk_core::transport::MessageTransport;
use std::sync::Arc;

pub struct AdminReviewService {
    repository: Arc<dyn FormRepository>,
    transport: Arc<dyn MessageTransport>,
    notifier: AdminNotifier,
}

impl AdminReviewService {
    pub fn new(
        repository: Arc<dyn FormRepository>,
        transport: Arc<dyn MessageTransport>,
        notifier: AdminNotifier,
    ) -> Self {
        Self {
            repository,
            transport,
            notifier,
        }
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.notifier.is_admin(user_id)
    }

    /// Sends the admin control keyboard.
    pub async fn show_panel(&self, admin: UserId) -> Result<()> {
        let keyboard = render::control_keyboard();
        self.transport
            .send_text(admin, render::ADMIN_WELCOME, Some(&keyboard))
            .await
    }

    /// Handles a keyboard button press.
    ///
    /// Non-admins get a denial. Unknown data and failed lookups are logged
    /// and answered with a generic error notice.
    pub async fn handle_callback(
        &self,
        states: &mut AdminStateStore,
        sender: UserId,
        data: &str,
    ) -> Result<()> {
        if !self.is_admin(sender) {
            tracing::warn!(
                "[AdminReview] Callback '{}' from non-admin {} denied",
                data,
                sender
            );
            return self.transport.send_text(sender, render::ADMIN_ONLY, None).await;
        }

        let action = match data.parse::<AdminAction>() {
            Ok(action) => action,
            Err(e) => {
                tracing::warn!(
                    "[AdminReview] Unrecognized callback '{}' from {}: {}",
                    data,
                    sender,
                    e
                );
                return self
                    .transport
                    .send_text(sender, render::CALLBACK_FAILED, None)
                    .await;
            }
        };

        tracing::info!("[AdminReview] Admin {} requested {}", sender, action);
        if let Err(e) = self.perform(states, sender, action).await {
            tracing::error!("[AdminReview] Action {} by {} failed: {}", action, sender, e);
            self.transport
                .send_text(sender, render::CALLBACK_FAILED, None)
                .await?;
        }
        Ok(())
    }

    /// Consumes a pending admin state with `text`.
    ///
    /// Returns `false` when `sender` has no pending state. The state is
    /// cleared whatever the outcome.
    pub async fn handle_text(
        &self,
        states: &mut AdminStateStore,
        sender: UserId,
        text: &str,
    ) -> Result<bool> {
        if !self.is_admin(sender) {
            return Ok(false);
        }
        let Some(state) = states.take(sender) else {
            return Ok(false);
        };

        match state {
            AdminState::AwaitingQuery(field) => self.search(sender, field, text).await?,
            AdminState::AwaitingReply { target } => self.relay_reply(sender, target, text).await?,
        }
        Ok(true)
    }

    async fn perform(
        &self,
        states: &mut AdminStateStore,
        admin: UserId,
        action: AdminAction,
    ) -> Result<()> {
        match action {
            AdminAction::MarkTransferred(target) => {
                self.change_status(admin, target, FormStatus::Transferred)
                    .await
            }
            AdminAction::MarkRejected(target) => {
                self.change_status(admin, target, FormStatus::Rejected)
                    .await
            }
            AdminAction::ReplyTo(target) => {
                states.set(admin, AdminState::AwaitingReply { target });
                self.transport
                    .send_text(admin, render::REPLY_PROMPT, None)
                    .await
            }
            AdminAction::SummaryWeek => {
                self.send_summary(admin, SUMMARY_WEEK_DAYS, "in the last week")
                    .await
            }
            AdminAction::SummaryMonth | AdminAction::ListTransferredMonth => {
                self.send_summary(admin, SUMMARY_MONTH_DAYS, "in the last month")
                    .await
            }
            AdminAction::CountTransferredMonth => {
                let since = Utc::now() - Duration::days(SUMMARY_MONTH_DAYS);
                let count = self
                    .repository
                    .count_by_status_since(FormStatus::Transferred, since)
                    .await?;
                self.transport
                    .send_text(admin, &render::transferred_count(count), None)
                    .await
            }
            AdminAction::Statistics => {
                let stats = self.repository.statistics().await?;
                self.transport
                    .send_text(admin, &render::statistics_text(&stats), None)
                    .await
            }
            AdminAction::Search(field) => {
                states.set(admin, AdminState::AwaitingQuery(field));
                self.transport
                    .send_text(admin, &render::search_prompt(field), None)
                    .await
            }
        }
    }

    /// Sets the status, then re-broadcasts the current record (or a "not
    /// found" notice) to all admins.
    async fn change_status(&self, admin: UserId, target: UserId, status: FormStatus) -> Result<()> {
        let changed = self.repository.update_status(target, status).await?;
        if !changed {
            tracing::info!(
                "[AdminReview] Status change for unknown form of {} ignored",
                target
            );
        }

        if let Err(e) = self
            .transport
            .send_text(admin, &render::status_confirmation(status), None)
            .await
        {
            tracing::error!(
                "[AdminReview] Failed to confirm status change to {}: {}",
                admin,
                e
            );
        }

        match self.repository.find_by_user(target).await? {
            Some(record) => {
                self.notifier
                    .broadcast_text(&render::status_changed_text(&record, status), None)
                    .await;
                self.notifier.broadcast_photos(&record).await;
            }
            None => {
                self.notifier
                    .broadcast_text(&render::form_not_found(target), None)
                    .await;
            }
        }
        Ok(())
    }

    async fn send_summary(&self, admin: UserId, days: i64, period: &str) -> Result<()> {
        let since = Utc::now() - Duration::days(days);
        let items = self
            .repository
            .list_by_status_since(FormStatus::Transferred, since)
            .await?;
        self.transport
            .send_text(admin, &render::transferred_summary(period, &items), None)
            .await
    }

    async fn search(&self, admin: UserId, field: SearchField, raw_query: &str) -> Result<()> {
        let query = raw_query.trim();
        if query.is_empty() {
            return self
                .transport
                .send_text(admin, &render::search_not_found(field, query), None)
                .await;
        }
        let results = match self.repository.search(field, query).await {
            Ok(results) => results,
            Err(e) => {
                tracing::error!(
                    "[AdminReview] Search by {} for {} failed: {}",
                    field.column(),
                    admin,
                    e
                );
                return self
                    .transport
                    .send_text(admin, render::SEARCH_FAILED, None)
                    .await;
            }
        };

        if results.is_empty() {
            return self
                .transport
                .send_text(admin, &render::search_not_found(field, query), None)
                .await;
        }

        for record in &results {
            if let Err(e) = self
                .transport
                .send_text(admin, &render::search_result_text(record), None)
                .await
            {
                tracing::error!(
                    "[AdminReview] Failed to send search result {} to {}: {}",
                    record.user_id,
                    admin,
                    e
                );
                continue;
            }
            send_photos(self.transport.as_ref(), admin, record).await;
        }
        Ok(())
    }

    async fn relay_reply(&self, admin: UserId, target: UserId, text: &str) -> Result<()> {
        match self
            .transport
            .send_text(target, &render::admin_reply(text), None)
            .await
        {
            Ok(()) => {
                tracing::info!("[AdminReview] Reply from {} delivered to {}", admin, target);
                self.notifier
                    .broadcast_text(&render::reply_delivered(target), None)
                    .await;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("[AdminReview] Reply from {} to {} failed: {}", admin, target, e);
                self.transport
                    .send_text(admin, &render::reply_failed(&e.to_string()), None)
                    .await
            }
        }
    }
}
