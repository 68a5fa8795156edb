//! Fan-out of bot messages to the admin allow-list.

use formdesk_core::form::FormRecord;
use formdesk_core::identity::{AllowList, UserId};
use formdesk_core::transport::{Keyboard, MessageTransport, PhotoRef};
use std::sync::Arc;

/// Sends messages to every admin, one recipient at a time.
///
/// A failed delivery is logged and the loop moves on to the next admin;
/// callers never see per-recipient errors.
#[derive(Clone)]
pub struct AdminNotifier {
    transport: Arc<dyn MessageTransport>,
    admins: AllowList,
}

impl AdminNotifier {
    pub fn new(transport: Arc<dyn MessageTransport>, admins: AllowList) -> Self {
        Self { transport, admins }
    }

    pub fn admins(&self) -> &AllowList {
        &self.admins
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.admins.contains(user_id)
    }

    /// Returns how many admins received the message.
    pub async fn broadcast_text(&self, text: &str, keyboard: Option<&Keyboard>) -> usize {
        let mut delivered = 0;
        for admin in self.admins.iter() {
            match self.transport.send_text(admin, text, keyboard).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::error!("[AdminNotifier] Failed to notify admin {}: {}", admin, e);
                }
            }
        }
        delivered
    }

    /// Sends the record's photos (front, back if present, selfie) to every admin.
    pub async fn broadcast_photos(&self, record: &FormRecord) {
        for admin in self.admins.iter() {
            send_photos(self.transport.as_ref(), admin, record).await;
        }
    }
}

/// Sends the record's photos to one recipient, logging failures.
pub async fn send_photos(transport: &dyn MessageTransport, recipient: UserId, record: &FormRecord) {
    for (step, photo) in record.photos() {
        let caption = step.photo_caption().unwrap_or_default();
        if let Err(e) = transport
            .send_photo(recipient, &PhotoRef::new(photo), caption)
            .await
        {
            tracing::error!(
                "[AdminNotifier] Failed to send {} photo to {}: {}",
                step,
                recipient,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingTransport, Sent};
    use formdesk_core::form::{FormAnswers, FormStep};

    #[tokio::test]
    async fn test_failed_recipient_does_not_stop_broadcast() {
        let transport = Arc::new(RecordingTransport::failing_for([UserId(2)]));
        let notifier = AdminNotifier::new(transport.clone(), AllowList::from_iter([1, 2, 3]));

        let delivered = notifier.broadcast_text("hello", None).await;

        assert_eq!(delivered, 2);
        assert_eq!(transport.texts_to(UserId(1)), vec!["hello"]);
        assert_eq!(transport.texts_to(UserId(3)), vec!["hello"]);
    }

    #[tokio::test]
    async fn test_photos_skip_missing_back_side() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = AdminNotifier::new(transport.clone(), AllowList::from_iter([1]));
        let mut answers = FormAnswers::default();
        answers.record(FormStep::PassportFront, "front-id");
        answers.record(FormStep::Selfie, "selfie-id");
        let record = FormRecord::from_answers(UserId(9), &answers);

        notifier.broadcast_photos(&record).await;

        let photos: Vec<String> = transport
            .sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Photo { photo, .. } => Some(photo),
                _ => None,
            })
            .collect();
        assert_eq!(photos, vec!["front-id", "selfie-id"]);
    }
}
