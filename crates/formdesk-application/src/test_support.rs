//! Hand-written test doubles for the transport and the form table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use formdesk_core::error::{FormdeskError, Result};
use formdesk_core::form::{
    FormRecord, FormRepository, FormStatus, FormSummary, SearchField,
};
use formdesk_core::identity::UserId;
use formdesk_core::transport::{Keyboard, MessageTransport, PhotoRef};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        to: UserId,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Photo {
        to: UserId,
        photo: String,
        caption: String,
    },
}

/// Transport that records every delivery; recipients in `failing` error out,
/// as do texts containing one of `failing_texts`.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    failing: HashSet<UserId>,
    failing_texts: Vec<String>,
}

impl RecordingTransport {
    pub fn failing_for(ids: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: ids.into_iter().collect(),
            failing_texts: Vec::new(),
        }
    }

    pub fn failing_texts_containing(needle: &str) -> Self {
        Self {
            failing_texts: vec![needle.to_string()],
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts_to(&self, to: UserId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Text { to: t, text, .. } if t == to => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn photos_to(&self, to: UserId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Photo { to: t, photo, .. } if t == to => Some(photo),
                _ => None,
            })
            .collect()
    }

    pub fn last_text_to(&self, to: UserId) -> Option<String> {
        self.texts_to(to).pop()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl MessageTransport for RecordingTransport {
    async fn send_text(
        &self,
        recipient: UserId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        if self.failing.contains(&recipient) {
            return Err(FormdeskError::transport(format!("chat {} not found", recipient)));
        }
        if self.failing_texts.iter().any(|needle| text.contains(needle)) {
            return Err(FormdeskError::transport("message rejected"));
        }
        self.sent.lock().unwrap().push(Sent::Text {
            to: recipient,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }

    async fn send_photo(&self, recipient: UserId, photo: &PhotoRef, caption: &str) -> Result<()> {
        if self.failing.contains(&recipient) {
            return Err(FormdeskError::transport(format!("chat {} not found", recipient)));
        }
        self.sent.lock().unwrap().push(Sent::Photo {
            to: recipient,
            photo: photo.as_str().to_string(),
            caption: caption.to_string(),
        });
        Ok(())
    }
}

/// In-memory form table. With `broken` set every call fails.
#[derive(Default)]
pub struct MemoryFormRepository {
    rows: Mutex<BTreeMap<UserId, FormRecord>>,
    broken: bool,
}

impl MemoryFormRepository {
    pub fn broken() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            broken: true,
        }
    }

    pub fn insert(&self, record: FormRecord) {
        self.rows.lock().unwrap().insert(record.user_id, record);
    }

    pub fn row(&self, user_id: UserId) -> Option<FormRecord> {
        self.rows.lock().unwrap().get(&user_id).cloned()
    }

    fn check(&self) -> Result<()> {
        if self.broken {
            Err(FormdeskError::data_access("database is locked"))
        } else {
            Ok(())
        }
    }

    fn count_where(&self, pred: impl Fn(&FormRecord) -> bool) -> u64 {
        self.rows.lock().unwrap().values().filter(|r| pred(r)).count() as u64
    }
}

#[async_trait]
impl FormRepository for MemoryFormRepository {
    async fn upsert(&self, record: &FormRecord) -> Result<()> {
        self.check()?;
        self.insert(record.clone());
        Ok(())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<FormRecord>> {
        self.check()?;
        Ok(self.row(user_id))
    }

    async fn update_status(&self, user_id: UserId, status: FormStatus) -> Result<bool> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&user_id) {
            Some(row) => {
                row.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn search(&self, field: SearchField, query: &str) -> Result<Vec<FormRecord>> {
        self.check()?;
        let query = query.to_lowercase();
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| {
                let value = match field {
                    SearchField::FullName => &r.fullname,
                    SearchField::Phone => &r.phone,
                };
                value.to_lowercase().contains(&query)
            })
            .cloned()
            .collect())
    }

    async fn list_by_status_since(
        &self,
        status: FormStatus,
        since: DateTime<Utc>,
    ) -> Result<Vec<FormSummary>> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.status == status && r.created_at >= since)
            .map(|r| FormSummary {
                fullname: r.fullname.clone(),
                created_at: r.created_at,
            })
            .collect())
    }

    async fn count_by_status_since(
        &self,
        status: FormStatus,
        since: DateTime<Utc>,
    ) -> Result<u64> {
        self.check()?;
        Ok(self.count_where(|r| r.status == status && r.created_at >= since))
    }

    async fn count_distinct_users(&self) -> Result<u64> {
        self.check()?;
        Ok(self.count_where(|_| true))
    }

    async fn count_all(&self) -> Result<u64> {
        self.check()?;
        Ok(self.count_where(|_| true))
    }

    async fn count_by_status(&self, status: FormStatus) -> Result<u64> {
        self.check()?;
        Ok(self.count_where(|r| r.status == status))
    }
}
