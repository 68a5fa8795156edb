//! Form repository trait.
//!
//! Defines the interface for the single form table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{FormRecord, FormStatistics, FormStatus, FormSummary, SearchField};
use crate::error::Result;
use crate::identity::UserId;

/// An abstract repository for the form table.
///
/// One row per identity. Every operation is a single statement; concurrent
/// writers to the same identity are last-write-wins.
#[async_trait]
pub trait FormRepository: Send + Sync {
    /// Inserts the record, replacing any previous row with the same identity.
    ///
    /// The replaced row's status and creation time are not carried over.
    async fn upsert(&self, record: &FormRecord) -> Result<()>;

    /// Finds the record stored for an identity.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(FormRecord))`: Record found
    /// - `Ok(None)`: No record for this identity
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_user(&self, user_id: UserId) -> Result<Option<FormRecord>>;

    /// Sets the status of the record for `user_id`.
    ///
    /// Returns `Ok(false)` when no row exists; that case is not an error.
    async fn update_status(&self, user_id: UserId, status: FormStatus) -> Result<bool>;

    /// Case-insensitive substring search against one text column.
    async fn search(&self, field: SearchField, query: &str) -> Result<Vec<FormRecord>>;

    /// Names and creation times of records with `status` created at or after `since`.
    async fn list_by_status_since(
        &self,
        status: FormStatus,
        since: DateTime<Utc>,
    ) -> Result<Vec<FormSummary>>;

    async fn count_by_status_since(&self, status: FormStatus, since: DateTime<Utc>)
    -> Result<u64>;

    async fn count_distinct_users(&self) -> Result<u64>;

    async fn count_all(&self) -> Result<u64>;

    async fn count_by_status(&self, status: FormStatus) -> Result<u64>;

    /// Collects the counters of the admin statistics screen.
    async fn statistics(&self) -> Result<FormStatistics> {
        Ok(FormStatistics {
            total_users: self.count_distinct_users().await?,
            total_forms: self.count_all().await?,
            rejected: self.count_by_status(FormStatus::Rejected).await?,
            transferred: self.count_by_status(FormStatus::Transferred).await?,
        })
    }
}
