use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::ValueEnum;
use formdesk_core::config::RootConfig;
use formdesk_core::form::{FormRecord, FormRepository, FormStatistics, FormStatus, SearchField};
use formdesk_core::identity::UserId;
use formdesk_infrastructure::{ConfigService, SqliteFormRepository};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SearchBy {
    Name,
    Phone,
}

impl From<SearchBy> for SearchField {
    fn from(by: SearchBy) -> Self {
        match by {
            SearchBy::Name => SearchField::FullName,
            SearchBy::Phone => SearchField::Phone,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Pending,
    Transferred,
    Rejected,
}

impl From<StatusArg> for FormStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Pending => FormStatus::Pending,
            StatusArg::Transferred => FormStatus::Transferred,
            StatusArg::Rejected => FormStatus::Rejected,
        }
    }
}

pub fn open_repository(service: &ConfigService, config: &RootConfig) -> Result<SqliteFormRepository> {
    let path = service.database_path(config)?;
    tracing::debug!("[CLI] Opening form database {}", path.display());
    SqliteFormRepository::open(&path)
        .with_context(|| format!("Failed to open database {}", path.display()))
}

pub async fn stats(repository: &dyn FormRepository) -> Result<()> {
    let stats = repository.statistics().await?;
    print!("{}", format_statistics(&stats));
    Ok(())
}

pub async fn search(repository: &dyn FormRepository, by: SearchBy, query: &str) -> Result<()> {
    let field = SearchField::from(by);
    let query = query.trim();
    let results = repository.search(field, query).await?;
    if results.is_empty() {
        println!("⚠️  No forms found with {} '{}'", field.describe(), query);
        return Ok(());
    }
    for record in &results {
        println!("{}", format_record(record));
    }
    println!("{} form(s) found", results.len());
    Ok(())
}

pub async fn mark(repository: &dyn FormRepository, user_id: i64, status: StatusArg) -> Result<()> {
    let status = FormStatus::from(status);
    let user_id = UserId(user_id);
    if repository.update_status(user_id, status).await? {
        tracing::info!("[CLI] Form of {} marked as {}", user_id, status);
        println!("✅ Form of user {} marked as {}", user_id, status.label());
    } else {
        println!("⚠️  No form found for user {}", user_id);
    }
    Ok(())
}

pub async fn transferred(repository: &dyn FormRepository, days: i64, count_only: bool) -> Result<()> {
    let since = Utc::now() - Duration::days(days);
    if count_only {
        let count = repository
            .count_by_status_since(FormStatus::Transferred, since)
            .await?;
        println!("{}", count);
        return Ok(());
    }

    let items = repository
        .list_by_status_since(FormStatus::Transferred, since)
        .await?;
    if items.is_empty() {
        println!("⚠️  No transferred forms in the last {} days", days);
    }
    for item in items {
        println!("- {} ({})", item.fullname, item.created_at.format(TIMESTAMP_FORMAT));
    }
    Ok(())
}

fn format_statistics(stats: &FormStatistics) -> String {
    format!(
        "📊 Statistics\n  Users:       {}\n  Forms:       {}\n  Rejected:    {}\n  Transferred: {}\n",
        stats.total_users, stats.total_forms, stats.rejected, stats.transferred
    )
}

fn format_record(record: &FormRecord) -> String {
    format!(
        "[{}] {} | {} | @{} | {} | {}",
        record.user_id,
        record.fullname,
        record.phone,
        record.username,
        record.status.label(),
        record.created_at.format(TIMESTAMP_FORMAT)
    )
}
