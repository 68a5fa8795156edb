//! SQLite-backed implementation of [`FormRepository`].
//!
//! The whole store is one `forms` table keyed by `user_id`. The connection is
//! shared behind a mutex and every statement runs on the blocking pool, so
//! async callers never stall the runtime on disk I/O.
//!
//! Timestamps are stored as `YYYY-MM-DD HH:MM:SS` UTC text, the same shape
//! SQLite's `CURRENT_TIMESTAMP` produces, so rows written by either side
//! compare correctly as strings.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use formdesk_core::error::{FormdeskError, Result};
use formdesk_core::form::{
    FormRecord, FormRepository, FormStatus, FormSummary, SearchField,
};
use formdesk_core::identity::UserId;
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Arc, Mutex};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS forms (
    user_id INTEGER PRIMARY KEY,
    citizenship TEXT,
    age TEXT,
    fullname TEXT,
    city TEXT,
    address TEXT,
    bad_habits TEXT,
    username TEXT,
    travel TEXT,
    license TEXT,
    phone TEXT,
    passport TEXT,
    experience TEXT,
    passport_front TEXT,
    passport_back TEXT,
    selfie TEXT,
    status TEXT DEFAULT 'pending',
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_forms_status_created ON forms (status, created_at);
";

const SELECT_COLUMNS: &str = "user_id, citizenship, age, fullname, city, address, bad_habits, \
     username, travel, license, phone, passport, experience, passport_front, passport_back, \
     selfie, status, created_at";

/// Form repository over a single SQLite database file.
#[derive(Clone)]
pub struct SqliteFormRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteFormRepository {
    /// Opens (or creates) the database at `path` and bootstraps the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(to_data_access)?;
        tracing::debug!("[SqliteFormRepository] Opened {}", path.display());
        Self::bootstrap(conn)
    }

    /// Creates a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(to_data_access)?;
        Self::bootstrap(conn)
    }

    fn bootstrap(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(to_data_access)?;
        // SQLite's built-in lower() and LIKE only fold ASCII.
        conn.create_scalar_function(
            "unicode_lower",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let value: Option<String> = ctx.get(0)?;
                Ok(value.map(|text| text.to_lowercase()))
            },
        )
        .map_err(to_data_access)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| FormdeskError::internal("form database lock poisoned"))?;
            f(&guard).map_err(to_data_access)
        })
        .await
        .map_err(|e| FormdeskError::internal(format!("database task failed: {}", e)))?
    }
}

#[async_trait]
impl FormRepository for SqliteFormRepository {
    async fn upsert(&self, record: &FormRecord) -> Result<()> {
        let record = record.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO forms (
                    user_id, citizenship, age, fullname, city, address, bad_habits, username,
                    travel, license, phone, passport, experience, passport_front, passport_back,
                    selfie, status, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                params![
                    record.user_id.as_i64(),
                    record.citizenship,
                    record.age,
                    record.fullname,
                    record.city,
                    record.address,
                    record.bad_habits,
                    record.username,
                    record.travel,
                    record.license,
                    record.phone,
                    record.passport,
                    record.experience,
                    record.passport_front,
                    record.passport_back,
                    record.selfie,
                    record.status.as_str(),
                    format_timestamp(record.created_at),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Option<FormRecord>> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM forms WHERE user_id = ?1"),
                params![user_id.as_i64()],
                map_record,
            )
            .optional()
        })
        .await
    }

    async fn update_status(&self, user_id: UserId, status: FormStatus) -> Result<bool> {
        let changed = self
            .with_conn(move |conn| {
                conn.execute(
                    "UPDATE forms SET status = ?1 WHERE user_id = ?2",
                    params![status.as_str(), user_id.as_i64()],
                )
            })
            .await?;
        Ok(changed > 0)
    }

    async fn search(&self, field: SearchField, query: &str) -> Result<Vec<FormRecord>> {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM forms \
             WHERE unicode_lower({}) LIKE ?1 ESCAPE '\\' ORDER BY created_at DESC",
            field.column()
        );
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![pattern], map_record)?;
            rows.collect()
        })
        .await
    }

    async fn list_by_status_since(
        &self,
        status: FormStatus,
        since: DateTime<Utc>,
    ) -> Result<Vec<FormSummary>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT fullname, created_at FROM forms
                 WHERE status = ?1 AND created_at >= ?2
                 ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map(
                params![status.as_str(), format_timestamp(since)],
                |row| {
                    Ok(FormSummary {
                        fullname: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                        created_at: read_timestamp(row, 1)?,
                    })
                },
            )?;
            rows.collect()
        })
        .await
    }

    async fn count_by_status_since(
        &self,
        status: FormStatus,
        since: DateTime<Utc>,
    ) -> Result<u64> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM forms WHERE status = ?1 AND created_at >= ?2",
                params![status.as_str(), format_timestamp(since)],
                read_count,
            )
        })
        .await
    }

    async fn count_distinct_users(&self) -> Result<u64> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(DISTINCT user_id) FROM forms", [], read_count)
        })
        .await
    }

    async fn count_all(&self) -> Result<u64> {
        self.with_conn(|conn| conn.query_row("SELECT COUNT(*) FROM forms", [], read_count))
            .await
    }

    async fn count_by_status(&self, status: FormStatus) -> Result<u64> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM forms WHERE status = ?1",
                params![status.as_str()],
                read_count,
            )
        })
        .await
    }
}

fn to_data_access(err: rusqlite::Error) -> FormdeskError {
    FormdeskError::data_access(err.to_string())
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a stored timestamp. Fractional seconds and a `T` separator are
/// accepted for rows written by other tools.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let normalized = raw.trim().replacen('T', " ", 1);
    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn read_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("invalid timestamp '{}'", raw).into(),
        )
    })
}

fn read_count(row: &Row<'_>) -> rusqlite::Result<u64> {
    let count: i64 = row.get(0)?;
    Ok(u64::try_from(count).unwrap_or_default())
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<FormRecord> {
    let text = |idx: usize| -> rusqlite::Result<String> {
        Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
    };

    let status_raw = text(16)?;
    let status = status_raw.parse::<FormStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            16,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })?;

    Ok(FormRecord {
        user_id: UserId(row.get(0)?),
        citizenship: text(1)?,
        age: text(2)?,
        fullname: text(3)?,
        city: text(4)?,
        address: text(5)?,
        bad_habits: text(6)?,
        username: text(7)?,
        travel: text(8)?,
        license: text(9)?,
        phone: text(10)?,
        passport: text(11)?,
        experience: text(12)?,
        passport_front: text(13)?,
        passport_back: text(14)?,
        selfie: text(15)?,
        status,
        created_at: read_timestamp(row, 17)?,
    })
}
