//! Durable records of jobs that have not been delivered yet.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::core::error::AppResult;
use crate::storage::db::{get_connection, DbPool};

/// A pending job, keyed by its source URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub url: String,
    pub chat_id: i64,
    pub thread_id: Option<i32>,
    pub username: String,
    pub message_id: i32,
    /// When the last failed attempt finished
    pub last_processed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            url: row.get("url")?,
            chat_id: row.get("chat_id")?,
            thread_id: row.get("thread_id")?,
            username: row.get("username")?,
            message_id: row.get("message_id")?,
            last_processed_at: row.get("last_processed_at")?,
        })
    }
}

/// Storage for pending job records.
///
/// `save` is an upsert keyed by URL, so concurrent writers converge on the last write.
pub trait JobRecordStore: Send + Sync {
    fn save(&self, record: &JobRecord) -> AppResult<()>;
    fn load_all(&self) -> AppResult<Vec<JobRecord>>;
    fn get(&self, url: &str) -> AppResult<Option<JobRecord>>;
    /// Removes the record, returning whether one existed.
    fn remove(&self, url: &str) -> AppResult<bool>;
}

/// SQLite-backed [`JobRecordStore`].
#[derive(Clone)]
pub struct SqliteJobStore {
    pool: Arc<DbPool>,
}

impl SqliteJobStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl JobRecordStore for SqliteJobStore {
    fn save(&self, record: &JobRecord) -> AppResult<()> {
        let conn = get_connection(&self.pool)?;
        conn.execute(
            "INSERT INTO job_records (url, chat_id, thread_id, username, message_id, last_processed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(url) DO UPDATE SET
                chat_id = excluded.chat_id,
                thread_id = excluded.thread_id,
                username = excluded.username,
                message_id = excluded.message_id,
                last_processed_at = excluded.last_processed_at",
            params![
                record.url,
                record.chat_id,
                record.thread_id,
                record.username,
                record.message_id,
                record.last_processed_at,
            ],
        )?;
        Ok(())
    }

    fn load_all(&self) -> AppResult<Vec<JobRecord>> {
        let conn = get_connection(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT url, chat_id, thread_id, username, message_id, last_processed_at
             FROM job_records
             ORDER BY last_processed_at IS NULL, last_processed_at, url",
        )?;
        let rows = stmt.query_map([], JobRecord::from_row)?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn get(&self, url: &str) -> AppResult<Option<JobRecord>> {
        let conn = get_connection(&self.pool)?;
        let record = conn
            .query_row(
                "SELECT url, chat_id, thread_id, username, message_id, last_processed_at
                 FROM job_records WHERE url = ?1",
                [url],
                JobRecord::from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn remove(&self, url: &str) -> AppResult<bool> {
        let conn = get_connection(&self.pool)?;
        let removed = conn.execute("DELETE FROM job_records WHERE url = ?1", [url])?;
        Ok(removed > 0)
    }
}
