//! Units of work flowing through the queue and pipeline.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::download::platform::{MediaKind, Platform};
use crate::storage::jobs::JobRecord;

/// One request to acquire and deliver the media behind a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Source URL as submitted by the user
    pub url: String,
    /// Destination chat
    pub chat_id: i64,
    /// Forum topic inside the chat, if any
    pub thread_id: Option<i32>,
    /// Submitting user, without the leading `@`
    pub username: String,
    /// The message that carried the link (deleted after delivery)
    pub message_id: i32,
    pub platform: Platform,
}

impl Job {
    /// Builds a job for a link, classifying it on the way.
    ///
    /// Returns `None` when the link belongs to no supported platform.
    pub fn new(
        url: impl Into<String>,
        chat_id: i64,
        thread_id: Option<i32>,
        username: impl Into<String>,
        message_id: i32,
    ) -> Option<Self> {
        let url = url.into();
        let platform = Platform::classify(&url)?;
        Some(Self {
            url,
            chat_id,
            thread_id,
            username: username.into(),
            message_id,
            platform,
        })
    }

    /// Rebuilds a job from a stored record.
    ///
    /// `fallback_chat` replaces a missing (zero) chat id, e.g. the chat that issued `/retry`.
    pub fn from_record(record: &JobRecord, fallback_chat: Option<i64>) -> Option<Self> {
        let chat_id = match (record.chat_id, fallback_chat) {
            (0, Some(fallback)) => fallback,
            (id, _) => id,
        };
        let username = if record.username.trim().is_empty() {
            "unknown"
        } else {
            record.username.as_str()
        };
        Self::new(record.url.clone(), chat_id, record.thread_id, username, record.message_id)
    }

    /// Snapshot of this job for the record store.
    pub fn to_record(&self, last_processed_at: Option<DateTime<Utc>>) -> JobRecord {
        JobRecord {
            url: self.url.clone(),
            chat_id: self.chat_id,
            thread_id: self.thread_id,
            username: self.username.clone(),
            message_id: self.message_id,
            last_processed_at,
        }
    }
}

/// A media file saved locally for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub size: u64,
}
