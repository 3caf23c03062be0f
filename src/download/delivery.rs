//! Chat-side boundary of the pipeline.
//!
//! The pipeline and the replay flow only need a handful of chat operations;
//! `telegram::messenger::TelegramMessenger` implements them over teloxide.

use async_trait::async_trait;

use crate::core::error::AppResult;
use crate::download::job::{DownloadResult, Job};
use crate::download::platform::MediaKind;

/// Where a message goes: a chat and, for forum groups, a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatTarget {
    pub chat_id: i64,
    pub thread_id: Option<i32>,
}

impl ChatTarget {
    pub fn new(chat_id: i64, thread_id: Option<i32>) -> Self {
        Self { chat_id, thread_id }
    }
}

impl From<&Job> for ChatTarget {
    fn from(job: &Job) -> Self {
        Self::new(job.chat_id, job.thread_id)
    }
}

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Shows the "uploading video/photo" chat action.
    async fn announce_upload(&self, target: ChatTarget, kind: MediaKind) -> AppResult<()>;

    /// Uploads a local media file as a video or a photo.
    async fn send_media(&self, target: ChatTarget, media: &DownloadResult, caption: Option<&str>) -> AppResult<()>;

    /// Sends a text message and returns its id.
    async fn send_text(&self, target: ChatTarget, text: &str, reply_to: Option<i32>) -> AppResult<i32>;

    async fn edit_text(&self, chat_id: i64, message_id: i32, text: &str) -> AppResult<()>;

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> AppResult<()>;
}

/// Caption attached to delivered media when user captions are enabled.
pub fn user_caption(username: &str) -> String {
    format!("From @{} with 💕", username)
}
