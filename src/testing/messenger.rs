//! In-memory [`Messenger`] that records what would have been sent to the chat.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::core::error::{AppError, AppResult};
use crate::download::delivery::{ChatTarget, Messenger};
use crate::download::job::DownloadResult;
use crate::download::platform::MediaKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    ChatAction(ChatTarget, MediaKind),
    Media {
        target: ChatTarget,
        kind: MediaKind,
        size: u64,
        caption: Option<String>,
    },
    Text {
        target: ChatTarget,
        message_id: i32,
        text: String,
        reply_to: Option<i32>,
    },
    Edited(i64, i32, String),
    Deleted(i64, i32),
}

pub struct RecordingMessenger {
    sent: Mutex<Vec<Sent>>,
    next_message_id: AtomicI32,
    fail_media: AtomicBool,
}

impl Default for RecordingMessenger {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            next_message_id: AtomicI32::new(1000),
            fail_media: AtomicBool::new(false),
        }
    }

    /// Makes every following `send_media` call fail.
    pub fn fail_media_uploads(&self) {
        self.fail_media.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.lock().clone()
    }

    /// Texts of all sent and edited messages, in order.
    pub fn texts(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } | Sent::Edited(_, _, text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Sent>> {
        self.sent.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn announce_upload(&self, target: ChatTarget, kind: MediaKind) -> AppResult<()> {
        self.lock().push(Sent::ChatAction(target, kind));
        Ok(())
    }

    async fn send_media(&self, target: ChatTarget, media: &DownloadResult, caption: Option<&str>) -> AppResult<()> {
        if self.fail_media.load(Ordering::SeqCst) {
            return Err(AppError::Download("upload rejected".to_string()));
        }
        self.lock().push(Sent::Media {
            target,
            kind: media.kind,
            size: media.size,
            caption: caption.map(str::to_string),
        });
        Ok(())
    }

    async fn send_text(&self, target: ChatTarget, text: &str, reply_to: Option<i32>) -> AppResult<i32> {
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        self.lock().push(Sent::Text {
            target,
            message_id,
            text: text.to_string(),
            reply_to,
        });
        Ok(message_id)
    }

    async fn edit_text(&self, chat_id: i64, message_id: i32, text: &str) -> AppResult<()> {
        self.lock().push(Sent::Edited(chat_id, message_id, text.to_string()));
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> AppResult<()> {
        self.lock().push(Sent::Deleted(chat_id, message_id));
        Ok(())
    }
}
