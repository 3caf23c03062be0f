//! teloxide implementation of the chat-side [`Messenger`] boundary.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InputFile, MessageId, ReplyParameters, ThreadId};

use crate::core::error::AppResult;
use crate::download::delivery::{ChatTarget, Messenger};
use crate::download::job::DownloadResult;
use crate::download::platform::MediaKind;
use crate::telegram::Bot;

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn thread(target: ChatTarget) -> Option<ThreadId> {
    target.thread_id.map(|id| ThreadId(MessageId(id)))
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn announce_upload(&self, target: ChatTarget, kind: MediaKind) -> AppResult<()> {
        let action = match kind {
            MediaKind::Video => ChatAction::UploadVideo,
            MediaKind::Image => ChatAction::UploadPhoto,
        };
        let mut request = self.bot.send_chat_action(ChatId(target.chat_id), action);
        if let Some(thread_id) = thread(target) {
            request = request.message_thread_id(thread_id);
        }
        request.await?;
        Ok(())
    }

    async fn send_media(&self, target: ChatTarget, media: &DownloadResult, caption: Option<&str>) -> AppResult<()> {
        let chat_id = ChatId(target.chat_id);
        let file = InputFile::file(media.path.clone());
        log::info!("Sending {} ({} bytes) to chat {}", media.kind, media.size, target.chat_id);

        match media.kind {
            MediaKind::Video => {
                let mut request = self.bot.send_video(chat_id, file).supports_streaming(true);
                if let Some(caption) = caption {
                    request = request.caption(caption);
                }
                if let Some(thread_id) = thread(target) {
                    request = request.message_thread_id(thread_id);
                }
                request.await?;
            }
            MediaKind::Image => {
                let mut request = self.bot.send_photo(chat_id, file);
                if let Some(caption) = caption {
                    request = request.caption(caption);
                }
                if let Some(thread_id) = thread(target) {
                    request = request.message_thread_id(thread_id);
                }
                request.await?;
            }
        }
        Ok(())
    }

    async fn send_text(&self, target: ChatTarget, text: &str, reply_to: Option<i32>) -> AppResult<i32> {
        let mut request = self.bot.send_message(ChatId(target.chat_id), text);
        if let Some(thread_id) = thread(target) {
            request = request.message_thread_id(thread_id);
        }
        if let Some(reply_to) = reply_to {
            request = request.reply_parameters(ReplyParameters::new(MessageId(reply_to)).allow_sending_without_reply());
        }
        let message = request.await?;
        Ok(message.id.0)
    }

    async fn edit_text(&self, chat_id: i64, message_id: i32, text: &str) -> AppResult<()> {
        self.bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id), text)
            .await?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> AppResult<()> {
        self.bot.delete_message(ChatId(chat_id), MessageId(message_id)).await?;
        Ok(())
    }
}
