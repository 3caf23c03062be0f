//! Turns incoming chat messages into jobs.

use teloxide::types::Message;

use crate::download::job::Job;
use crate::download::platform::Platform;

/// Punctuation a link is often wrapped in or followed by in chat text.
const WRAPPING: &[char] = &['(', ')', '[', ']', '<', '>', '{', '}', '"', '\'', '«', '»', ',', '.', ';', '!', '?'];

/// First whitespace-separated token that is a supported link, without surrounding punctuation.
pub fn extract_link(text: &str) -> Option<&str> {
    text.split_whitespace()
        .map(|token| token.trim_matches(WRAPPING))
        .find(|token| Platform::classify(token).is_some())
}

/// An empty allow-list lets every chat through.
pub fn is_chat_allowed(chat_id: i64, allowed: &[i64]) -> bool {
    allowed.is_empty() || allowed.contains(&chat_id)
}

/// Raw fields of an incoming message.
#[derive(Debug, Clone, Copy)]
pub struct Incoming<'a> {
    pub text: &'a str,
    pub chat_id: i64,
    pub thread_id: Option<i32>,
    pub username: Option<&'a str>,
    pub message_id: i32,
}

impl<'a> Incoming<'a> {
    pub fn from_message(msg: &'a Message) -> Option<Self> {
        Some(Self {
            text: msg.text()?,
            chat_id: msg.chat.id.0,
            thread_id: msg
                .thread_id
                .filter(|_| msg.is_topic_message)
                .map(|thread| thread.0 .0),
            username: msg.from.as_ref().and_then(|user| user.username.as_deref()),
            message_id: msg.id.0,
        })
    }

    /// The job for this message, or `None` when it should be ignored silently.
    pub fn into_job(self, allowed: &[i64]) -> Option<Job> {
        let url = extract_link(self.text)?;
        if !is_chat_allowed(self.chat_id, allowed) {
            log::debug!("Ignoring link from chat {} (not in VALID_CHAT_IDS)", self.chat_id);
            return None;
        }
        let username = self.username.filter(|name| !name.is_empty()).unwrap_or("unknown");
        log::info!("Received link {} from @{} in chat {}", url, username, self.chat_id);
        Job::new(url, self.chat_id, self.thread_id, username, self.message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn incoming<'a>(text: &'a str, username: Option<&'a str>) -> Incoming<'a> {
        Incoming {
            text,
            chat_id: -100,
            thread_id: Some(4),
            username,
            message_id: 11,
        }
    }

    #[test]
    fn test_extract_link_takes_first_supported_token() {
        assert_eq!(
            extract_link("look https://example.com then https://vm.tiktok.com/ZM1/ and https://youtube.com/shorts/x"),
            Some("https://vm.tiktok.com/ZM1/")
        );
        assert_eq!(extract_link("nothing here"), None);
    }

    #[test]
    fn test_extract_link_strips_wrapping_punctuation() {
        assert_eq!(
            extract_link("see (https://www.instagram.com/reel/x/)!"),
            Some("https://www.instagram.com/reel/x/")
        );
        assert_eq!(
            extract_link("\"https://vm.tiktok.com/ZM1/\", thanks."),
            Some("https://vm.tiktok.com/ZM1/")
        );
        assert_eq!(extract_link("https://youtube.com/shorts/abc."), Some("https://youtube.com/shorts/abc"));
    }

    #[test]
    fn test_chat_allow_list() {
        assert!(is_chat_allowed(5, &[]));
        assert!(is_chat_allowed(5, &[1, 5]));
        assert!(!is_chat_allowed(6, &[1, 5]));
    }

    #[test]
    fn test_into_job_fills_fields() {
        let job = incoming("https://www.instagram.com/reel/C1/", Some("alice"))
            .into_job(&[])
            .expect("job");
        assert_eq!(job.chat_id, -100);
        assert_eq!(job.thread_id, Some(4));
        assert_eq!(job.username, "alice");
        assert_eq!(job.message_id, 11);
        assert_eq!(job.platform, Platform::Instagram);
    }

    #[test]
    fn test_into_job_defaults_username_and_respects_allow_list() {
        let job = incoming("https://vm.tiktok.com/ZM1/", None).into_job(&[-100]).expect("job");
        assert_eq!(job.username, "unknown");
        assert!(incoming("https://vm.tiktok.com/ZM1/", None).into_job(&[1]).is_none());
        assert!(incoming("just chatting", Some("bob")).into_job(&[]).is_none());
    }
}
