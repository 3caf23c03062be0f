//! Common test utilities
//!
//! This module is shared across all integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use reelgrab::core::retry::RetryPolicy;
use reelgrab::download::browser::{LaunchOptions, SessionTimeouts, TimedBrowserSession};
use reelgrab::download::provider::BrowserProvider;
use reelgrab::download::scrapers::{
    IgramScraper, ScraperWaits, SiteScraper, SnapinstaScraper, SssInstagramScraper, SsstikScraper,
};
use reelgrab::download::{FallbackChain, MediaResolver, Platform, ProviderRegistry, Route};
use reelgrab::testing::browser::FakeLauncher;
use teloxide::Bot;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const CHAT_ID: i64 = 123456789;

/// Waits short enough that a missing element fails a test in milliseconds
pub fn fast_waits() -> ScraperWaits {
    ScraperWaits {
        selector: Duration::from_millis(30),
        consent: Duration::from_millis(5),
        intercept: Duration::from_millis(200),
    }
}

pub fn fast_session(launcher: Arc<FakeLauncher>) -> TimedBrowserSession {
    TimedBrowserSession::new(launcher, LaunchOptions::default())
        .with_timeouts(SessionTimeouts {
            launch: Duration::from_millis(200),
            page: Duration::from_millis(200),
            driver: Duration::from_secs(2),
        })
        .with_retry(RetryPolicy::once())
}

fn provider(scraper: impl SiteScraper + 'static, session: &TimedBrowserSession) -> Arc<dyn MediaResolver> {
    Arc::new(BrowserProvider::new(Arc::new(scraper), session.clone()))
}

/// The production provider layout (Instagram chain, TikTok) with test timings.
pub fn scraped_registry(launcher: Arc<FakeLauncher>) -> ProviderRegistry {
    let session = fast_session(launcher);
    let once = RetryPolicy::new(1, Duration::ZERO);

    let instagram = FallbackChain::new(vec![
        provider(SssInstagramScraper::default().with_waits(fast_waits()).with_retry(once), &session),
        provider(IgramScraper::default().with_waits(fast_waits()).with_retry(once), &session),
        provider(SnapinstaScraper::default().with_waits(fast_waits()).with_retry(once), &session),
    ]);
    let tiktok = provider(
        SsstikScraper::default()
            .with_waits(fast_waits())
            .with_retry(RetryPolicy::new(3, Duration::from_millis(1))),
        &session,
    );

    ProviderRegistry::new()
        .with_route(Platform::Instagram, Route::Scraped(Arc::new(instagram)))
        .with_route(Platform::TikTok, Route::Scraped(tiktok))
}

/// Serves `size` bytes at `path` on a fresh mock server.
pub async fn media_server(path: &str, size: usize) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::path(path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; size]))
        .mount(&server)
        .await;
    server
}

/// Mock Telegram Bot API answering the methods the messenger uses
pub struct TelegramMock {
    server: MockServer,
}

fn message_json(message_id: i32) -> serde_json::Value {
    serde_json::json!({
        "message_id": message_id,
        "date": 1234567890,
        "chat": {
            "id": CHAT_ID,
            "type": "private",
            "first_name": "Test"
        },
        "text": "ok"
    })
}

impl TelegramMock {
    pub async fn start() -> Self {
        let server = MockServer::start().await;

        for api_method in ["sendChatAction", "deleteMessage"] {
            Mock::given(method("POST"))
                .and(path_regex(format!("(?i)/bot[^/]+/{}$", api_method)))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true, "result": true})))
                .mount(&server)
                .await;
        }

        for (api_method, message_id) in [("sendMessage", 501), ("editMessageText", 501), ("sendVideo", 502), ("sendPhoto", 503)] {
            Mock::given(method("POST"))
                .and(path_regex(format!("(?i)/bot[^/]+/{}$", api_method)))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(serde_json::json!({"ok": true, "result": message_json(message_id)})),
                )
                .mount(&server)
                .await;
        }

        Self { server }
    }

    /// Create a Bot instance that uses this mock server
    pub fn create_bot(&self) -> anyhow::Result<Bot> {
        let bot = Bot::new("test_token_12345:ABCDEF").set_api_url(self.server.uri().parse()?);
        Ok(bot)
    }

    /// Bot API method names in call order, lowercased (teloxide sends `SendMessage`)
    pub async fn calls(&self) -> Vec<String> {
        self.requests()
            .await
            .iter()
            .filter_map(|r| r.url.path().rsplit('/').next().map(str::to_lowercase))
            .collect()
    }

    /// Body of the first call to `api_method` (any case), as lossy text
    pub async fn body_of(&self, api_method: &str) -> Option<String> {
        self.requests()
            .await
            .into_iter()
            .find(|r| {
                r.url
                    .path()
                    .to_lowercase()
                    .ends_with(&format!("/{}", api_method.to_lowercase()))
            })
            .map(|r| String::from_utf8_lossy(&r.body).to_string())
    }

    async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}
