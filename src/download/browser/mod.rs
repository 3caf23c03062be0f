//! Timed headless-browser sessions.
//!
//! Scrapers never talk to Chromium directly. They receive a [`ScrapePage`] from a
//! [`TimedBrowserSession`], which owns the browser for exactly one provider run:
//! - launch and page creation are raced against a timeout and retried
//! - the page is navigated to the provider site with a fixed viewport
//! - the driver runs under an overall timeout with panics contained
//! - the browser is closed exactly once before the run returns, whatever happened

pub mod chromium;

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::core::config;
use crate::core::error::{panic_message, AppError, AppResult};
use crate::core::retry::{retry, RetryPolicy};
use crate::core::timeout::race;
use crate::download::error::ResolveError;
use crate::download::platform::ResolvedMedia;

pub use chromium::ChromiumLauncher;

/// Pending body of an intercepted JSON response.
pub type JsonResponse = BoxFuture<'static, AppResult<serde_json::Value>>;

/// The page operations scrapers are allowed to use.
#[async_trait]
pub trait ScrapePage: Send + Sync {
    async fn goto(&self, url: &str) -> AppResult<()>;

    async fn set_viewport(&self, width: u32, height: u32) -> AppResult<()>;

    /// Replaces the value of an input and types `text` into it.
    async fn fill(&self, selector: &str, text: &str) -> AppResult<()>;

    async fn click(&self, selector: &str) -> AppResult<()>;

    /// Waits until `selector` matches an element. Fails with `AppError::Timeout`.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> AppResult<()>;

    async fn attribute(&self, selector: &str, name: &str) -> AppResult<Option<String>>;

    async fn text_content(&self, selector: &str) -> AppResult<Option<String>>;

    async fn is_visible(&self, selector: &str) -> AppResult<bool>;

    async fn current_url(&self) -> AppResult<String>;

    /// Starts listening for the first successful response whose URL contains
    /// `url_fragment` and returns a future resolving to its JSON body.
    ///
    /// Must be called before the action that triggers the request.
    async fn watch_json_response(&self, url_fragment: &str) -> AppResult<JsonResponse>;
}

/// A running browser process.
#[async_trait]
pub trait BrowserHandle: Send + Sync {
    async fn new_page(&self) -> AppResult<Arc<dyn ScrapePage>>;

    /// Shuts the process down. Called exactly once per handle.
    async fn close(&mut self) -> AppResult<()>;
}

/// Starts browser processes.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> AppResult<Box<dyn BrowserHandle>>;
}

/// How to start Chromium.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub executable: Option<String>,
    pub args: Vec<String>,
    pub headless: bool,
    pub startup_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            executable: None,
            args: config::browser::LAUNCH_ARGS.iter().map(|a| a.to_string()).collect(),
            headless: true,
            startup_timeout: config::browser::launch_timeout(),
        }
    }
}

impl LaunchOptions {
    /// Options built from the environment configuration.
    pub fn from_env() -> Self {
        Self {
            executable: config::CHROMIUM_EXECUTABLE_PATH.clone(),
            ..Self::default()
        }
    }
}

/// Time limits for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    pub launch: Duration,
    pub page: Duration,
    pub driver: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            launch: config::browser::launch_timeout(),
            page: config::browser::page_timeout(),
            driver: config::browser::driver_timeout(),
        }
    }
}

/// Owns browser lifecycles for provider runs.
#[derive(Clone)]
pub struct TimedBrowserSession {
    launcher: Arc<dyn BrowserLauncher>,
    options: LaunchOptions,
    timeouts: SessionTimeouts,
    retry: RetryPolicy,
    viewport: (u32, u32),
}

impl TimedBrowserSession {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, options: LaunchOptions) -> Self {
        Self {
            launcher,
            options,
            timeouts: SessionTimeouts::default(),
            retry: RetryPolicy::browser(),
            viewport: (config::browser::VIEWPORT_WIDTH, config::browser::VIEWPORT_HEIGHT),
        }
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeouts: SessionTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Launches a browser, racing each attempt against the startup timeout.
    pub async fn launch(&self) -> AppResult<Box<dyn BrowserHandle>> {
        retry(&self.retry, || {
            race(self.timeouts.launch, "browser launch", self.launcher.launch(&self.options))
        })
        .await
    }

    async fn open_page(&self, browser: &dyn BrowserHandle) -> AppResult<Arc<dyn ScrapePage>> {
        retry(&self.retry, || race(self.timeouts.page, "page creation", browser.new_page())).await
    }

    /// Runs `driver` against a fresh page pointed at `base_url`.
    ///
    /// `Ok(None)` from the driver means the provider had nothing for this link and
    /// becomes [`ResolveError::NotFound`]. The browser is closed before returning on
    /// every path, including driver errors, timeouts and panics.
    pub async fn download<F, Fut>(&self, provider: &str, base_url: &str, driver: F) -> Result<ResolvedMedia, ResolveError>
    where
        F: FnOnce(Arc<dyn ScrapePage>) -> Fut + Send,
        Fut: Future<Output = AppResult<Option<ResolvedMedia>>> + Send,
    {
        let mut browser = self.launch().await.map_err(ResolveError::from)?;
        log::debug!("[{}] browser launched", provider);

        let outcome = self.drive(browser.as_ref(), provider, base_url, driver).await;

        if let Err(e) = browser.close().await {
            log::warn!("[{}] failed to close browser: {}", provider, e);
        } else {
            log::debug!("[{}] browser closed", provider);
        }

        outcome
    }

    async fn drive<F, Fut>(
        &self,
        browser: &dyn BrowserHandle,
        provider: &str,
        base_url: &str,
        driver: F,
    ) -> Result<ResolvedMedia, ResolveError>
    where
        F: FnOnce(Arc<dyn ScrapePage>) -> Fut + Send,
        Fut: Future<Output = AppResult<Option<ResolvedMedia>>> + Send,
    {
        let page = self.open_page(browser).await?;
        page.goto(base_url).await?;
        page.set_viewport(self.viewport.0, self.viewport.1).await?;
        log::debug!("[{}] opened {}", provider, base_url);

        let guarded = async move {
            match AssertUnwindSafe(driver(page)).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(AppError::Resolve(ResolveError::Fatal(format!(
                    "{} driver panicked: {}",
                    provider,
                    panic_message(payload.as_ref())
                )))),
            }
        };

        match race(self.timeouts.driver, &format!("{} driver", provider), guarded).await {
            Ok(Some(media)) => Ok(media),
            Ok(None) => Err(ResolveError::NotFound(provider.to_string())),
            Err(e) => Err(ResolveError::from(e)),
        }
    }
}

/// Waits for `selector` with the given timeout.
pub async fn wait_for(page: &dyn ScrapePage, selector: &str, timeout: Duration) -> AppResult<()> {
    page.wait_for_selector(selector, timeout).await
}

/// Clicks the cookie-consent button if it shows up within the timeout.
///
/// Best effort: absence of the dialog is the common case and is not an error.
pub async fn dismiss_consent(page: &dyn ScrapePage, selector: &str, timeout: Duration) {
    match page.wait_for_selector(selector, timeout).await {
        Ok(()) => match page.click(selector).await {
            Ok(()) => log::debug!("Dismissed consent dialog ({})", selector),
            Err(e) => log::debug!("Consent dialog present but click failed: {}", e),
        },
        Err(_) => log::debug!("No consent dialog ({})", selector),
    }
}

/// Closes an advertising overlay if it is currently visible.
pub async fn dismiss_ad(page: &dyn ScrapePage, overlay: &str, close_button: &str) {
    if matches!(page.is_visible(overlay).await, Ok(true)) {
        match page.click(close_button).await {
            Ok(()) => log::debug!("Closed ad overlay ({})", overlay),
            Err(e) => log::debug!("Ad overlay visible but close failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::platform::MediaKind;
    use crate::testing::browser::{FakeLauncher, FakePage, PageAction};
    use std::sync::atomic::Ordering;

    fn quick_session(launcher: Arc<FakeLauncher>) -> TimedBrowserSession {
        TimedBrowserSession::new(launcher, LaunchOptions::default())
            .with_timeouts(SessionTimeouts {
                launch: Duration::from_millis(100),
                page: Duration::from_millis(100),
                driver: Duration::from_millis(200),
            })
            .with_retry(RetryPolicy::new(2, Duration::from_millis(5)))
    }

    #[tokio::test]
    async fn test_download_returns_driver_result_and_closes_once() {
        let page = FakePage::new();
        let launcher = Arc::new(FakeLauncher::new(page.clone()));
        let session = quick_session(launcher.clone());

        let result = session
            .download("fake", "https://provider.test/", |_page| async {
                Ok(Some(ResolvedMedia::new("https://cdn.test/v.mp4", MediaKind::Video)))
            })
            .await;

        assert_eq!(result.ok().map(|m| m.url), Some("https://cdn.test/v.mp4".to_string()));
        assert_eq!(launcher.closes.load(Ordering::SeqCst), 1);
        assert_eq!(
            page.actions()[..2],
            [
                PageAction::Goto("https://provider.test/".to_string()),
                PageAction::Viewport(1080, 1024)
            ]
        );
    }

    #[tokio::test]
    async fn test_driver_error_closes_browser_before_propagating() {
        let launcher = Arc::new(FakeLauncher::new(FakePage::new()));
        let session = quick_session(launcher.clone());

        let result = session
            .download("fake", "https://provider.test/", |_page| async {
                Err(AppError::Browser("selector vanished".into()))
            })
            .await;

        assert!(matches!(result, Err(ResolveError::Transient(_))));
        assert_eq!(launcher.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_driver_without_media_is_not_found() {
        let launcher = Arc::new(FakeLauncher::new(FakePage::new()));
        let session = quick_session(launcher.clone());

        let result = session.download("fake", "https://p/", |_page| async { Ok(None) }).await;

        assert!(matches!(result, Err(ResolveError::NotFound(name)) if name == "fake"));
        assert_eq!(launcher.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_driver_panic_is_contained() {
        let launcher = Arc::new(FakeLauncher::new(FakePage::new()));
        let session = quick_session(launcher.clone());

        let result = session
            .download("fake", "https://p/", |_page| async {
                if true {
                    panic!("driver bug");
                }
                Ok(None)
            })
            .await;

        assert!(matches!(result, Err(ResolveError::Fatal(msg)) if msg.contains("driver bug")));
        assert_eq!(launcher.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_driver_times_out_and_closes() {
        let launcher = Arc::new(FakeLauncher::new(FakePage::new()));
        let session = quick_session(launcher.clone());

        let result = session
            .download("fake", "https://p/", |_page| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(None)
            })
            .await;

        assert!(matches!(result, Err(ResolveError::Transient(msg)) if msg.contains("fake driver timed out")));
        assert_eq!(launcher.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_launch_is_retried_after_timeout() {
        let launcher = Arc::new(FakeLauncher::new(FakePage::new()).with_launch_delays(vec![Duration::from_secs(5)]));
        let session = quick_session(launcher.clone());

        let result = session.download("fake", "https://p/", |_page| async { Ok(None) }).await;

        assert!(matches!(result, Err(ResolveError::NotFound(_))));
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 2);
        assert_eq!(launcher.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_launch_failure_is_transient_and_nothing_to_close() {
        let launcher = Arc::new(FakeLauncher::failing());
        let session = quick_session(launcher.clone());

        let result = session.download("fake", "https://p/", |_page| async { Ok(None) }).await;

        assert!(matches!(result, Err(ResolveError::Transient(_))));
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 2);
        assert_eq!(launcher.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dismiss_helpers_are_best_effort() {
        let page = FakePage::new().with_element("#consent", None, None).with_visible("#ad");
        dismiss_consent(&page, "#consent", Duration::from_millis(20)).await;
        dismiss_consent(&page, "#missing", Duration::from_millis(20)).await;
        dismiss_ad(&page, "#ad", "#close-ad").await;
        dismiss_ad(&page, "#no-ad", "#close-ad").await;

        let clicks: Vec<_> = page
            .actions()
            .into_iter()
            .filter(|a| matches!(a, PageAction::Click(_)))
            .collect();
        assert_eq!(
            clicks,
            vec![
                PageAction::Click("#consent".to_string()),
                PageAction::Click("#close-ad".to_string())
            ]
        );
    }
}
