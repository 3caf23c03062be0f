//! Chromium backend over the DevTools protocol (chromiumoxide).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    self, EventLoadingFinished, EventResponseReceived, GetResponseBodyParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures_util::StreamExt;
use tokio::task::JoinHandle;

use super::{BrowserHandle, BrowserLauncher, JsonResponse, LaunchOptions, ScrapePage};
use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::timeout::timed_out;

fn cdp(err: CdpError) -> AppError {
    AppError::Browser(err.to_string())
}

/// JSON-encodes a selector so it can be embedded in page scripts.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Launches local Chromium processes.
#[derive(Debug, Default, Clone)]
pub struct ChromiumLauncher;

impl ChromiumLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, options: &LaunchOptions) -> AppResult<Box<dyn BrowserHandle>> {
        let mut builder = BrowserConfig::builder()
            .launch_timeout(options.startup_timeout)
            .request_timeout(config::browser::page_timeout());

        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(ref path) = options.executable {
            builder = builder.chrome_executable(path);
        }
        for arg in &options.args {
            builder = builder.arg(arg.as_str());
        }

        let browser_config = builder
            .build()
            .map_err(|e| AppError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(cdp)?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    log::debug!("Browser handler error: {}", e);
                }
            }
        });

        Ok(Box::new(ChromiumBrowser {
            browser,
            handler,
            poll_interval: config::browser::poll_interval(),
        }))
    }
}

/// A running Chromium process plus its CDP event loop.
pub struct ChromiumBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
    poll_interval: Duration,
}

#[async_trait]
impl BrowserHandle for ChromiumBrowser {
    async fn new_page(&self) -> AppResult<Arc<dyn ScrapePage>> {
        let page = self.browser.new_page("about:blank").await.map_err(cdp)?;
        Ok(Arc::new(ChromiumPage {
            page,
            poll_interval: self.poll_interval,
        }))
    }

    async fn close(&mut self) -> AppResult<()> {
        let closed = self.browser.close().await.map(|_| ()).map_err(cdp);
        if closed.is_err() {
            // The process may be wedged; make sure it does not outlive the run
            if let Some(Err(e)) = self.browser.kill().await {
                log::warn!("Failed to kill browser process: {}", e);
            }
        }
        if let Err(e) = self.browser.wait().await {
            log::debug!("Waiting for browser exit failed: {}", e);
        }
        self.handler.abort();
        closed
    }
}

/// One Chromium tab.
pub struct ChromiumPage {
    page: Page,
    poll_interval: Duration,
}

impl ChromiumPage {
    async fn eval_bool(&self, script: String) -> AppResult<bool> {
        self.page
            .evaluate(script)
            .await
            .map_err(cdp)?
            .into_value::<bool>()
            .map_err(|e| AppError::Browser(format!("Unexpected script result: {}", e)))
    }
}

#[async_trait]
impl ScrapePage for ChromiumPage {
    async fn goto(&self, url: &str) -> AppResult<()> {
        self.page.goto(url).await.map_err(cdp)?;
        Ok(())
    }

    async fn set_viewport(&self, width: u32, height: u32) -> AppResult<()> {
        self.page
            .execute(SetDeviceMetricsOverrideParams::new(
                i64::from(width),
                i64::from(height),
                1.0,
                false,
            ))
            .await
            .map_err(cdp)?;
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> AppResult<()> {
        let element = self.page.find_element(selector).await.map_err(cdp)?;
        element
            .call_js_fn("function() { this.value = ''; }", false)
            .await
            .map_err(cdp)?;
        element.click().await.map_err(cdp)?;
        element.type_str(text).await.map_err(cdp)?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> AppResult<()> {
        let element = self.page.find_element(selector).await.map_err(cdp)?;
        element.click().await.map_err(cdp)?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> AppResult<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(timed_out(&format!("waiting for {}", selector), timeout));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn attribute(&self, selector: &str, name: &str) -> AppResult<Option<String>> {
        let element = self.page.find_element(selector).await.map_err(cdp)?;
        element.attribute(name).await.map_err(cdp)
    }

    async fn text_content(&self, selector: &str) -> AppResult<Option<String>> {
        let element = self.page.find_element(selector).await.map_err(cdp)?;
        element.inner_text().await.map_err(cdp)
    }

    async fn is_visible(&self, selector: &str) -> AppResult<bool> {
        let script = format!(
            "(() => {{
                const el = document.querySelector({});
                if (!el) return false;
                const style = window.getComputedStyle(el);
                const rect = el.getBoundingClientRect();
                return style.display !== 'none' && style.visibility !== 'hidden' && rect.width > 0 && rect.height > 0;
            }})()",
            js_string(selector)
        );
        self.eval_bool(script).await
    }

    async fn current_url(&self) -> AppResult<String> {
        self.page
            .url()
            .await
            .map_err(cdp)?
            .ok_or_else(|| AppError::Browser("page has no URL".to_string()))
    }

    async fn watch_json_response(&self, url_fragment: &str) -> AppResult<JsonResponse> {
        self.page
            .execute(network::EnableParams::default())
            .await
            .map_err(cdp)?;
        let mut responses = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(cdp)?;
        let mut finished = self
            .page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(cdp)?;

        let page = self.page.clone();
        let fragment = url_fragment.to_string();

        Ok(Box::pin(async move {
            let request_id = loop {
                match responses.next().await {
                    Some(event)
                        if event.response.url.contains(&fragment) && (200..300).contains(&event.response.status) =>
                    {
                        log::debug!("Intercepted {} ({})", event.response.url, event.response.status);
                        break event.request_id.clone();
                    }
                    Some(_) => continue,
                    None => return Err(AppError::Browser("page closed before the response arrived".to_string())),
                }
            };

            loop {
                match finished.next().await {
                    Some(event) if event.request_id == request_id => break,
                    Some(_) => continue,
                    None => return Err(AppError::Browser("page closed while loading the response".to_string())),
                }
            }

            let body = page
                .execute(GetResponseBodyParams::new(request_id))
                .await
                .map_err(cdp)?;
            if body.result.base64_encoded {
                return Err(AppError::Validation(format!("{} returned a binary body", fragment)));
            }
            serde_json::from_str(&body.result.body)
                .map_err(|e| AppError::Validation(format!("{} returned invalid JSON: {}", fragment, e)))
        }))
    }
}
