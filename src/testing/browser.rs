//! Scripted browser for scraper and session tests.
//!
//! A [`FakePage`] is a tiny DOM: a map of selectors to `href`/text values, a set of
//! visible selectors, navigation redirects and canned JSON responses. It records the
//! mutating calls it receives (navigation, viewport, fill, click, response watches)
//! so tests can assert on the order a scraper drove the page.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;

use crate::core::error::{AppError, AppResult};
use crate::core::timeout::timed_out;
use crate::download::browser::{BrowserHandle, BrowserLauncher, JsonResponse, LaunchOptions, ScrapePage};

/// A recorded page interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageAction {
    Goto(String),
    Viewport(u32, u32),
    Fill(String, String),
    Click(String),
    Watch(String),
}

#[derive(Debug, Clone, Default)]
struct FakeElement {
    href: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Default)]
struct PageState {
    elements: HashMap<String, FakeElement>,
    visible: HashSet<String>,
    redirects: HashMap<String, String>,
    responses: Vec<(String, serde_json::Value)>,
    current_url: String,
    actions: Vec<PageAction>,
}

/// Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    state: Arc<Mutex<PageState>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an element matching `selector`.
    #[must_use]
    pub fn with_element(self, selector: &str, href: Option<&str>, text: Option<&str>) -> Self {
        self.lock().elements.insert(
            selector.to_string(),
            FakeElement {
                href: href.map(str::to_string),
                text: text.map(str::to_string),
            },
        );
        self
    }

    /// Marks `selector` as a visible element.
    #[must_use]
    pub fn with_visible(self, selector: &str) -> Self {
        {
            let mut state = self.lock();
            state.visible.insert(selector.to_string());
            state.elements.entry(selector.to_string()).or_default();
        }
        self
    }

    /// Navigating to `from` lands on `to`.
    #[must_use]
    pub fn with_redirect(self, from: &str, to: &str) -> Self {
        self.lock().redirects.insert(from.to_string(), to.to_string());
        self
    }

    /// A watched response whose URL contains `url_fragment` resolves to `body`.
    #[must_use]
    pub fn with_json_response(self, url_fragment: &str, body: serde_json::Value) -> Self {
        self.lock().responses.push((url_fragment.to_string(), body));
        self
    }

    pub fn actions(&self) -> Vec<PageAction> {
        self.lock().actions.clone()
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, action: PageAction) {
        self.lock().actions.push(action);
    }

    fn element(&self, selector: &str) -> Option<FakeElement> {
        self.lock().elements.get(selector).cloned()
    }
}

#[async_trait]
impl ScrapePage for FakePage {
    async fn goto(&self, url: &str) -> AppResult<()> {
        let mut state = self.lock();
        state.actions.push(PageAction::Goto(url.to_string()));
        state.current_url = state.redirects.get(url).cloned().unwrap_or_else(|| url.to_string());
        Ok(())
    }

    async fn set_viewport(&self, width: u32, height: u32) -> AppResult<()> {
        self.record(PageAction::Viewport(width, height));
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> AppResult<()> {
        self.record(PageAction::Fill(selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn click(&self, selector: &str) -> AppResult<()> {
        self.record(PageAction::Click(selector.to_string()));
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> AppResult<()> {
        if self.element(selector).is_some() {
            return Ok(());
        }
        tokio::time::sleep(timeout).await;
        Err(timed_out(&format!("waiting for {}", selector), timeout))
    }

    async fn attribute(&self, selector: &str, name: &str) -> AppResult<Option<String>> {
        let element = self.element(selector);
        Ok(match name {
            "href" => element.and_then(|e| e.href),
            _ => None,
        })
    }

    async fn text_content(&self, selector: &str) -> AppResult<Option<String>> {
        Ok(self.element(selector).and_then(|e| e.text))
    }

    async fn is_visible(&self, selector: &str) -> AppResult<bool> {
        Ok(self.lock().visible.contains(selector))
    }

    async fn current_url(&self) -> AppResult<String> {
        Ok(self.lock().current_url.clone())
    }

    async fn watch_json_response(&self, url_fragment: &str) -> AppResult<JsonResponse> {
        let body = {
            let mut state = self.lock();
            state.actions.push(PageAction::Watch(url_fragment.to_string()));
            state
                .responses
                .iter()
                .find(|(key, _)| url_fragment.contains(key.as_str()) || key.contains(url_fragment))
                .map(|(_, body)| body.clone())
        };

        Ok(match body {
            Some(body) => futures_util::future::ready(Ok(body)).boxed(),
            None => futures_util::future::pending().boxed(),
        })
    }
}

/// Launcher handing out browsers that serve one shared [`FakePage`].
pub struct FakeLauncher {
    page: Option<FakePage>,
    launch_delays: Mutex<VecDeque<Duration>>,
    pub launches: AtomicU32,
    pub closes: Arc<AtomicU32>,
}

impl FakeLauncher {
    pub fn new(page: FakePage) -> Self {
        Self {
            page: Some(page),
            launch_delays: Mutex::new(VecDeque::new()),
            launches: AtomicU32::new(0),
            closes: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Every launch fails with a browser error.
    pub fn failing() -> Self {
        Self {
            page: None,
            ..Self::new(FakePage::new())
        }
    }

    /// The n-th launch sleeps for the n-th delay before succeeding.
    #[must_use]
    pub fn with_launch_delays(self, delays: Vec<Duration>) -> Self {
        *self.launch_delays.lock().unwrap_or_else(|p| p.into_inner()) = delays.into();
        self
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, _options: &LaunchOptions) -> AppResult<Box<dyn BrowserHandle>> {
        self.launches.fetch_add(1, Ordering::SeqCst);

        let delay = self.launch_delays.lock().unwrap_or_else(|p| p.into_inner()).pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.page {
            Some(ref page) => Ok(Box::new(FakeBrowser {
                page: page.clone(),
                closes: Arc::clone(&self.closes),
            })),
            None => Err(AppError::Browser("failed to launch browser".to_string())),
        }
    }
}

struct FakeBrowser {
    page: FakePage,
    closes: Arc<AtomicU32>,
}

#[async_trait]
impl BrowserHandle for FakeBrowser {
    async fn new_page(&self) -> AppResult<Arc<dyn ScrapePage>> {
        Ok(Arc::new(self.page.clone()))
    }

    async fn close(&mut self) -> AppResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
