//! Provider abstraction: who turns a user link into media, and in which order.
//!
//! Two kinds of providers exist:
//! - [`MediaResolver`]: returns a direct media URL that the [`MediaFetcher`](super::fetch::MediaFetcher)
//!   then downloads (the scraping sites)
//! - [`MediaDownloader`]: produces the local file itself (yt-dlp)
//!
//! [`ProviderRegistry`] maps each [`Platform`] to one of them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::error::AppResult;
use crate::core::retry::retry;
use crate::download::browser::{BrowserLauncher, LaunchOptions, TimedBrowserSession};
use crate::download::error::ResolveError;
use crate::download::job::DownloadResult;
use crate::download::platform::{Platform, ResolvedMedia};
use crate::download::scrapers::{
    IgramScraper, ScraperProfiles, SiteScraper, SnapinstaScraper, SssInstagramScraper, SsstikScraper,
};
use crate::download::ytdlp::YtDlpDownloader;

/// Resolves a user link to a direct media URL.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    fn name(&self) -> &str;

    async fn resolve(&self, url: &str) -> Result<ResolvedMedia, ResolveError>;
}

/// Downloads a user link straight to `<stem>.<ext>`.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    fn name(&self) -> &str;

    async fn download(&self, url: &str, stem: &Path) -> AppResult<DownloadResult>;
}

/// A scraping site driven through a fresh browser session per attempt.
pub struct BrowserProvider {
    scraper: Arc<dyn SiteScraper>,
    session: TimedBrowserSession,
}

impl BrowserProvider {
    pub fn new(scraper: Arc<dyn SiteScraper>, session: TimedBrowserSession) -> Self {
        Self { scraper, session }
    }
}

#[async_trait]
impl MediaResolver for BrowserProvider {
    fn name(&self) -> &str {
        self.scraper.name()
    }

    async fn resolve(&self, url: &str) -> Result<ResolvedMedia, ResolveError> {
        let policy = self.scraper.retry_policy();
        let base_url = self.scraper.base_url(url);

        retry(&policy, || {
            let scraper = Arc::clone(&self.scraper);
            let url = url.to_string();
            let base_url = base_url.as_str();
            async move {
                let name = scraper.name().to_string();
                self.session
                    .download(&name, base_url, move |page| async move { scraper.drive(page, &url).await })
                    .await
            }
        })
        .await
    }
}

/// Tries resolvers in priority order and returns the first success.
///
/// Failures are logged and swallowed; when every resolver fails the error of the
/// last one is returned.
pub struct FallbackChain {
    resolvers: Vec<Arc<dyn MediaResolver>>,
}

impl FallbackChain {
    pub fn new(resolvers: Vec<Arc<dyn MediaResolver>>) -> Self {
        Self { resolvers }
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

#[async_trait]
impl MediaResolver for FallbackChain {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn resolve(&self, url: &str) -> Result<ResolvedMedia, ResolveError> {
        let mut last_error = ResolveError::Fatal("no providers configured".to_string());

        for resolver in &self.resolvers {
            match resolver.resolve(url).await {
                Ok(media) => {
                    log::info!("[{}] resolved {} to {} ({})", resolver.name(), url, media.url, media.kind);
                    return Ok(media);
                }
                Err(e) => {
                    log::warn!("[{}] failed for {} ({}): {}", resolver.name(), url, e.kind(), e);
                    last_error = e;
                }
            }
        }

        log::error!("All providers failed for {}", url);
        Err(last_error)
    }
}

/// How media for a platform is obtained.
#[derive(Clone)]
pub enum Route {
    /// Resolve a direct URL, then fetch it over HTTP
    Scraped(Arc<dyn MediaResolver>),
    /// Let the provider write the file itself
    Direct(Arc<dyn MediaDownloader>),
}

impl Route {
    pub fn name(&self) -> &str {
        match self {
            Route::Scraped(resolver) => resolver.name(),
            Route::Direct(downloader) => downloader.name(),
        }
    }
}

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    routes: HashMap<Platform, Route>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_route(mut self, platform: Platform, route: Route) -> Self {
        self.routes.insert(platform, route);
        self
    }

    pub fn route(&self, platform: Platform) -> Option<&Route> {
        self.routes.get(&platform)
    }

    /// The production setup:
    /// - Instagram: sssinstagram, then igram, then snapinsta
    /// - TikTok: ssstik alone
    /// - YouTube Shorts: yt-dlp
    pub fn from_profiles(profiles: &ScraperProfiles, session: TimedBrowserSession) -> Self {
        let provider = |scraper: Arc<dyn SiteScraper>| -> Arc<dyn MediaResolver> {
            Arc::new(BrowserProvider::new(scraper, session.clone()))
        };

        let instagram = FallbackChain::new(vec![
            provider(Arc::new(SssInstagramScraper::new(profiles.sssinstagram.clone()))),
            provider(Arc::new(IgramScraper::new(profiles.igram.clone()))),
            provider(Arc::new(SnapinstaScraper::new(profiles.snapinsta.clone()))),
        ]);
        let tiktok = provider(Arc::new(SsstikScraper::new(profiles.ssstik.clone())));

        Self::new()
            .with_route(Platform::Instagram, Route::Scraped(Arc::new(instagram)))
            .with_route(Platform::TikTok, Route::Scraped(tiktok))
            .with_route(Platform::YoutubeShorts, Route::Direct(Arc::new(YtDlpDownloader::from_env())))
    }

    /// Registry backed by a real Chromium, configured from the environment.
    pub fn from_env(launcher: Arc<dyn BrowserLauncher>) -> Self {
        let session = TimedBrowserSession::new(launcher, LaunchOptions::from_env());
        Self::from_profiles(&ScraperProfiles::from_env(), session)
    }
}
