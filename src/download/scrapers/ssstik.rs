//! ssstik.io: TikTok without watermark.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{await_result, dismiss_modal, read_href, ScraperWaits, SiteScraper, DEFAULT_CONSENT_BUTTON};
use crate::core::config;
use crate::core::error::AppResult;
use crate::core::retry::RetryPolicy;
use crate::download::browser::{dismiss_consent, ScrapePage};
use crate::download::platform::{MediaKind, ResolvedMedia};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsstikProfile {
    pub url: String,
    pub input: String,
    pub submit: String,
    pub download_link: String,
    pub consent_button: String,
    pub error_banner: Option<String>,
    /// Confirmation modal shown after submitting, if the site has one
    pub modal_button: Option<String>,
}

impl Default for SsstikProfile {
    fn default() -> Self {
        Self {
            url: "https://ssstik.io/".to_string(),
            input: "#main_page_text".to_string(),
            submit: "button.vignette_active".to_string(),
            download_link: "a.download_link.without_watermark".to_string(),
            consent_button: DEFAULT_CONSENT_BUTTON.to_string(),
            error_banner: Some(".panel-body".to_string()),
            modal_button: None,
        }
    }
}

pub struct SsstikScraper {
    profile: SsstikProfile,
    waits: ScraperWaits,
    retry: RetryPolicy,
}

impl SsstikScraper {
    pub fn new(profile: SsstikProfile) -> Self {
        Self {
            profile,
            waits: ScraperWaits::default(),
            retry: RetryPolicy::new(3, config::retry::delay()),
        }
    }

    #[must_use]
    pub fn with_waits(mut self, waits: ScraperWaits) -> Self {
        self.waits = waits;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for SsstikScraper {
    fn default() -> Self {
        Self::new(SsstikProfile::default())
    }
}

#[async_trait]
impl SiteScraper for SsstikScraper {
    fn name(&self) -> &str {
        "ssstik"
    }

    fn base_url(&self, _user_url: &str) -> String {
        self.profile.url.clone()
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    async fn drive(&self, page: Arc<dyn ScrapePage>, user_url: &str) -> AppResult<Option<ResolvedMedia>> {
        let p = &self.profile;
        let page = page.as_ref();

        dismiss_consent(page, &p.consent_button, self.waits.consent).await;

        log::debug!("[ssstik] filling form with {}", user_url);
        page.wait_for_selector(&p.input, self.waits.selector).await?;
        page.fill(&p.input, user_url).await?;
        page.click(&p.submit).await?;
        dismiss_modal(page, p.modal_button.as_deref(), self.waits.consent).await;

        log::debug!("[ssstik] waiting for download link");
        await_result(
            page,
            self.name(),
            &p.download_link,
            p.error_banner.as_deref(),
            self.waits.selector,
        )
        .await?;

        let href = read_href(page, &p.download_link).await?;
        if href.is_none() {
            log::error!("Failed to get href from ssstik");
        }
        // ssstik only serves videos; its links carry no extension
        Ok(href.map(|url| ResolvedMedia::new(url, MediaKind::Video)))
    }
}
