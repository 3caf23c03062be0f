//! igram.world: the result is read from the site's own API call instead of the DOM.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{dismiss_modal, follow_share_link, ScraperWaits, SiteScraper, DEFAULT_CONSENT_BUTTON};
use crate::core::config;
use crate::core::error::AppResult;
use crate::core::retry::RetryPolicy;
use crate::core::timeout::race;
use crate::download::browser::{dismiss_consent, ScrapePage};
use crate::download::platform::{is_story_link, MediaKind, ResolvedMedia};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgramProfile {
    pub reels_url: String,
    pub stories_url: String,
    pub input: String,
    pub submit: String,
    /// Substring identifying the conversion API request
    pub api_url: String,
    pub consent_button: String,
    /// Confirmation modal the site sometimes shows after submitting
    pub modal_button: Option<String>,
}

impl Default for IgramProfile {
    fn default() -> Self {
        Self {
            reels_url: "https://igram.world/reels-downloader".to_string(),
            stories_url: "https://igram.world/story-saver".to_string(),
            input: "#search-form-input".to_string(),
            submit: ".search-form__button".to_string(),
            api_url: "https://api.igram.world/api/convert".to_string(),
            consent_button: DEFAULT_CONSENT_BUTTON.to_string(),
            modal_button: Some(".modal__btn".to_string()),
        }
    }
}

pub struct IgramScraper {
    profile: IgramProfile,
    waits: ScraperWaits,
    retry: RetryPolicy,
}

impl IgramScraper {
    pub fn new(profile: IgramProfile) -> Self {
        Self {
            profile,
            waits: ScraperWaits::default(),
            retry: RetryPolicy::new(1, config::retry::delay()),
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

impl Default for IgramScraper {
    fn default() -> Self {
        Self::new(IgramProfile::default())
    }
}

/// Pulls the first media URL out of a convert response.
///
/// The API answers with `{"url": [{"url": "...", "type": "mp4"}], ...}`, or with an
/// array of such objects for carousels.
pub fn media_from_response(body: &serde_json::Value) -> Option<ResolvedMedia> {
    let item = match body {
        serde_json::Value::Array(items) => items.first()?,
        other => other,
    };
    let entry = item.get("url")?.as_array()?.first()?;
    let url = entry.get("url")?.as_str()?.trim();
    if url.is_empty() {
        return None;
    }

    let kind = match entry.get("type").or_else(|| entry.get("ext")).and_then(|t| t.as_str()) {
        Some("jpg" | "jpeg" | "png" | "webp" | "heic") => MediaKind::Image,
        Some("mp4" | "mov" | "webm") => MediaKind::Video,
        _ => MediaKind::from_url(url),
    };
    Some(ResolvedMedia::new(url, kind))
}

#[async_trait]
impl SiteScraper for IgramScraper {
    fn name(&self) -> &str {
        "igram"
    }

    fn base_url(&self, user_url: &str) -> String {
        if is_story_link(user_url) {
            self.profile.stories_url.clone()
        } else {
            self.profile.reels_url.clone()
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    async fn drive(&self, page: Arc<dyn ScrapePage>, user_url: &str) -> AppResult<Option<ResolvedMedia>> {
        let p = &self.profile;
        let page = page.as_ref();
        let target = follow_share_link(page, user_url, &self.base_url(user_url)).await?;

        dismiss_consent(page, &p.consent_button, self.waits.consent).await;

        log::debug!("[igram] filling form with {}", target);
        page.wait_for_selector(&p.input, self.waits.selector).await?;
        page.fill(&p.input, &target).await?;

        // Listener goes up before the click so the response cannot slip past
        let response = page.watch_json_response(&p.api_url).await?;
        page.click(&p.submit).await?;
        dismiss_modal(page, p.modal_button.as_deref(), self.waits.consent).await;

        log::debug!("[igram] waiting for response from {}", p.api_url);
        let body = race(self.waits.intercept, "igram api response", response).await?;
        log::debug!("[igram] response JSON: {}", body);

        Ok(media_from_response(&body))
    }
}
