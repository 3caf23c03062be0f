//! snapinsta.app: consent dialog, ad overlay, and the media kind taken from the button label.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    await_result, dismiss_modal, follow_share_link, read_href, ScraperWaits, SiteScraper, DEFAULT_CONSENT_BUTTON,
};
use crate::core::config;
use crate::core::error::AppResult;
use crate::core::retry::RetryPolicy;
use crate::download::browser::{dismiss_ad, dismiss_consent, ScrapePage};
use crate::download::platform::{MediaKind, ResolvedMedia};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapinstaProfile {
    pub url: String,
    pub input: String,
    pub submit: String,
    pub download_link: String,
    /// Button label that marks a video result; anything else is a photo
    pub video_label: String,
    pub consent_button: String,
    pub ad_overlay: String,
    pub ad_close: String,
    pub error_banner: Option<String>,
    /// Confirmation modal shown after submitting, if the site has one
    pub modal_button: Option<String>,
}

impl Default for SnapinstaProfile {
    fn default() -> Self {
        Self {
            url: "https://snapinsta.app".to_string(),
            input: "input#url".to_string(),
            submit: "button#btn-submit".to_string(),
            download_link: ".download-bottom a".to_string(),
            video_label: "Download Video".to_string(),
            consent_button: DEFAULT_CONSENT_BUTTON.to_string(),
            ad_overlay: "div#adOverlay".to_string(),
            ad_close: "button#close-modal".to_string(),
            error_banner: None,
            modal_button: None,
        }
    }
}

pub struct SnapinstaScraper {
    profile: SnapinstaProfile,
    waits: ScraperWaits,
    retry: RetryPolicy,
}

impl SnapinstaScraper {
    pub fn new(profile: SnapinstaProfile) -> Self {
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

impl Default for SnapinstaScraper {
    fn default() -> Self {
        Self::new(SnapinstaProfile::default())
    }
}

#[async_trait]
impl SiteScraper for SnapinstaScraper {
    fn name(&self) -> &str {
        "snapinsta"
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
        let target = follow_share_link(page, user_url, &p.url).await?;

        dismiss_consent(page, &p.consent_button, self.waits.consent).await;

        log::debug!("[snapinsta] filling form with {}", target);
        page.wait_for_selector(&p.input, self.waits.selector).await?;
        page.fill(&p.input, &target).await?;
        page.click(&p.submit).await?;
        dismiss_ad(page, &p.ad_overlay, &p.ad_close).await;
        dismiss_modal(page, p.modal_button.as_deref(), self.waits.consent).await;

        log::debug!("[snapinsta] waiting for download link");
        await_result(
            page,
            self.name(),
            &p.download_link,
            p.error_banner.as_deref(),
            self.waits.selector,
        )
        .await?;

        let Some(href) = read_href(page, &p.download_link).await? else {
            return Ok(None);
        };
        let label = page.text_content(&p.download_link).await?.unwrap_or_default();
        let kind = if label.trim() == p.video_label {
            MediaKind::Video
        } else {
            MediaKind::Image
        };
        log::debug!("[snapinsta] download link: {} ({})", href, kind);

        Ok(Some(ResolvedMedia::new(href, kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::browser::{FakePage, PageAction};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn waits() -> ScraperWaits {
        ScraperWaits {
            selector: Duration::from_millis(20),
            consent: Duration::from_millis(5),
            intercept: Duration::from_millis(50),
        }
    }

    fn page_with_result(label: &str) -> FakePage {
        FakePage::new()
            .with_element("input#url", None, None)
            .with_element(".download-bottom a", Some("https://dl.snapinsta.test/x?token=1"), Some(label))
    }

    #[tokio::test]
    async fn test_video_label_means_video() {
        let scraper = SnapinstaScraper::default().with_waits(waits());
        let media = scraper
            .drive(Arc::new(page_with_result(" Download Video ")), "https://www.instagram.com/reel/C1/")
            .await
            .expect("drive");
        assert_eq!(media.map(|m| m.kind), Some(MediaKind::Video));
    }

    #[tokio::test]
    async fn test_other_label_means_photo() {
        let scraper = SnapinstaScraper::default().with_waits(waits());
        let media = scraper
            .drive(Arc::new(page_with_result("Download Photo")), "https://www.instagram.com/p/C1/")
            .await
            .expect("drive");
        assert_eq!(media.map(|m| m.kind), Some(MediaKind::Image));
    }

    #[tokio::test]
    async fn test_visible_ad_is_closed_after_submit() {
        let page = page_with_result("Download Video").with_visible("div#adOverlay");
        let scraper = SnapinstaScraper::default().with_waits(waits());

        scraper
            .drive(Arc::new(page.clone()), "https://www.instagram.com/reel/C1/")
            .await
            .expect("drive");

        let actions = page.actions();
        let submit = actions
            .iter()
            .position(|a| a == &PageAction::Click("button#btn-submit".to_string()))
            .expect("submitted");
        assert_eq!(
            actions.get(submit + 1),
            Some(&PageAction::Click("button#close-modal".to_string()))
        );
    }

    #[tokio::test]
    async fn test_configured_modal_is_dismissed_after_submit() {
        let page = page_with_result("Download Video").with_element(".confirm-ok", None, None);
        let profile = SnapinstaProfile {
            modal_button: Some(".confirm-ok".to_string()),
            ..SnapinstaProfile::default()
        };
        let scraper = SnapinstaScraper::new(profile).with_waits(waits());

        scraper
            .drive(Arc::new(page.clone()), "https://www.instagram.com/reel/C1/")
            .await
            .expect("drive");

        let clicks: Vec<_> = page
            .actions()
            .into_iter()
            .filter_map(|a| match a {
                PageAction::Click(sel) => Some(sel),
                _ => None,
            })
            .collect();
        assert_eq!(clicks, vec!["button#btn-submit".to_string(), ".confirm-ok".to_string()]);
    }
}
