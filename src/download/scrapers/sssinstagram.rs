//! sssinstagram.com: fill the form, poll for the download button.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{await_result, dismiss_modal, follow_share_link, read_href, ScraperWaits, SiteScraper};
use crate::core::config;
use crate::core::error::AppResult;
use crate::core::retry::RetryPolicy;
use crate::download::browser::ScrapePage;
use crate::download::platform::ResolvedMedia;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SssInstagramProfile {
    pub url: String,
    pub input: String,
    pub submit: String,
    pub download_link: String,
    pub error_banner: Option<String>,
    /// Confirmation modal shown after submitting, if the site has one
    pub modal_button: Option<String>,
}

impl Default for SssInstagramProfile {
    fn default() -> Self {
        Self {
            url: "https://sssinstagram.com/reels-downloader".to_string(),
            input: "input#input".to_string(),
            submit: ".form__submit".to_string(),
            download_link: "a.button__download".to_string(),
            error_banner: None,
            modal_button: None,
        }
    }
}

pub struct SssInstagramScraper {
    profile: SssInstagramProfile,
    waits: ScraperWaits,
    retry: RetryPolicy,
}

impl SssInstagramScraper {
    pub fn new(profile: SssInstagramProfile) -> Self {
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

#[async_trait]
impl SiteScraper for SssInstagramScraper {
    fn name(&self) -> &str {
        "sssinstagram"
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

        log::debug!("[sssinstagram] filling form with {}", target);
        page.wait_for_selector(&p.input, self.waits.selector).await?;
        page.fill(&p.input, &target).await?;
        page.click(&p.submit).await?;
        dismiss_modal(page, p.modal_button.as_deref(), self.waits.consent).await;

        log::debug!("[sssinstagram] waiting for download link");
        await_result(
            page,
            self.name(),
            &p.download_link,
            p.error_banner.as_deref(),
            self.waits.selector,
        )
        .await?;

        let href = read_href(page, &p.download_link).await?;
        log::debug!("[sssinstagram] download link: {:?}", href);
        Ok(href.map(ResolvedMedia::from_url))
    }
}

impl Default for SssInstagramScraper {
    fn default() -> Self {
        Self::new(SssInstagramProfile::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::platform::MediaKind;
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

    #[tokio::test]
    async fn test_drive_reads_download_href() {
        let page = FakePage::new()
            .with_element("input#input", None, None)
            .with_element("a.button__download", Some(" https://cdn.test/reel.mp4 "), None);
        let scraper = SssInstagramScraper::default().with_waits(waits());

        let media = scraper
            .drive(Arc::new(page.clone()), "https://www.instagram.com/reel/C1/")
            .await
            .expect("drive");

        assert_eq!(media, Some(ResolvedMedia::new("https://cdn.test/reel.mp4", MediaKind::Video)));
        assert_eq!(
            page.actions(),
            vec![
                PageAction::Fill("input#input".to_string(), "https://www.instagram.com/reel/C1/".to_string()),
                PageAction::Click(".form__submit".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_configured_modal_is_dismissed_after_submit() {
        let page = FakePage::new()
            .with_element("input#input", None, None)
            .with_element(".modal__btn", None, None)
            .with_element("a.button__download", Some("https://cdn.test/reel.mp4"), None);
        let profile = SssInstagramProfile {
            modal_button: Some(".modal__btn".to_string()),
            ..SssInstagramProfile::default()
        };
        let scraper = SssInstagramScraper::new(profile).with_waits(waits());

        scraper
            .drive(Arc::new(page.clone()), "https://www.instagram.com/reel/C1/")
            .await
            .expect("drive");

        let actions = page.actions();
        assert_eq!(
            actions[1..],
            [
                PageAction::Click(".form__submit".to_string()),
                PageAction::Click(".modal__btn".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_drive_without_href_finds_nothing() {
        let page = FakePage::new()
            .with_element("input#input", None, None)
            .with_element("a.button__download", None, None);
        let scraper = SssInstagramScraper::default().with_waits(waits());

        let media = scraper
            .drive(Arc::new(page), "https://www.instagram.com/reel/C1/")
            .await
            .expect("drive");
        assert_eq!(media, None);
    }

    #[tokio::test]
    async fn test_missing_result_times_out() {
        let page = FakePage::new().with_element("input#input", None, None);
        let scraper = SssInstagramScraper::default().with_waits(waits());

        let result = scraper.drive(Arc::new(page), "https://www.instagram.com/reel/C1/").await;
        assert!(matches!(result, Err(crate::core::AppError::Timeout(_))));
    }
}
