//! Drivers for third-party "paste a link, get a download link" sites.
//!
//! Each site is a [`SiteScraper`]: it knows its landing page, its retry budget and
//! how to walk the page from the pasted link to a direct media URL. Selectors live
//! in serde profiles so markup changes can be patched from a JSON file
//! (`SCRAPER_PROFILES_PATH`) without a rebuild.

pub mod igram;
pub mod snapinsta;
pub mod sssinstagram;
pub mod ssstik;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::retry::RetryPolicy;
use crate::download::browser::{dismiss_consent, ScrapePage};
use crate::download::error::ResolveError;
use crate::download::platform::{is_share_link, ResolvedMedia};

pub use igram::{IgramProfile, IgramScraper};
pub use snapinsta::{SnapinstaProfile, SnapinstaScraper};
pub use sssinstagram::{SssInstagramProfile, SssInstagramScraper};
pub use ssstik::{SsstikProfile, SsstikScraper};

/// Cookie-consent button used by the Funding Choices dialog most of these sites embed.
pub const DEFAULT_CONSENT_BUTTON: &str = ".fc-consent-root .fc-button.fc-cta-consent";

#[async_trait]
pub trait SiteScraper: Send + Sync {
    /// Provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Landing page to open for `user_url`.
    fn base_url(&self, user_url: &str) -> String;

    fn retry_policy(&self) -> RetryPolicy;

    /// Walks an already opened landing page to the direct media URL.
    ///
    /// `Ok(None)` means the site produced no link for this input.
    async fn drive(&self, page: Arc<dyn ScrapePage>, user_url: &str) -> AppResult<Option<ResolvedMedia>>;
}

/// How long scrapers wait on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScraperWaits {
    /// Result elements and form inputs
    pub selector: Duration,
    /// Optional dialogs (consent, confirmation modal)
    pub consent: Duration,
    /// Intercepted API responses
    pub intercept: Duration,
}

impl Default for ScraperWaits {
    fn default() -> Self {
        Self {
            selector: config::browser::selector_timeout(),
            consent: config::browser::consent_timeout(),
            intercept: config::browser::intercept_timeout(),
        }
    }
}

/// Selector profiles for every scraper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperProfiles {
    pub sssinstagram: SssInstagramProfile,
    pub igram: IgramProfile,
    pub snapinsta: SnapinstaProfile,
    pub ssstik: SsstikProfile,
}

impl ScraperProfiles {
    /// Parses a (possibly partial) JSON profile document.
    pub fn from_json(raw: &str) -> AppResult<Self> {
        serde_json::from_str(raw).map_err(|e| AppError::Validation(format!("invalid scraper profiles: {}", e)))
    }

    /// Loads profiles from `path`, or the built-in defaults when no path is given.
    pub fn load(path: Option<&str>) -> AppResult<Self> {
        match path {
            Some(path) => {
                let raw = fs_err::read_to_string(path)?;
                let profiles = Self::from_json(&raw)?;
                log::info!("Loaded scraper profiles from {}", path);
                Ok(profiles)
            }
            None => Ok(Self::default()),
        }
    }

    /// Profiles from `SCRAPER_PROFILES_PATH`, falling back to defaults on any error.
    pub fn from_env() -> Self {
        Self::load(config::SCRAPER_PROFILES_PATH.as_deref()).unwrap_or_else(|e| {
            log::error!("Failed to load scraper profiles, using defaults: {}", e);
            Self::default()
        })
    }
}

/// Follows an Instagram `/share/` link to the post it redirects to.
///
/// Uses the session page and navigates back to `landing` afterwards. Other links are
/// returned unchanged.
pub async fn follow_share_link(page: &dyn ScrapePage, user_url: &str, landing: &str) -> AppResult<String> {
    if !is_share_link(user_url) {
        return Ok(user_url.to_string());
    }

    page.goto(user_url).await?;
    let target = page.current_url().await?;
    log::debug!("Share link {} redirected to {}", user_url, target);
    page.goto(landing).await?;
    Ok(target)
}

/// Clicks the confirmation modal a site may show after submitting, when the profile names one.
pub async fn dismiss_modal(page: &dyn ScrapePage, modal_button: Option<&str>, timeout: Duration) {
    if let Some(modal) = modal_button {
        dismiss_consent(page, modal, timeout).await;
    }
}

/// Waits for the result element; on timeout reports the site's error banner if one is shown.
pub async fn await_result(
    page: &dyn ScrapePage,
    provider: &str,
    result_selector: &str,
    error_banner: Option<&str>,
    timeout: Duration,
) -> AppResult<()> {
    match page.wait_for_selector(result_selector, timeout).await {
        Ok(()) => Ok(()),
        Err(wait_err) => {
            if let Some(banner) = error_banner {
                if let Some(message) = read_banner(page, banner).await {
                    log::error!("The service {} returned an error: {}", provider, message);
                    return Err(AppError::Resolve(ResolveError::Fatal(format!(
                        "{} returned an error: {}",
                        provider, message
                    ))));
                }
            }
            Err(wait_err)
        }
    }
}

async fn read_banner(page: &dyn ScrapePage, selector: &str) -> Option<String> {
    page.text_content(selector)
        .await
        .ok()
        .flatten()
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
}

/// Non-empty, trimmed `href` of `selector`.
pub async fn read_href(page: &dyn ScrapePage, selector: &str) -> AppResult<Option<String>> {
    Ok(page
        .attribute(selector, "href")
        .await?
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::browser::{FakePage, PageAction};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_profile_json_keeps_defaults() {
        let profiles =
            ScraperProfiles::from_json(r##"{"ssstik": {"input": "#new_input"}}"##).expect("valid profile json");
        assert_eq!(profiles.ssstik.input, "#new_input");
        assert_eq!(profiles.ssstik.download_link, SsstikProfile::default().download_link);
        assert_eq!(profiles.igram, IgramProfile::default());
    }

    #[test]
    fn test_profile_json_can_add_modal_to_any_site() {
        let profiles = ScraperProfiles::from_json(
            r#"{"sssinstagram": {"modal_button": ".modal__btn"}, "ssstik": {"modal_button": ".confirm"}}"#,
        )
        .expect("valid profile json");
        assert_eq!(profiles.sssinstagram.modal_button.as_deref(), Some(".modal__btn"));
        assert_eq!(profiles.ssstik.modal_button.as_deref(), Some(".confirm"));
        assert_eq!(profiles.snapinsta.modal_button, None);
    }

    #[tokio::test]
    async fn test_dismiss_modal_only_when_configured() {
        let page = FakePage::new().with_element(".modal__btn", None, None);
        dismiss_modal(&page, None, Duration::from_millis(5)).await;
        assert!(page.actions().is_empty());

        dismiss_modal(&page, Some(".modal__btn"), Duration::from_millis(5)).await;
        assert_eq!(page.actions(), vec![PageAction::Click(".modal__btn".to_string())]);
    }

    #[test]
    fn test_invalid_profile_json_is_rejected() {
        assert!(ScraperProfiles::from_json("{not json").is_err());
    }

    #[test]
    fn test_load_without_path_uses_defaults() {
        assert_eq!(ScraperProfiles::load(None).ok(), Some(ScraperProfiles::default()));
    }

    #[tokio::test]
    async fn test_follow_share_link_navigates_and_returns() {
        let page = FakePage::new().with_redirect(
            "https://www.instagram.com/share/reel/BAx/",
            "https://www.instagram.com/reel/C9real/",
        );

        let target = follow_share_link(&page, "https://www.instagram.com/share/reel/BAx/", "https://landing.test/")
            .await
            .expect("redirect");

        assert_eq!(target, "https://www.instagram.com/reel/C9real/");
        assert_eq!(
            page.actions(),
            vec![
                PageAction::Goto("https://www.instagram.com/share/reel/BAx/".to_string()),
                PageAction::Goto("https://landing.test/".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_follow_share_link_ignores_regular_links() {
        let page = FakePage::new();
        let target = follow_share_link(&page, "https://www.instagram.com/reel/C1/", "https://landing.test/")
            .await
            .expect("no-op");
        assert_eq!(target, "https://www.instagram.com/reel/C1/");
        assert!(page.actions().is_empty());
    }

    #[tokio::test]
    async fn test_await_result_reports_banner() {
        let page = FakePage::new().with_element(".panel-body", None, Some("  Video   is private "));
        let err = await_result(&page, "ssstik", "a.result", Some(".panel-body"), Duration::from_millis(10))
            .await
            .expect_err("banner shown");
        assert!(matches!(err, AppError::Resolve(ResolveError::Fatal(msg)) if msg == "ssstik returned an error: Video is private"));
    }

    #[tokio::test]
    async fn test_await_result_without_banner_keeps_timeout() {
        let page = FakePage::new();
        let err = await_result(&page, "ssstik", "a.result", Some(".panel-body"), Duration::from_millis(10))
            .await
            .expect_err("nothing shown");
        assert!(matches!(err, AppError::Timeout(_)));
    }
}
