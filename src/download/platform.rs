//! Link classification and media kinds.

use lazy_regex::regex_is_match;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use url::Url;

/// Source platform of a submitted link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Instagram,
    #[strum(serialize = "tiktok")]
    #[serde(rename = "tiktok")]
    TikTok,
    YoutubeShorts,
}

impl Platform {
    /// Classifies a link, returning `None` for anything the bot does not handle.
    pub fn classify(url: &str) -> Option<Self> {
        if regex_is_match!(
            r"(?i)^(https?://)?(www\.)?instagram\.com/([A-Za-z0-9_.]+/?)?(p|reel|tv|reels|stories)/",
            url
        ) {
            Some(Platform::Instagram)
        } else if regex_is_match!(r"(?i)^(https?://)?((www|vm|vt|m)\.)?tiktok\.com/", url) {
            Some(Platform::TikTok)
        } else if regex_is_match!(r"(?i)^(https?://)?(www\.|m\.)?(youtube\.com|youtu\.be)/shorts/", url) {
            Some(Platform::YoutubeShorts)
        } else {
            None
        }
    }
}

/// Instagram `/share/...` links only redirect to the real post.
pub fn is_share_link(url: &str) -> bool {
    regex_is_match!(r"(?i)instagram\.com/share/", url)
}

/// Instagram story links need the story-saver flavour of some sites.
pub fn is_story_link(url: &str) -> bool {
    url.contains("stories")
}

/// What the direct media URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    /// Extension used for the local file.
    pub fn extension(self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Image => "jpg",
        }
    }

    /// Infers the kind from the path extension of a media URL. Unknown means video.
    pub fn from_url(media_url: &str) -> Self {
        let path = Url::parse(media_url)
            .map(|u| u.path().to_lowercase())
            .unwrap_or_else(|_| media_url.split(['?', '#']).next().unwrap_or_default().to_lowercase());

        match path.rsplit_once('.').map(|(_, ext)| ext) {
            Some("jpg" | "jpeg" | "png" | "webp" | "heic") => MediaKind::Image,
            Some("mp4" | "mov" | "m4v" | "webm" | "mkv") => MediaKind::Video,
            // proxy links often carry the real file name in the query string
            _ if [".jpg", ".jpeg", ".png", ".webp"].iter().any(|ext| media_url.to_lowercase().contains(ext)) => {
                MediaKind::Image
            }
            _ => MediaKind::Video,
        }
    }
}

/// A direct, downloadable media URL produced by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub url: String,
    pub kind: MediaKind,
}

impl ResolvedMedia {
    pub fn new(url: impl Into<String>, kind: MediaKind) -> Self {
        Self { url: url.into(), kind }
    }

    /// Builds a result whose kind comes from the URL extension.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let kind = MediaKind::from_url(&url);
        Self { url, kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_instagram_variants() {
        for url in [
            "https://www.instagram.com/reel/C1abc/",
            "https://instagram.com/p/XYZ/?igsh=1",
            "instagram.com/stories/someone/123/",
            "https://www.instagram.com/some.user/reel/C1abc/",
            "https://www.instagram.com/share/reel/BAabc/",
        ] {
            assert_eq!(Platform::classify(url), Some(Platform::Instagram), "{}", url);
        }
    }

    #[test]
    fn test_classify_other_platforms() {
        assert_eq!(
            Platform::classify("https://vm.tiktok.com/ZMabc/"),
            Some(Platform::TikTok)
        );
        assert_eq!(
            Platform::classify("https://www.tiktok.com/@u/video/1"),
            Some(Platform::TikTok)
        );
        assert_eq!(
            Platform::classify("https://youtube.com/shorts/abc123"),
            Some(Platform::YoutubeShorts)
        );
        assert_eq!(Platform::classify("https://youtube.com/watch?v=abc"), None);
        assert_eq!(Platform::classify("https://www.instagram.com/someone/"), None);
        assert_eq!(Platform::classify("hello there"), None);
    }

    #[test]
    fn test_platform_names() {
        assert_eq!(Platform::YoutubeShorts.to_string(), "youtube_shorts");
        assert_eq!("tiktok".parse::<Platform>().ok(), Some(Platform::TikTok));
    }

    #[test]
    fn test_media_kind_from_url() {
        assert_eq!(MediaKind::from_url("https://cdn.x/a/b.jpg?sig=1"), MediaKind::Image);
        assert_eq!(MediaKind::from_url("https://cdn.x/a/b.WEBP"), MediaKind::Image);
        assert_eq!(MediaKind::from_url("https://cdn.x/a/b.mp4"), MediaKind::Video);
        assert_eq!(MediaKind::from_url("https://cdn.x/download?token=abc"), MediaKind::Video);
        assert_eq!(MediaKind::from_url("https://dl.x/get?file=photo.jpg&t=1"), MediaKind::Image);
        assert_eq!(MediaKind::Image.extension(), "jpg");
    }

    #[test]
    fn test_share_and_story_detection() {
        assert!(is_share_link("https://www.instagram.com/share/reel/abc/"));
        assert!(!is_share_link("https://www.instagram.com/reel/abc/"));
        assert!(is_story_link("https://instagram.com/stories/u/1/"));
    }
}
