use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn env_secs(name: &str, default: u64) -> u64 {
    env::var(name).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: database.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "database.sqlite".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: app.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "app.log".to_string()));

/// Enables debug-level logging when LOG_DEBUG=true
pub static LOG_DEBUG: Lazy<bool> = Lazy::new(|| env_flag("LOG_DEBUG"));

/// Directory for the per-job temporary media files
/// Read from TEMP_FILES_DIR environment variable, defaults to the OS temp dir
pub static TEMP_FILES_DIR: Lazy<String> = Lazy::new(|| {
    env::var("TEMP_FILES_DIR").unwrap_or_else(|_| env::temp_dir().to_string_lossy().into_owned())
});

/// Chats the bot is allowed to serve
/// Read from VALID_CHAT_IDS as a JSON array, e.g. `[-1001234, 5678]`.
/// An empty or missing list allows every chat.
pub static VALID_CHAT_IDS: Lazy<Vec<i64>> = Lazy::new(|| match env::var("VALID_CHAT_IDS") {
    Ok(raw) => parse_chat_ids(&raw),
    Err(_) => Vec::new(),
});

/// Adds a `From @user` caption to delivered media
pub static SHOW_USER_CAPTION: Lazy<bool> = Lazy::new(|| env_flag("SHOW_USER_CAPTION"));

/// Replies with the failure reason when a job cannot be delivered
pub static NOTIFY_ON_FAILURE: Lazy<bool> = Lazy::new(|| env_flag("NOTIFY_ON_FAILURE"));

/// Writes the job record as soon as a link is accepted instead of on first failure
pub static PERSIST_ON_SUBMIT: Lazy<bool> = Lazy::new(|| env_flag("PERSIST_ON_SUBMIT"));

/// Chromium binary used for scraping
/// Read from CHROMIUM_EXECUTABLE_PATH; chromiumoxide auto-detects when unset
pub static CHROMIUM_EXECUTABLE_PATH: Lazy<Option<String>> =
    Lazy::new(|| env::var("CHROMIUM_EXECUTABLE_PATH").ok().filter(|p| !p.trim().is_empty()));

/// Optional JSON file overriding the scraper selector profiles
pub static SCRAPER_PROFILES_PATH: Lazy<Option<String>> =
    Lazy::new(|| env::var("SCRAPER_PROFILES_PATH").ok().filter(|p| !p.trim().is_empty()));

/// Cached yt-dlp binary path
/// Read once at startup from YTDL_BIN environment variable or defaults to "yt-dlp"
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| env::var("YTDL_BIN").unwrap_or_else(|_| "yt-dlp".to_string()));

/// Parses the JSON chat allow-list, dropping anything that is not an integer.
pub fn parse_chat_ids(raw: &str) -> Vec<i64> {
    match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
        Ok(values) => values
            .iter()
            .filter_map(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
            .collect(),
        Err(e) => {
            log::warn!("VALID_CHAT_IDS is not a JSON array ({}), allowing every chat", e);
            Vec::new()
        }
    }
}

/// Headless browser configuration
pub mod browser {
    use super::Duration;

    /// Arguments passed to every Chromium launch
    pub const LAUNCH_ARGS: [&str; 2] = ["--no-sandbox", "--disable-setuid-sandbox"];

    /// Viewport applied to every page
    pub const VIEWPORT_WIDTH: u32 = 1080;
    pub const VIEWPORT_HEIGHT: u32 = 1024;

    /// Browser startup timeout (in seconds)
    pub const LAUNCH_TIMEOUT_SECS: u64 = 60;

    /// Page creation timeout (in seconds)
    pub const PAGE_TIMEOUT_SECS: u64 = 60;

    /// Default wait for a selector to appear (in seconds)
    pub const SELECTOR_TIMEOUT_SECS: u64 = 60;

    /// Wait for an optional consent dialog or modal (in seconds)
    pub const CONSENT_TIMEOUT_SECS: u64 = 5;

    /// Wait for an intercepted API response (in seconds)
    pub const INTERCEPT_TIMEOUT_SECS: u64 = 200;

    /// Upper bound for a whole driver run on one page (in seconds)
    pub const DRIVER_TIMEOUT_SECS: u64 = 240;

    /// Selector poll interval (in milliseconds)
    pub const POLL_INTERVAL_MS: u64 = 250;

    pub fn launch_timeout() -> Duration {
        Duration::from_secs(LAUNCH_TIMEOUT_SECS)
    }

    pub fn page_timeout() -> Duration {
        Duration::from_secs(PAGE_TIMEOUT_SECS)
    }

    pub fn selector_timeout() -> Duration {
        Duration::from_secs(SELECTOR_TIMEOUT_SECS)
    }

    pub fn consent_timeout() -> Duration {
        Duration::from_secs(CONSENT_TIMEOUT_SECS)
    }

    pub fn intercept_timeout() -> Duration {
        Duration::from_secs(INTERCEPT_TIMEOUT_SECS)
    }

    pub fn driver_timeout() -> Duration {
        Duration::from_secs(DRIVER_TIMEOUT_SECS)
    }

    pub fn poll_interval() -> Duration {
        Duration::from_millis(POLL_INTERVAL_MS)
    }
}

/// Retry configuration
pub mod retry {
    use super::Duration;

    /// Attempts for browser launch and page creation
    pub const BROWSER_ATTEMPTS: u32 = 2;

    /// Flat delay between attempts (in milliseconds)
    pub const DELAY_MS: u64 = 3000;

    pub fn delay() -> Duration {
        Duration::from_millis(DELAY_MS)
    }
}

/// Media size limits
pub mod limits {
    /// Largest file the bot will upload (100 MiB, inclusive)
    pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
}

/// Pending-job replay configuration
pub mod replay {
    use once_cell::sync::Lazy;

    /// Interval between scheduled sweeps of the job record store (in seconds)
    /// Read from REPLAY_INTERVAL_SECS, default two hours
    pub static INTERVAL_SECS: Lazy<u64> = Lazy::new(|| super::env_secs("REPLAY_INTERVAL_SECS", 7200));

    pub fn interval() -> std::time::Duration {
        std::time::Duration::from_secs(*INTERVAL_SECS)
    }
}

/// yt-dlp configuration
pub mod ytdlp {
    use once_cell::sync::Lazy;

    /// Hard limit for one yt-dlp run (in seconds)
    pub static TIMEOUT_SECS: Lazy<u64> = Lazy::new(|| super::env_secs("YTDLP_TIMEOUT_SECS", 240));

    pub fn timeout() -> std::time::Duration {
        std::time::Duration::from_secs(*TIMEOUT_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Bot API calls (in seconds)
    /// Uploads of ~100 MB videos need a generous limit
    pub const REQUEST_TIMEOUT_SECS: u64 = 600;

    /// Total timeout for one media download from a provider CDN (in seconds)
    pub const FETCH_TIMEOUT_SECS: u64 = 300;

    /// Connect timeout for Bot API calls and media fetches (in seconds)
    pub const CONNECT_TIMEOUT_SECS: u64 = 30;

    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }

    pub fn fetch_timeout() -> Duration {
        Duration::from_secs(FETCH_TIMEOUT_SECS)
    }

    pub fn connect_timeout() -> Duration {
        Duration::from_secs(CONNECT_TIMEOUT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_chat_ids_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_chat_ids("[-100123, \"42\", 7]"), vec![-100123, 42, 7]);
    }

    #[test]
    fn test_parse_chat_ids_skips_garbage() {
        assert_eq!(parse_chat_ids("[\"abc\", null, 5]"), vec![5]);
        assert!(parse_chat_ids("not json").is_empty());
        assert!(parse_chat_ids("[]").is_empty());
    }

    #[test]
    fn test_size_limit_is_100_mib() {
        assert_eq!(limits::MAX_FILE_SIZE, 104_857_600);
    }

    #[test]
    fn test_media_fetch_has_its_own_timeout() {
        assert_eq!(network::fetch_timeout(), Duration::from_secs(300));
        assert_eq!(network::timeout(), Duration::from_secs(600));
    }
}
