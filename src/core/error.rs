use thiserror::Error;

use crate::core::retry::Retryable;
use crate::download::error::ResolveError;

/// Centralized error types for the application
///
/// All errors in the application are converted to this enum for consistent error handling.
/// Uses `thiserror` for automatic error conversion and display formatting.
///
/// # Example
///
/// ```no_run
/// use reelgrab::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Schema migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] refinery::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Download/yt-dlp errors
    #[error("Download error: {0}")]
    Download(String),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP status code errors
    #[error("HTTP request failed with status: {0}")]
    HttpStatus(reqwest::StatusCode),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Headless browser failures (launch, CDP, page actions)
    #[error("Browser error: {0}")]
    Browser(String),

    /// An operation lost its race against a timer
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Provider outcome that is not a resolved media URL
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Policy violations (file too large, chat not allowed)
    #[error("Rejected: {0}")]
    Policy(String),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

/// Helper function to convert String to AppError::Download
impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Download(err)
    }
}

/// Helper function to convert &str to AppError::Download
impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Download(err.to_string())
    }
}

/// Extracts a readable message from a caught panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Retryable for AppError {
    fn is_retryable(&self) -> bool {
        match self {
            AppError::Browser(_) | AppError::Timeout(_) | AppError::Http(_) | AppError::Io(_) => true,
            AppError::HttpStatus(status) => status.is_server_error() || status.as_u16() == 429,
            AppError::Resolve(inner) => inner.is_retryable(),
            _ => false,
        }
    }
}

impl AppError {
    /// Short category label for log lines.
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::DatabasePool(_) | AppError::Migration(_) => "storage",
            AppError::Telegram(_) => "telegram",
            AppError::Download(_) => "download",
            AppError::Http(_) | AppError::HttpStatus(_) => "http",
            AppError::Io(_) => "io",
            AppError::Url(_) | AppError::Validation(_) => "validation",
            AppError::Browser(_) => "browser",
            AppError::Timeout(_) => "timeout",
            AppError::Resolve(inner) => inner.kind(),
            AppError::Policy(_) => "policy",
            AppError::Anyhow(_) => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors_are_retryable() {
        assert!(AppError::Timeout("launch".into()).is_retryable());
        assert!(AppError::Browser("crashed".into()).is_retryable());
        assert!(AppError::HttpStatus(reqwest::StatusCode::BAD_GATEWAY).is_retryable());
    }

    #[test]
    fn test_policy_and_not_found_are_final() {
        assert!(!AppError::Policy("too big".into()).is_retryable());
        assert!(!AppError::HttpStatus(reqwest::StatusCode::NOT_FOUND).is_retryable());
        assert!(!AppError::Resolve(ResolveError::NotFound("igram".into())).is_retryable());
    }

    #[test]
    fn test_panic_message_extracts_payload() {
        let payload = std::panic::catch_unwind(|| panic!("boom {}", 1)).expect_err("panicked");
        assert_eq!(panic_message(payload.as_ref()), "boom 1");
    }

    #[test]
    fn test_http_status_message_mentions_reason() {
        let err = AppError::HttpStatus(reqwest::StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "HTTP request failed with status: 404 Not Found");
    }
}
