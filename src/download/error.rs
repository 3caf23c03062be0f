use thiserror::Error;

use crate::core::error::AppError;
use crate::core::retry::Retryable;

/// Tagged outcome of a provider that did not produce a media URL.
///
/// Keeps "the site has nothing for this link" apart from real failures so the
/// retry layer and the fallback chain can treat them differently.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The provider finished but found no media (driver returned nothing)
    #[error("{0}: no media found")]
    NotFound(String),
    /// Network hiccup, timeout or browser crash; worth another attempt
    #[error("{0}")]
    Transient(String),
    /// Provider reported a definitive error (banner text, malformed response)
    #[error("{0}")]
    Fatal(String),
}

impl ResolveError {
    /// Returns subcategory for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::NotFound(_) => "not_found",
            ResolveError::Transient(_) => "transient",
            ResolveError::Fatal(_) => "fatal",
        }
    }

    /// Returns the inner message
    pub fn message(&self) -> &str {
        match self {
            ResolveError::NotFound(msg) | ResolveError::Transient(msg) | ResolveError::Fatal(msg) => msg,
        }
    }
}

impl Retryable for ResolveError {
    fn is_retryable(&self) -> bool {
        matches!(self, ResolveError::Transient(_))
    }
}

impl From<AppError> for ResolveError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Resolve(inner) => inner,
            other if other.is_retryable() => ResolveError::Transient(other.to_string()),
            other => ResolveError::Fatal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_maps_to_tags() {
        assert!(matches!(
            ResolveError::from(AppError::Timeout("wait".into())),
            ResolveError::Transient(_)
        ));
        assert!(matches!(
            ResolveError::from(AppError::Validation("bad json".into())),
            ResolveError::Fatal(_)
        ));
        assert!(matches!(
            ResolveError::from(AppError::Resolve(ResolveError::NotFound("x".into()))),
            ResolveError::NotFound(_)
        ));
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(ResolveError::Transient("t".into()).is_retryable());
        assert!(!ResolveError::Fatal("f".into()).is_retryable());
        assert!(!ResolveError::NotFound("n".into()).is_retryable());
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(ResolveError::NotFound("igram".into()).to_string(), "igram: no media found");
    }
}
