//! Scripted providers for chain, pipeline and replay tests.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::core::error::AppResult;
use crate::download::error::ResolveError;
use crate::download::fetch::artifact_path;
use crate::download::job::DownloadResult;
use crate::download::platform::{MediaKind, ResolvedMedia};
use crate::download::provider::{MediaDownloader, MediaResolver};

/// Resolver returning the same outcome on every call.
pub struct ScriptedResolver {
    name: String,
    outcome: Result<ResolvedMedia, ResolveError>,
    delay: Option<Duration>,
    calls: AtomicU32,
}

impl ScriptedResolver {
    pub fn succeeding(name: &str, media: ResolvedMedia) -> Self {
        Self::with_outcome(name, Ok(media))
    }

    pub fn failing(name: &str, error: ResolveError) -> Self {
        Self::with_outcome(name, Err(error))
    }

    fn with_outcome(name: &str, outcome: Result<ResolvedMedia, ResolveError>) -> Self {
        Self {
            name: name.to_string(),
            outcome,
            delay: None,
            calls: AtomicU32::new(0),
        }
    }

    /// Sleeps before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaResolver for ScriptedResolver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, _url: &str) -> Result<ResolvedMedia, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

/// Downloader that writes a sparse video file of a fixed size.
pub struct FakeDownloader {
    name: String,
    size: u64,
    calls: AtomicU32,
}

impl FakeDownloader {
    pub fn new(name: &str, size: u64) -> Self {
        Self {
            name: name.to_string(),
            size,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaDownloader for FakeDownloader {
    fn name(&self) -> &str {
        &self.name
    }

    async fn download(&self, _url: &str, stem: &Path) -> AppResult<DownloadResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let path = artifact_path(stem, MediaKind::Video.extension());
        let file = fs_err::File::create(&path)?;
        file.set_len(self.size)?;
        Ok(DownloadResult {
            path,
            kind: MediaKind::Video,
            size: self.size,
        })
    }
}
