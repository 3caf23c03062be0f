//! Acquisition pipeline: one job from link to delivered media.
//!
//! Stages run in order:
//!   resolve (provider route) → fetch to a temp file → size check → deliver
//!
//! Whatever happens, every temp file of the run is removed before the pipeline
//! returns. On success the job record is dropped; on failure it is upserted with the
//! current time so `/retry` or the scheduled sweep can pick it up again.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use strum::{AsRefStr, Display};
use thiserror::Error;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::download::delivery::{user_caption, ChatTarget, Messenger};
use crate::download::fetch::{artifact_path, MediaFetcher};
use crate::download::job::{DownloadResult, Job};
use crate::download::platform::Platform;
use crate::download::provider::{ProviderRegistry, Route};
use crate::download::queue::{JobOutcome, JobRunner};
use crate::storage::jobs::JobRecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum PipelineStage {
    Resolving,
    Fetching,
    SizeChecking,
    Delivering,
}

/// A failed run: the stage it died in and why.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    #[source]
    pub source: AppError,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, source: impl Into<AppError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

trait StageExt<T> {
    fn at(self, stage: PipelineStage) -> Result<T, PipelineError>;
}

impl<T, E: Into<AppError>> StageExt<T> for Result<T, E> {
    fn at(self, stage: PipelineStage) -> Result<T, PipelineError> {
        self.map_err(|e| PipelineError::new(stage, e))
    }
}

/// Suffixes a run can leave next to its stem: fetcher outputs plus yt-dlp's partial files.
const ARTIFACT_SUFFIXES: [&str; 4] = ["mp4", "jpg", "mp4.part", "mp4.ytdl"];

/// Temp files of one run, all named `<dir>/<stem>.<suffix>`. Removed on drop.
pub struct TempArtifacts {
    dir: PathBuf,
    stem: String,
}

impl TempArtifacts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            stem: uuid::Uuid::new_v4().simple().to_string(),
        }
    }

    /// Extension-less path downloaders append their extension to.
    pub fn stem_path(&self) -> PathBuf {
        self.dir.join(&self.stem)
    }

    fn cleanup(&self) {
        let stem = self.stem_path();
        for suffix in ARTIFACT_SUFFIXES {
            let path = artifact_path(&stem, suffix);
            match fs_err::remove_file(&path) {
                Ok(()) => log::debug!("Removed temp file {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Failed to remove temp file: {}", e),
            }
        }
    }
}

impl Drop for TempArtifacts {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Fails with a policy error when the file at `path` is larger than `limit` bytes.
pub fn check_size(path: &Path, limit: u64) -> AppResult<u64> {
    let size = fs_err::metadata(path)?.len();
    if size > limit {
        return Err(AppError::Policy(format!(
            "file is {:.1} MB, the limit is {} MB",
            size as f64 / (1024.0 * 1024.0),
            limit / (1024 * 1024)
        )));
    }
    Ok(size)
}

/// Resolves and downloads `url` to `<stem>.<ext>` using the platform's route.
pub async fn acquire(
    registry: &ProviderRegistry,
    fetcher: &MediaFetcher,
    platform: Platform,
    url: &str,
    stem: &Path,
) -> Result<DownloadResult, PipelineError> {
    let route = registry
        .route(platform)
        .ok_or_else(|| AppError::Validation(format!("no provider for {}", platform)))
        .at(PipelineStage::Resolving)?;
    log::debug!("Acquiring {} via {}", url, route.name());

    match route {
        Route::Scraped(resolver) => {
            let media = resolver.resolve(url).await.at(PipelineStage::Resolving)?;
            fetcher.fetch(&media, stem).await.at(PipelineStage::Fetching)
        }
        Route::Direct(downloader) => downloader.download(url, stem).await.at(PipelineStage::Fetching),
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub temp_dir: PathBuf,
    pub max_file_size: u64,
    pub show_caption: bool,
    pub notify_on_failure: bool,
}

impl PipelineSettings {
    pub fn from_env() -> Self {
        Self {
            temp_dir: PathBuf::from(config::TEMP_FILES_DIR.as_str()),
            max_file_size: config::limits::MAX_FILE_SIZE,
            show_caption: *config::SHOW_USER_CAPTION,
            notify_on_failure: *config::NOTIFY_ON_FAILURE,
        }
    }
}

pub struct AcquisitionPipeline {
    registry: ProviderRegistry,
    fetcher: MediaFetcher,
    messenger: Arc<dyn Messenger>,
    store: Arc<dyn JobRecordStore>,
    settings: PipelineSettings,
}

impl AcquisitionPipeline {
    pub fn new(
        registry: ProviderRegistry,
        fetcher: MediaFetcher,
        messenger: Arc<dyn Messenger>,
        store: Arc<dyn JobRecordStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            registry,
            fetcher,
            messenger,
            store,
            settings,
        }
    }

    /// Runs one job to completion.
    pub async fn execute(&self, job: &Job) -> Result<(), PipelineError> {
        log::info!("Processing {} from @{} in chat {}", job.url, job.username, job.chat_id);

        let outcome = {
            let artifacts = TempArtifacts::new(&self.settings.temp_dir);
            self.acquire_and_deliver(job, &artifacts).await
        };

        match outcome {
            Ok(()) => {
                self.forget(job);
                log::info!("Delivered {} to chat {}", job.url, job.chat_id);
                Ok(())
            }
            Err(e) => {
                log::error!("Job for {} failed at {}: {}", job.url, e.stage, e.source);
                self.remember(job);
                if self.settings.notify_on_failure {
                    self.notify_failure(job, &e).await;
                }
                Err(e)
            }
        }
    }

    async fn acquire_and_deliver(&self, job: &Job, artifacts: &TempArtifacts) -> Result<(), PipelineError> {
        let download = acquire(
            &self.registry,
            &self.fetcher,
            job.platform,
            &job.url,
            &artifacts.stem_path(),
        )
        .await?;

        let size = check_size(&download.path, self.settings.max_file_size).at(PipelineStage::SizeChecking)?;
        log::debug!("{} is {} bytes", download.path.display(), size);

        self.deliver(job, &download).await.at(PipelineStage::Delivering)
    }

    async fn deliver(&self, job: &Job, download: &DownloadResult) -> AppResult<()> {
        let target = ChatTarget::from(job);

        if let Err(e) = self.messenger.announce_upload(target, download.kind).await {
            log::warn!("Failed to send chat action to {}: {}", job.chat_id, e);
        }

        let caption = self.settings.show_caption.then(|| user_caption(&job.username));
        self.messenger.send_media(target, download, caption.as_deref()).await?;

        if let Err(e) = self.messenger.delete_message(job.chat_id, job.message_id).await {
            log::warn!("Failed to delete original message {} in {}: {}", job.message_id, job.chat_id, e);
        }
        Ok(())
    }

    fn forget(&self, job: &Job) {
        if let Err(e) = self.store.remove(&job.url) {
            log::error!("Failed to remove job record for {}: {}", job.url, e);
        }
    }

    fn remember(&self, job: &Job) {
        match self.store.save(&job.to_record(Some(Utc::now()))) {
            Ok(()) => log::info!("Saved {} for a later retry", job.url),
            Err(e) => log::error!("Failed to save job record for {}: {}", job.url, e),
        }
    }

    async fn notify_failure(&self, job: &Job, error: &PipelineError) {
        let text = format!("❌ Could not download {}: {}", job.url, error.source);
        if let Err(e) = self
            .messenger
            .send_text(ChatTarget::from(job), &text, Some(job.message_id))
            .await
        {
            log::warn!("Failed to notify chat {} about failure: {}", job.chat_id, e);
        }
    }
}

#[async_trait]
impl JobRunner for AcquisitionPipeline {
    async fn run(&self, job: &Job) -> JobOutcome {
        match self.execute(job).await {
            Ok(()) => JobOutcome::Delivered,
            Err(e) => JobOutcome::Failed(e.to_string()),
        }
    }
}
