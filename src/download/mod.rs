//! Media acquisition: classification, providers, fetching and the job pipeline

pub mod browser;
pub mod delivery;
pub mod error;
pub mod fetch;
pub mod job;
pub mod pipeline;
pub mod platform;
pub mod provider;
pub mod queue;
pub mod replay;
pub mod scrapers;
pub mod ytdlp;

// Re-exports for convenience
pub use error::ResolveError;
pub use fetch::MediaFetcher;
pub use job::{DownloadResult, Job};
pub use pipeline::{AcquisitionPipeline, PipelineError, PipelineSettings, PipelineStage};
pub use platform::{MediaKind, Platform, ResolvedMedia};
pub use provider::{FallbackChain, MediaDownloader, MediaResolver, ProviderRegistry, Route};
pub use queue::{JobOutcome, JobRunner, JobTicket, ProcessingQueue};
