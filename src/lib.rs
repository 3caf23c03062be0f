//! reelgrab - Telegram bot delivering media from Instagram, TikTok and YouTube Shorts links
//!
//! Links are resolved through third-party download sites driven by a headless
//! browser (or yt-dlp), fetched to a temp file and sent back to the chat. Jobs that
//! fail are kept in SQLite and replayed later.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, retry and timeout helpers
//! - `download`: providers, fetcher, queue and the acquisition pipeline
//! - `storage`: SQLite pool, migrations and the job record store
//! - `telegram`: bot wiring, handlers and the teloxide messenger
//! - `testing`: fakes shared by unit and integration tests

pub mod cli;
pub mod core;
pub mod download;
pub mod storage;
pub mod telegram;
pub mod testing;

// Re-exports for convenience
pub use core::{config, AppError, AppResult};
pub use download::{AcquisitionPipeline, Job, ProcessingQueue, ProviderRegistry};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
