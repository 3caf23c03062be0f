use anyhow::Result;
use dotenvy::dotenv;
use std::path::Path;
use std::sync::Arc;
use teloxide::prelude::*;

use reelgrab::cli::{Cli, Commands};
use reelgrab::core::{config, init_logger, log_startup_configuration};
use reelgrab::download::browser::{BrowserLauncher, ChromiumLauncher};
use reelgrab::download::delivery::Messenger;
use reelgrab::download::pipeline::{acquire, AcquisitionPipeline, PipelineSettings};
use reelgrab::download::replay::spawn_replay_sweep;
use reelgrab::download::ytdlp::YtDlpDownloader;
use reelgrab::download::{MediaFetcher, Platform, ProcessingQueue, ProviderRegistry};
use reelgrab::storage::{create_pool, JobRecordStore, SqliteJobStore};
use reelgrab::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, TelegramMessenger};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present, before any config is read
    let _ = dotenv();

    let cli = Cli::parse_args();

    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {}", panic_info);
    }));

    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run) | None => run_bot().await,
        Some(Commands::Fetch { url, output_dir }) => run_cli_fetch(&url, &output_dir).await,
        Some(Commands::Pending) => run_pending(),
        Some(Commands::Forget { url }) => run_forget(&url),
    }
}

fn open_store() -> Result<Arc<SqliteJobStore>> {
    let pool =
        create_pool(&config::DATABASE_PATH).map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?;
    Ok(Arc::new(SqliteJobStore::new(Arc::new(pool))))
}

fn launcher() -> Arc<dyn BrowserLauncher> {
    Arc::new(ChromiumLauncher::new())
}

async fn run_bot() -> Result<()> {
    log::info!("Starting reelgrab v{}", env!("CARGO_PKG_VERSION"));
    log_startup_configuration();

    let store: Arc<dyn JobRecordStore> = open_store()?;
    let bot = create_bot()?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    YtDlpDownloader::from_env().log_version().await;

    let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(bot.clone()));
    let pipeline = AcquisitionPipeline::new(
        ProviderRegistry::from_env(launcher()),
        MediaFetcher::new()?,
        Arc::clone(&messenger),
        Arc::clone(&store),
        PipelineSettings::from_env(),
    );
    let queue = Arc::new(ProcessingQueue::start(Arc::new(pipeline)));

    // Replays pending links right away, then on the configured interval
    let sweep = spawn_replay_sweep(Arc::clone(&store), Arc::clone(&queue), config::replay::interval());

    let handler = schema(HandlerDeps::new(store, Arc::clone(&queue), messenger));

    log::info!("📡 Ready to receive updates!");
    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .error_handler(LoggingErrorHandler::with_custom_text("An error from the update listener"))
        .build()
        .dispatch()
        .await;

    log::info!("Shutting down gracefully...");
    sweep.abort();
    queue.shutdown().await;
    Ok(())
}

/// Resolves and downloads one link into `output_dir`, printing the file path
async fn run_cli_fetch(url: &str, output_dir: &str) -> Result<()> {
    let platform = Platform::classify(url).ok_or_else(|| anyhow::anyhow!("Unsupported link: {}", url))?;
    let registry = ProviderRegistry::from_env(launcher());
    let fetcher = MediaFetcher::new()?;

    fs_err::create_dir_all(output_dir)?;
    let stem = Path::new(output_dir).join(uuid::Uuid::new_v4().simple().to_string());

    log::info!("Fetching {} ({})", url, platform);
    let result = acquire(&registry, &fetcher, platform, url, &stem).await?;

    println!("{} ({}, {} bytes)", result.path.display(), result.kind, result.size);
    Ok(())
}

fn run_pending() -> Result<()> {
    let records = open_store()?.load_all()?;
    if records.is_empty() {
        println!("No pending links");
        return Ok(());
    }

    for record in records {
        let last = record
            .last_processed_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{}\tchat={}\tuser=@{}\tmessage={}\tlast={}",
            record.url, record.chat_id, record.username, record.message_id, last
        );
    }
    Ok(())
}

fn run_forget(url: &str) -> Result<()> {
    if open_store()?.remove(url)? {
        println!("Removed {}", url);
    } else {
        println!("No pending link {}", url);
    }
    Ok(())
}
