//! Logging initialization
//!
//! Console + file output through simplelog. Debug level is enabled by LOG_DEBUG.

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config;

/// Level used by both sinks.
pub fn level_filter(debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to initialize logger
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;
    let level = level_filter(*config::LOG_DEBUG);

    // chromiumoxide logs every CDP message it cannot deserialize; keep that out of our output
    let log_config = ConfigBuilder::new()
        .add_filter_ignore_str("chromiumoxide")
        .add_filter_ignore_str("tungstenite")
        .build();

    CombinedLogger::init(vec![
        TermLogger::new(level, log_config.clone(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(level, log_config, log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective runtime configuration at startup
pub fn log_startup_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("⚙️  Configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("DATABASE_PATH: {}", *config::DATABASE_PATH);
    log::info!("TEMP_FILES_DIR: {}", *config::TEMP_FILES_DIR);

    if config::VALID_CHAT_IDS.is_empty() {
        log::warn!("⚠️  VALID_CHAT_IDS: empty, every chat is allowed");
    } else {
        log::info!("✅ VALID_CHAT_IDS: {} chat(s)", config::VALID_CHAT_IDS.len());
    }

    match config::CHROMIUM_EXECUTABLE_PATH.as_deref() {
        Some(path) if std::path::Path::new(path).exists() => log::info!("✅ CHROMIUM_EXECUTABLE_PATH: {}", path),
        Some(path) => log::error!("❌ CHROMIUM_EXECUTABLE_PATH: {} (FILE NOT FOUND!)", path),
        None => log::info!("CHROMIUM_EXECUTABLE_PATH: not set, auto-detecting"),
    }

    log::info!("YTDL_BIN: {}", *config::YTDL_BIN);
    log::info!(
        "SHOW_USER_CAPTION={} NOTIFY_ON_FAILURE={} PERSIST_ON_SUBMIT={}",
        *config::SHOW_USER_CAPTION,
        *config::NOTIFY_ON_FAILURE,
        *config::PERSIST_ON_SUBMIT
    );
    log::info!("Replay interval: {}s", *config::replay::INTERVAL_SECS);
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter() {
        assert_eq!(level_filter(true), LevelFilter::Debug);
        assert_eq!(level_filter(false), LevelFilter::Info);
    }
}
