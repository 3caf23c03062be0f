//! YouTube Shorts through the `yt-dlp` command line tool.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::timeout::run_with_timeout;
use crate::download::fetch::artifact_path;
use crate::download::job::DownloadResult;
use crate::download::platform::MediaKind;
use crate::download::provider::MediaDownloader;

/// How many trailing stderr lines end up in the error message.
const STDERR_TAIL_LINES: usize = 5;

pub struct YtDlpDownloader {
    bin: PathBuf,
    timeout: Duration,
}

impl YtDlpDownloader {
    pub fn new(bin: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    /// Uses `YTDL_BIN` and `YTDLP_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::new(config::YTDL_BIN.as_str(), config::ytdlp::timeout())
    }

    /// Logs the installed version, or a warning when the binary is missing.
    pub async fn log_version(&self) {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("--version");
        match run_with_timeout(&mut cmd, Duration::from_secs(10)).await {
            Ok(output) if output.status.success() => {
                log::info!("yt-dlp version: {}", String::from_utf8_lossy(&output.stdout).trim());
            }
            Ok(output) => log::warn!("yt-dlp --version exited with {}", output.status),
            Err(e) => log::warn!("yt-dlp is not available ({}): {}", self.bin.display(), e),
        }
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[async_trait]
impl MediaDownloader for YtDlpDownloader {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn download(&self, url: &str, stem: &Path) -> AppResult<DownloadResult> {
        let output_path = artifact_path(stem, MediaKind::Video.extension());

        let mut cmd = Command::new(&self.bin);
        cmd.arg(url)
            .arg("-o")
            .arg(&output_path)
            .arg("--no-playlist")
            .arg("--restrict-filenames");

        log::info!("[yt-dlp] downloading {} to {}", url, output_path.display());
        let output = run_with_timeout(&mut cmd, self.timeout).await?;

        if !output.status.success() {
            let tail = stderr_tail(&output.stderr);
            log::error!("[yt-dlp] failed for {} ({}): {}", url, output.status, tail);
            return Err(AppError::Download(format!("yt-dlp exited with {}: {}", output.status, tail)));
        }

        let size = fs_err::tokio::metadata(&output_path).await?.len();
        Ok(DownloadResult {
            path: output_path,
            kind: MediaKind::Video,
            size,
        })
    }
}
