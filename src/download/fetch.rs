//! Streams a resolved media URL to a local file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::download::job::DownloadResult;
use crate::download::platform::ResolvedMedia;

/// `<stem>.<ext>`, without touching dots already present in the stem.
pub fn artifact_path(stem: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(stem.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Plain HTTP download of direct media URLs. No retry at this level.
#[derive(Clone)]
pub struct MediaFetcher {
    client: reqwest::Client,
}

impl MediaFetcher {
    pub fn new() -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config::network::fetch_timeout())
            .connect_timeout(config::network::connect_timeout())
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Downloads `media` to `<stem>.mp4` or `<stem>.jpg`.
    ///
    /// A non-2xx status fails before any file is created; a failure while streaming
    /// removes the partial file.
    pub async fn fetch(&self, media: &ResolvedMedia, stem: &Path) -> AppResult<DownloadResult> {
        let path = artifact_path(stem, media.kind.extension());
        log::debug!("Fetching {} to {}", media.url, path.display());

        let response = self.client.get(&media.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            log::error!("Failed to download {}: {}", media.url, status);
            return Err(AppError::HttpStatus(status));
        }

        match Self::stream_to_file(response, &path).await {
            Ok(size) => {
                log::info!("Saved {} bytes to {}", size, path.display());
                Ok(DownloadResult {
                    path,
                    kind: media.kind,
                    size,
                })
            }
            Err(e) => {
                if let Err(remove_err) = fs_err::tokio::remove_file(&path).await {
                    log::debug!("No partial file to remove: {}", remove_err);
                }
                Err(e)
            }
        }
    }

    async fn stream_to_file(response: reqwest::Response, path: &Path) -> AppResult<u64> {
        let mut file = fs_err::tokio::File::create(path).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::platform::MediaKind;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_artifact_path_appends_extension() {
        assert_eq!(artifact_path(Path::new("/tmp/abc"), "mp4"), PathBuf::from("/tmp/abc.mp4"));
        assert_eq!(artifact_path(Path::new("/tmp/a.b"), "jpg"), PathBuf::from("/tmp/a.b.jpg"));
    }

    #[tokio::test]
    async fn test_fetch_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .mount(&server)
            .await;
        let dir = TempDir::new().expect("tempdir");
        let fetcher = MediaFetcher::new().expect("client");

        let media = ResolvedMedia::new(format!("{}/v.mp4", server.uri()), MediaKind::Video);
        let result = fetcher.fetch(&media, &dir.path().join("job")).await.expect("fetch");

        assert_eq!(result.path, dir.path().join("job.mp4"));
        assert_eq!(result.size, 4096);
        assert_eq!(std::fs::metadata(&result.path).map(|m| m.len()).ok(), Some(4096));
    }

    #[tokio::test]
    async fn test_fetch_not_found_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let dir = TempDir::new().expect("tempdir");
        let fetcher = MediaFetcher::new().expect("client");

        let media = ResolvedMedia::new(format!("{}/gone.jpg", server.uri()), MediaKind::Image);
        let err = fetcher.fetch(&media, &dir.path().join("job")).await.expect_err("404");

        assert!(matches!(err, AppError::HttpStatus(status) if status.as_u16() == 404));
        assert!(err.to_string().contains("404 Not Found"));
        assert!(!dir.path().join("job.jpg").exists());
    }
}
