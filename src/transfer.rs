//! Media transfer — streams resolved media bytes to a sink.
//!
//! The lifecycle manager consumes transfer through the [`Transfer`] trait so
//! implementations can be swapped (or stubbed in tests). [`HttpTransfer`] is
//! the built-in implementation: it fetches the resolved media URL with the
//! resolved request headers and streams the body to a file in the download
//! directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use regex::Regex;
use tokio::io::AsyncWriteExt;

use crate::error::TransferError;
use crate::types::{DownloadInfo, DownloadInput};

/// Capability that streams resolved media to a sink
///
/// Implementations may fail or be cancelled mid-flight; the lifecycle manager
/// bounds each call with a deadline and a cancellation token, and records
/// failures on the job.
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Fetch the media described by `info` for the job submitted as `input`
    async fn transfer(
        &self,
        input: &DownloadInput,
        info: &DownloadInfo,
    ) -> Result<(), TransferError>;

    /// Human-readable implementation name, for logging
    fn name(&self) -> &str {
        "transfer"
    }
}

/// Characters that are invalid in filenames on common filesystems
const INVALID_FILENAME_PATTERN: &str = r#"[<>:"/\\?*|]+"#;

/// Derive the output filename for a job: `[sub] [op] title.extension`,
/// with filesystem-invalid characters stripped
pub fn target_filename(input: &DownloadInput, info: &DownloadInfo) -> String {
    let filename = format!(
        "[{}] [{}] {}.{}",
        input.sub, input.op, info.title, info.extension,
    );
    match Regex::new(INVALID_FILENAME_PATTERN) {
        Ok(re) => re.replace_all(&filename, "").trim().to_owned(),
        Err(_) => filename,
    }
}

/// Built-in transfer that streams media over HTTP to the download directory
pub struct HttpTransfer {
    client: reqwest::Client,
    download_dir: PathBuf,
}

impl HttpTransfer {
    /// Create a transfer writing into `download_dir`
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            download_dir: download_dir.into(),
        }
    }

    /// Create a transfer that shares an existing HTTP client
    pub fn with_client(client: reqwest::Client, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            download_dir: download_dir.into(),
        }
    }

    async fn stream_to_file(
        &self,
        info: &DownloadInfo,
        dest: &Path,
    ) -> Result<u64, TransferError> {
        let mut request = self.client.get(&info.audio);
        for (name, value) in &info.headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| TransferError::Network {
            url: info.audio.clone(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::HttpStatus {
                status: status.as_u16(),
                url: info.audio.clone(),
            });
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| TransferError::Io(format!("failed to create file: {e}")))?;

        let mut written = 0_u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| TransferError::Network {
                url: info.audio.clone(),
                reason: e.to_string(),
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|e| TransferError::Io(format!("failed to write data to file: {e}")))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| TransferError::Io(format!("failed to flush file: {e}")))?;
        Ok(written)
    }
}

#[async_trait]
impl Transfer for HttpTransfer {
    async fn transfer(
        &self,
        input: &DownloadInput,
        info: &DownloadInfo,
    ) -> Result<(), TransferError> {
        let filename = target_filename(input, info);
        let dest = self.download_dir.join(&filename);

        if dest.exists() {
            return Err(TransferError::FileExists(dest.display().to_string()));
        }

        tracing::debug!(url = %info.audio, file = %dest.display(), "starting media transfer");
        let written = self.stream_to_file(info, &dest).await?;
        tracing::info!(
            url = %info.audio,
            file = %dest.display(),
            bytes = written,
            "media transfer complete"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "http-transfer"
    }
}
