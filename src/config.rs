//! Configuration types for media-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Download behavior configuration (destination, concurrency, deadlines)
///
/// Groups settings related to how jobs are resolved and transferred.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Download directory (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Maximum concurrent downloads (default: 4)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Deadline for a single resolution attempt (default: 30s, None = unbounded)
    ///
    /// On expiry the in-flight resolution is abandoned and the job transitions
    /// to `Failed` rather than hanging in `Downloading`.
    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout: Option<Duration>,

    /// Deadline for a single transfer attempt (default: 10min, None = unbounded)
    #[serde(default = "default_transfer_timeout")]
    pub transfer_timeout: Option<Duration>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_concurrent_downloads: default_max_concurrent(),
            resolve_timeout: default_resolve_timeout(),
            transfer_timeout: default_transfer_timeout(),
        }
    }
}

/// Job registry tuning (sharding, event buffering)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Number of registry shards (default: 16)
    ///
    /// Records are spread across shards so updates to unrelated jobs never
    /// contend on the same lock.
    #[serde(default = "default_shards")]
    pub shards: usize,

    /// Event broadcast channel capacity (default: 1000)
    ///
    /// Subscribers that fall further behind than this receive a
    /// `RecvError::Lagged` from the broadcast channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            shards: default_shards(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Main configuration for [`MediaDownloader`](crate::downloader::MediaDownloader)
///
/// Fields are organized into logical sub-configs:
/// - [`download`](DownloadConfig) — destination, concurrency, deadlines
/// - [`registry`](RegistryConfig) — sharding and event buffering
///
/// Sub-config fields are flattened for serialization, so the JSON/TOML format
/// stays flat (no nesting).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// Registry tuning settings
    #[serde(flatten)]
    pub registry: RegistryConfig,
}

impl Config {
    /// Validate the configuration, returning the first invalid setting found
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_downloads == 0 {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be at least 1".to_string(),
                key: Some("max_concurrent_downloads".to_string()),
            });
        }
        if self.registry.shards == 0 {
            return Err(Error::Config {
                message: "shards must be at least 1".to_string(),
                key: Some("shards".to_string()),
            });
        }
        if self.registry.event_buffer == 0 {
            return Err(Error::Config {
                message: "event_buffer must be at least 1".to_string(),
                key: Some("event_buffer".to_string()),
            });
        }
        Ok(())
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_max_concurrent() -> usize {
    4
}

fn default_resolve_timeout() -> Option<Duration> {
    Some(Duration::from_secs(30))
}

fn default_transfer_timeout() -> Option<Duration> {
    Some(Duration::from_secs(600))
}

fn default_shards() -> usize {
    16
}

fn default_event_buffer() -> usize {
    1000
}
