//! Shared test helpers: scripted capability stubs and a MediaDownloader factory.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::downloader::MediaDownloader;
use crate::error::{ResolutionError, TransferError};
use crate::resolver::Resolver;
use crate::transfer::Transfer;
use crate::types::{DownloadId, DownloadInfo, DownloadInput, DownloadOutput};

type ResolveFn = dyn Fn(&DownloadInput) -> Result<DownloadInfo, ResolutionError> + Send + Sync;
type TransferFn = dyn Fn(&DownloadInput) -> Result<(), TransferError> + Send + Sync;

/// Scripted resolver: fixed outcome, optional latency, call counting.
pub(crate) struct StubResolver {
    outcome: Box<ResolveFn>,
    delay: Duration,
    pub(crate) calls: Arc<AtomicUsize>,
}

impl StubResolver {
    pub(crate) fn from_fn(
        f: impl Fn(&DownloadInput) -> Result<DownloadInfo, ResolutionError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            outcome: Box::new(f),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn ok(info: DownloadInfo) -> Self {
        Self::from_fn(move |_| Ok(info.clone()))
    }

    pub(crate) fn fail(message: &str) -> Self {
        let message = message.to_string();
        Self::from_fn(move |_| Err(ResolutionError::Other(message.clone())))
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Resolver for StubResolver {
    async fn resolve(&self, input: &DownloadInput) -> Result<DownloadInfo, ResolutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.outcome)(input)
    }

    fn name(&self) -> &str {
        "stub-resolver"
    }
}

/// Scripted transfer: fixed outcome, optional latency, call counting.
pub(crate) struct StubTransfer {
    outcome: Box<TransferFn>,
    delay: Duration,
    pub(crate) calls: Arc<AtomicUsize>,
}

impl StubTransfer {
    pub(crate) fn from_fn(
        f: impl Fn(&DownloadInput) -> Result<(), TransferError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            outcome: Box::new(f),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn ok() -> Self {
        Self::from_fn(|_| Ok(()))
    }

    pub(crate) fn fail(message: &str) -> Self {
        let message = message.to_string();
        Self::from_fn(move |_| Err(TransferError::Other(message.clone())))
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Transfer for StubTransfer {
    async fn transfer(
        &self,
        input: &DownloadInput,
        _info: &DownloadInfo,
    ) -> Result<(), TransferError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.outcome)(input)
    }

    fn name(&self) -> &str {
        "stub-transfer"
    }
}

/// Resolved metadata used by most stub scenarios.
pub(crate) fn sample_info() -> DownloadInfo {
    DownloadInfo::new("https://cdn/a.mp3", "A", "mp3")
}

/// Submission used by most stub scenarios.
pub(crate) fn sample_input(url: &str) -> DownloadInput {
    DownloadInput::new(url, "audio", "mp3")
}

/// Small, fast configuration for tests.
pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.download.max_concurrent_downloads = 8;
    config.download.resolve_timeout = Some(Duration::from_secs(5));
    config.download.transfer_timeout = Some(Duration::from_secs(5));
    config.registry.shards = 4;
    config.registry.event_buffer = 256;
    config
}

/// Helper to create a test MediaDownloader with stubbed capabilities.
pub(crate) fn create_test_downloader(
    resolver: StubResolver,
    transfer: StubTransfer,
) -> MediaDownloader {
    MediaDownloader::with_capabilities(test_config(), Arc::new(resolver), Arc::new(transfer))
        .unwrap()
}

/// Poll `status(id)` until the job reaches a terminal state.
pub(crate) async fn wait_for_terminal(
    downloader: &MediaDownloader,
    id: DownloadId,
) -> DownloadOutput {
    for _ in 0..500 {
        let record = downloader.status(id).await.unwrap();
        if record.is_terminal() {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {id} did not reach a terminal state in time");
}
