//! Core lifecycle manager split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by domain:
//! - [`submit`] - Job submission and the `Initial → Downloading` start guard
//! - [`job_task`] - Per-job resolve/transfer task execution
//! - [`control`] - Status queries, removal, and cancellation
//! - [`lifecycle`] - Graceful shutdown coordination

mod control;
mod job_task;
mod lifecycle;
mod submit;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::registry::JobRegistry;
use crate::resolver::{Resolver, SiteResolver};
use crate::transfer::{HttpTransfer, Transfer};
use crate::types::DownloadId;

/// Shared per-job bookkeeping (cancellation, concurrency, dedup)
#[derive(Clone)]
pub(crate) struct JobState {
    /// Semaphore limiting concurrent jobs (respects max_concurrent_downloads config)
    pub(crate) concurrent_limit: Arc<tokio::sync::Semaphore>,
    /// Map of in-flight jobs to their cancellation tokens
    pub(crate) active_jobs:
        Arc<tokio::sync::Mutex<HashMap<DownloadId, tokio_util::sync::CancellationToken>>>,
    /// Reverse index from source URL to job id, for duplicate-submission rejection
    pub(crate) url_index: Arc<tokio::sync::Mutex<HashMap<String, DownloadId>>>,
    /// Flag indicating whether new submissions are accepted (false during shutdown)
    pub(crate) accepting_new: Arc<std::sync::atomic::AtomicBool>,
}

/// Main lifecycle manager instance (cloneable - all fields are Arc-wrapped)
///
/// Drives every submitted job through `Initial → Downloading → {Completed,
/// Failed}` exactly once, coordinating the [`Resolver`] and [`Transfer`]
/// capabilities, and exposes a consistent view of job status via
/// [`status`](MediaDownloader::status).
#[derive(Clone)]
pub struct MediaDownloader {
    /// Authoritative job registry (public for integration tests to query status)
    pub registry: Arc<JobRegistry>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<crate::types::Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Resolver capability (trait object for pluggable implementations)
    pub(crate) resolver: Arc<dyn Resolver>,
    /// Transfer capability (trait object for pluggable implementations)
    pub(crate) transfer: Arc<dyn Transfer>,
    /// Shared per-job bookkeeping
    pub(crate) job_state: JobState,
}

impl MediaDownloader {
    /// Create a new MediaDownloader with the built-in capabilities
    ///
    /// This validates the configuration, ensures the download directory
    /// exists, and wires up [`SiteResolver`] and [`HttpTransfer`] over a
    /// shared HTTP client.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;

        let client = reqwest::Client::new();
        let resolver: Arc<dyn Resolver> = Arc::new(SiteResolver::with_client(client.clone()));
        let transfer: Arc<dyn Transfer> = Arc::new(HttpTransfer::with_client(
            client,
            config.download.download_dir.clone(),
        ));

        Self::with_capabilities(config, resolver, transfer)
    }

    /// Create a MediaDownloader with caller-supplied capabilities
    ///
    /// This is the injection point for alternative resolvers/transfers and
    /// for test stubs. No filesystem setup is performed; the capabilities own
    /// their sinks.
    pub fn with_capabilities(
        config: Config,
        resolver: Arc<dyn Resolver>,
        transfer: Arc<dyn Transfer>,
    ) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = tokio::sync::broadcast::channel(config.registry.event_buffer);
        let registry = Arc::new(JobRegistry::new(config.registry.shards));

        let job_state = JobState {
            concurrent_limit: Arc::new(tokio::sync::Semaphore::new(
                config.download.max_concurrent_downloads,
            )),
            active_jobs: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
            url_index: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
            accepting_new: Arc::new(std::sync::atomic::AtomicBool::new(true)),
        };

        tracing::info!(
            resolver = resolver.name(),
            transfer = transfer.name(),
            max_concurrent = config.download.max_concurrent_downloads,
            "Lifecycle manager initialized"
        );

        Ok(Self {
            registry,
            event_tx,
            config: Arc::new(config),
            resolver,
            transfer,
            job_state,
        })
    }

    /// Subscribe to job lifecycle events
    ///
    /// Multiple subscribers are supported; each receives all events
    /// independently. Events are buffered, but a subscriber that falls behind
    /// by more than the configured `event_buffer` receives a
    /// `RecvError::Lagged` error. `status(id)` remains pollable regardless of
    /// whether anyone subscribes.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<crate::types::Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers the event is silently dropped; job
    /// processing never depends on anyone listening.
    pub(crate) fn emit_event(&self, event: crate::types::Event) {
        self.event_tx.send(event).ok();
    }
}
