//! # media-dl
//!
//! Async job lifecycle manager for media downloads.
//!
//! ## Design Philosophy
//!
//! media-dl is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Non-blocking** - `submit` returns an id immediately; jobs run in the background
//! - **Pluggable** - Resolution and transfer are traits, swappable per deployment
//! - **Observable** - Poll `status(id)` or subscribe to lifecycle events
//!
//! Every job moves through `Initial → Downloading → {Completed, Failed}`
//! exactly once. Capability failures never escape as panics or synchronous
//! errors; they are captured into the job's record as a failure description.
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, DownloadInput, MediaDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = MediaDownloader::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let id = downloader
//!         .submit(DownloadInput::new(
//!             "https://soundgasm.net/u/author/title",
//!             "audio",
//!             "m4a",
//!         ))
//!         .await?;
//!     println!("Submitted job {id}");
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Core lifecycle manager (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Sharded job registry
pub mod registry;
/// Page resolution capability
pub mod resolver;
/// Media transfer capability
pub mod transfer;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{Config, DownloadConfig, RegistryConfig};
pub use downloader::MediaDownloader;
pub use error::{Error, ResolutionError, Result, TransferError};
pub use registry::JobRegistry;
pub use resolver::{Resolver, SiteResolver};
pub use transfer::{target_filename, HttpTransfer, Transfer};
pub use types::{
    DownloadId, DownloadInfo, DownloadInput, DownloadOutput, DownloadStatus, Event, RegistryStats,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use media_dl::{Config, MediaDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = MediaDownloader::new(Config::default()).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: MediaDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    // Signal registration may fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        _ => {
            tracing::warn!("Could not register unix signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
