//! Graceful shutdown coordination.

use std::time::Duration;

use crate::error::Result;
use crate::types::Event;

use super::MediaDownloader;

/// How long shutdown waits for in-flight jobs to reach a terminal state
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval between checks while waiting for in-flight jobs to drain
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

impl MediaDownloader {
    /// Gracefully shut down the lifecycle manager
    ///
    /// 1. Stops accepting new submissions (`submit` returns `ShuttingDown`)
    /// 2. Closes the concurrency semaphore and cancels all in-flight jobs via
    ///    their cancellation tokens
    /// 3. Waits for in-flight jobs to record their terminal state, bounded by
    ///    a timeout
    /// 4. Emits a final [`Event::Shutdown`]
    ///
    /// Cancelled jobs end in `Failed` with a cancellation description, so no
    /// job is left silently hanging in `Downloading`.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.job_state
            .accepting_new
            .store(false, std::sync::atomic::Ordering::SeqCst);
        tracing::info!("Stopped accepting new submissions");

        // Closing the semaphore fails jobs still waiting for a permit, so
        // none of them starts a resolution after this point.
        self.job_state.concurrent_limit.close();
        self.cancel_all().await;

        let wait_result =
            tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, self.wait_for_active_jobs()).await;
        match wait_result {
            Ok(()) => {
                tracing::info!("All in-flight jobs reached a terminal state");
            }
            Err(_) => {
                tracing::warn!("Timeout waiting for jobs to finish, proceeding with shutdown");
            }
        }

        self.emit_event(Event::Shutdown);
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Signal cancellation to every in-flight job
    pub(crate) async fn cancel_all(&self) {
        let active = self.job_state.active_jobs.lock().await;
        tracing::debug!(active_count = active.len(), "Cancelling all in-flight jobs");

        for (id, token) in active.iter() {
            tracing::debug!(download_id = id.0, "Signaling cancellation");
            token.cancel();
        }
    }

    /// Wait until no job task remains in flight
    async fn wait_for_active_jobs(&self) {
        loop {
            let active_count = {
                let active = self.job_state.active_jobs.lock().await;
                active.len()
            };

            if active_count == 0 {
                return;
            }

            tracing::debug!(active_count, "Waiting for in-flight jobs to finish");
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    }
}
