//! Per-job task execution: resolve, then transfer, then exactly one terminal
//! transition.

use crate::error::{ResolutionError, TransferError};
use crate::types::{DownloadId, DownloadInfo, DownloadInput, Event};

use super::MediaDownloader;

impl MediaDownloader {
    /// Drive one started job to its terminal state
    ///
    /// Runs inside its own spawned task; the record is already in
    /// `Downloading` when this is called. Whatever happens — capability
    /// failure, deadline expiry, cancellation — the job ends in exactly one
    /// terminal transition with exactly one terminal event, and the active-job
    /// entry is cleaned up.
    pub(crate) async fn run_job(
        &self,
        id: DownloadId,
        input: DownloadInput,
        cancel_token: tokio_util::sync::CancellationToken,
    ) {
        // Respect the concurrency limit. Shutdown closes the semaphore, so a
        // job still waiting for a permit fails here without ever resolving.
        match self
            .job_state
            .concurrent_limit
            .clone()
            .acquire_owned()
            .await
        {
            Ok(permit) => {
                let _permit = permit;
                self.drive(id, &input, &cancel_token).await;
            }
            Err(_) => {
                self.finish_failed(id, ResolutionError::Cancelled.to_string())
                    .await;
            }
        }

        let mut active = self.job_state.active_jobs.lock().await;
        active.remove(&id);
    }

    /// Resolution then transfer, strictly sequential
    async fn drive(
        &self,
        id: DownloadId,
        input: &DownloadInput,
        cancel_token: &tokio_util::sync::CancellationToken,
    ) {
        let resolve_outcome = tokio::select! {
            _ = cancel_token.cancelled() => Err(ResolutionError::Cancelled),
            result = self.bounded_resolve(input) => result,
        };
        let info = match resolve_outcome {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(download_id = id.0, error = %e, "Resolution failed");
                self.finish_failed(id, e.to_string()).await;
                return;
            }
        };

        // Attach resolved metadata while remaining in Downloading. A missing
        // record means the job was removed mid-flight; nothing left to do.
        let attach = self
            .registry
            .update(id, |record| {
                record.attach_info(info.clone());
                Ok(())
            })
            .await;
        if let Err(e) = attach {
            tracing::debug!(download_id = id.0, error = %e, "Job removed before resolution landed");
            return;
        }
        self.emit_event(Event::Resolved {
            id,
            title: info.title.clone(),
        });
        tracing::debug!(download_id = id.0, title = %info.title, "Resolution complete");

        let outcome = tokio::select! {
            _ = cancel_token.cancelled() => Err(TransferError::Cancelled),
            result = self.bounded_transfer(input, &info) => result,
        };

        match outcome {
            Ok(()) => self.finish_completed(id).await,
            Err(e) => {
                tracing::warn!(download_id = id.0, error = %e, "Transfer failed");
                self.finish_failed(id, e.to_string()).await;
            }
        }
    }

    /// Invoke the resolver, bounded by the configured deadline
    async fn bounded_resolve(
        &self,
        input: &DownloadInput,
    ) -> Result<DownloadInfo, ResolutionError> {
        match self.config.download.resolve_timeout {
            Some(deadline) => {
                match tokio::time::timeout(deadline, self.resolver.resolve(input)).await {
                    Ok(result) => result,
                    Err(_) => Err(ResolutionError::DeadlineExceeded(deadline)),
                }
            }
            None => self.resolver.resolve(input).await,
        }
    }

    /// Invoke the transfer, bounded by the configured deadline
    async fn bounded_transfer(
        &self,
        input: &DownloadInput,
        info: &DownloadInfo,
    ) -> Result<(), TransferError> {
        match self.config.download.transfer_timeout {
            Some(deadline) => {
                match tokio::time::timeout(deadline, self.transfer.transfer(input, info)).await {
                    Ok(result) => result,
                    Err(_) => Err(TransferError::DeadlineExceeded(deadline)),
                }
            }
            None => self.transfer.transfer(input, info).await,
        }
    }

    /// Terminal transition: `Downloading → Completed`
    async fn finish_completed(&self, id: DownloadId) {
        let updated = self
            .registry
            .update(id, |record| {
                record.complete();
                Ok(())
            })
            .await;

        match updated {
            Ok(()) => {
                tracing::info!(download_id = id.0, "Job completed");
                self.emit_event(Event::Completed { id });
            }
            Err(e) => {
                tracing::debug!(download_id = id.0, error = %e, "Job removed before completion landed");
            }
        }
    }

    /// Terminal transition: `Downloading → Failed`, failure description recorded
    async fn finish_failed(&self, id: DownloadId, failure: String) {
        let updated = self
            .registry
            .update(id, |record| {
                record.fail(failure.clone());
                Ok(())
            })
            .await;

        match updated {
            Ok(()) => {
                tracing::info!(download_id = id.0, failure = %failure, "Job failed");
                self.emit_event(Event::Failed { id, error: failure });
            }
            Err(e) => {
                tracing::debug!(download_id = id.0, error = %e, "Job removed before failure landed");
            }
        }
    }
}
