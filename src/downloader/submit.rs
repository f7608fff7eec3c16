//! Job submission and the `Initial → Downloading` start guard.

use crate::error::{Error, Result};
use crate::types::{DownloadId, DownloadInput, DownloadStatus, Event};

use super::MediaDownloader;

impl MediaDownloader {
    /// Submit a new download job
    ///
    /// Registers the job, starts it, and returns its id immediately without
    /// waiting for completion. Observe progress via
    /// [`status`](MediaDownloader::status) or
    /// [`subscribe`](MediaDownloader::subscribe).
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] if a shutdown is in progress
    /// - [`Error::Duplicate`] if the URL is already tracked by another job
    pub async fn submit(&self, input: DownloadInput) -> Result<DownloadId> {
        if !self
            .job_state
            .accepting_new
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            return Err(Error::ShuttingDown);
        }

        // Hold the URL index lock across create so two submissions of the
        // same URL cannot both pass the duplicate check.
        let id = {
            let mut url_index = self.job_state.url_index.lock().await;
            if url_index.contains_key(&input.url) {
                return Err(Error::Duplicate(input.url));
            }
            let url = input.url.clone();
            let id = self.registry.create(input).await;
            url_index.insert(url, id);
            id
        };

        let record = self.registry.get(id).await?;
        tracing::info!(download_id = id.0, url = %record.input.url, "Job submitted");
        self.emit_event(Event::Submitted {
            id,
            url: record.input.url.clone(),
        });

        self.start(id).await?;
        Ok(id)
    }

    /// Start a registered job, driving it to a terminal state exactly once
    ///
    /// The `Initial → Downloading` transition runs as a guarded atomic update
    /// in the registry, so a second `start` on the same id is rejected with
    /// [`Error::AlreadyStarted`] and leaves the record untouched — it never
    /// restarts or corrupts an in-flight job.
    pub async fn start(&self, id: DownloadId) -> Result<()> {
        let input = self
            .registry
            .update(id, |record| {
                if record.status != DownloadStatus::Initial {
                    return Err(Error::AlreadyStarted {
                        id,
                        status: record.status.to_string(),
                    });
                }
                record.status = DownloadStatus::Downloading;
                Ok(record.input.clone())
            })
            .await?;

        let cancel_token = tokio_util::sync::CancellationToken::new();
        {
            let mut active = self.job_state.active_jobs.lock().await;
            active.insert(id, cancel_token.clone());
        }

        let downloader = self.clone();
        tokio::spawn(async move {
            downloader.run_job(id, input, cancel_token).await;
        });
        Ok(())
    }
}
