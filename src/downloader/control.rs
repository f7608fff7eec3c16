//! Status queries, removal, and cancellation.

use crate::error::Result;
use crate::types::{DownloadId, DownloadOutput, Event, RegistryStats};

use super::MediaDownloader;

impl MediaDownloader {
    /// Get an immutable snapshot of a job's current record
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::error::Error::NotFound) if `id` was
    /// never created (or was removed).
    pub async fn status(&self, id: DownloadId) -> Result<DownloadOutput> {
        self.registry.get(id).await
    }

    /// Snapshot every tracked job, sorted by id
    pub async fn list(&self) -> Vec<DownloadOutput> {
        self.registry.list().await
    }

    /// Count tracked jobs per status
    pub async fn stats(&self) -> RegistryStats {
        self.registry.stats().await
    }

    /// Cancel an in-flight job
    ///
    /// Returns `true` if a running task was signaled (it will shortly record
    /// a `Failed` terminal state), `false` if the job was not in flight.
    /// The record itself stays in the registry either way.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::error::Error::NotFound) if `id` is
    /// unknown.
    pub async fn cancel(&self, id: DownloadId) -> Result<bool> {
        // Existence check first so cancelling a bogus id is a usage error.
        self.registry.get(id).await?;

        let active = self.job_state.active_jobs.lock().await;
        if let Some(token) = active.get(&id) {
            tracing::info!(download_id = id.0, "Cancelling job");
            token.cancel();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Remove a job from the registry, cancelling it first if it is in flight
    ///
    /// Returns the final snapshot of the removed record. The job's URL
    /// becomes submittable again.
    pub async fn remove(&self, id: DownloadId) -> Result<DownloadOutput> {
        {
            let mut active = self.job_state.active_jobs.lock().await;
            if let Some(token) = active.remove(&id) {
                tracing::debug!(download_id = id.0, "Cancelling job before removal");
                token.cancel();
            }
        }

        let record = self.registry.remove(id).await?;
        {
            let mut url_index = self.job_state.url_index.lock().await;
            url_index.remove(&record.input.url);
        }

        tracing::info!(download_id = id.0, "Job removed");
        self.emit_event(Event::Removed { id });
        Ok(record)
    }

    /// Remove every successfully completed job, returning how many were removed
    ///
    /// Works from the set of records the registry actually drained, so a job
    /// completing while the sweep runs is either fully removed (registry, URL
    /// index, `Removed` event) or fully kept — never half-removed.
    pub async fn remove_completed(&self) -> usize {
        let removed = self.registry.drain_where(DownloadOutput::is_completed).await;

        let mut url_index = self.job_state.url_index.lock().await;
        for record in &removed {
            url_index.remove(&record.input.url);
            self.emit_event(Event::Removed { id: record.id });
        }
        drop(url_index);

        tracing::info!(removed = removed.len(), "Removed completed jobs");
        removed.len()
    }

    /// Remove every job, cancelling any that are in flight
    pub async fn clear(&self) -> usize {
        {
            let mut active = self.job_state.active_jobs.lock().await;
            for (id, token) in active.drain() {
                tracing::debug!(download_id = id.0, "Cancelling job before clear");
                token.cancel();
            }
        }

        let removed = self.registry.drain_where(|_| true).await;

        let mut url_index = self.job_state.url_index.lock().await;
        for record in &removed {
            url_index.remove(&record.input.url);
            self.emit_event(Event::Removed { id: record.id });
        }
        drop(url_index);

        tracing::info!(removed = removed.len(), "Cleared all jobs");
        removed.len()
    }
}
