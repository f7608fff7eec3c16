//! In-memory job registry — the single source of truth for job status.
//!
//! Records are spread across shards, each behind its own lock, so updates to
//! unrelated jobs never serialize on a global lock. Callers only ever receive
//! snapshot clones; every mutation goes through [`JobRegistry::update`], which
//! applies the caller's closure all-or-nothing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::types::{DownloadId, DownloadInput, DownloadOutput, DownloadStatus, RegistryStats};

/// Concurrent-safe store of every job's current [`DownloadOutput`]
pub struct JobRegistry {
    /// Record shards; a record lives in `shards[id % shards.len()]`
    shards: Vec<Mutex<HashMap<DownloadId, DownloadOutput>>>,
    /// Next id to allocate; ids are monotonically assigned and never reused
    next_id: AtomicU64,
}

impl JobRegistry {
    /// Create a registry with the given shard count (minimum 1)
    pub fn new(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        let shards = (0..shard_count)
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Self {
            shards,
            next_id: AtomicU64::new(0),
        }
    }

    fn shard(&self, id: DownloadId) -> &Mutex<HashMap<DownloadId, DownloadOutput>> {
        &self.shards[(id.0 as usize) % self.shards.len()]
    }

    /// Allocate a fresh id and store a new record in the `Initial` state
    ///
    /// Never fails; ids are never reused within the process lifetime.
    pub async fn create(&self, input: DownloadInput) -> DownloadId {
        let id = DownloadId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let record = DownloadOutput::new(id, input);

        let mut shard = self.shard(id).lock().await;
        shard.insert(id, record);
        id
    }

    /// Return an immutable snapshot of the record for `id`
    pub async fn get(&self, id: DownloadId) -> Result<DownloadOutput> {
        let shard = self.shard(id).lock().await;
        shard.get(&id).cloned().ok_or(Error::NotFound(id))
    }

    /// Apply an atomic transition to the record for `id`
    ///
    /// The closure runs against a working copy while the shard lock is held;
    /// the copy only replaces the stored record if the closure returns `Ok`.
    /// A failing closure leaves the record exactly as it was, so guarded
    /// transitions (e.g. rejecting a duplicate start) cannot corrupt state.
    pub async fn update<T, F>(&self, id: DownloadId, f: F) -> Result<T>
    where
        F: FnOnce(&mut DownloadOutput) -> Result<T>,
    {
        let mut shard = self.shard(id).lock().await;
        let record = shard.get_mut(&id).ok_or(Error::NotFound(id))?;

        let mut working = record.clone();
        let value = f(&mut working)?;
        *record = working;
        Ok(value)
    }

    /// Remove the record for `id`, returning its final snapshot
    pub async fn remove(&self, id: DownloadId) -> Result<DownloadOutput> {
        let mut shard = self.shard(id).lock().await;
        shard.remove(&id).ok_or(Error::NotFound(id))
    }

    /// Remove and return every record matching the predicate, sorted by id
    ///
    /// Each record is matched and removed under its shard lock, so a record
    /// cannot change status between matching the predicate and leaving the
    /// registry. Callers that mirror registry contents elsewhere (URL dedup,
    /// events) must work from the returned set, never from a prior snapshot.
    pub async fn drain_where<F>(&self, mut f: F) -> Vec<DownloadOutput>
    where
        F: FnMut(&DownloadOutput) -> bool,
    {
        let mut drained = Vec::new();
        for shard in &self.shards {
            let mut shard = shard.lock().await;
            let matching: Vec<DownloadId> = shard
                .values()
                .filter(|record| f(record))
                .map(|record| record.id)
                .collect();
            for id in matching {
                if let Some(record) = shard.remove(&id) {
                    drained.push(record);
                }
            }
        }
        drained.sort_unstable_by_key(|record| record.id);
        drained
    }

    /// Snapshot every record, sorted by id
    pub async fn list(&self) -> Vec<DownloadOutput> {
        let mut records = Vec::new();
        for shard in &self.shards {
            let shard = shard.lock().await;
            records.extend(shard.values().cloned());
        }
        records.sort_unstable_by_key(|record| record.id);
        records
    }

    /// Count jobs per status
    pub async fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats::default();
        for shard in &self.shards {
            let shard = shard.lock().await;
            for record in shard.values() {
                stats.total += 1;
                match record.status {
                    DownloadStatus::Initial => stats.initial += 1,
                    DownloadStatus::Downloading => stats.downloading += 1,
                    DownloadStatus::Completed => stats.completed += 1,
                    DownloadStatus::Failed => stats.failed += 1,
                }
            }
        }
        stats
    }

    /// Number of records currently stored
    pub async fn len(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.lock().await.len();
        }
        total
    }

    /// Whether the registry holds no records
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DownloadInfo;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn input(url: &str) -> DownloadInput {
        DownloadInput::new(url, "audio", "mp3")
    }

    #[tokio::test]
    async fn create_stores_an_initial_record() {
        let registry = JobRegistry::new(4);
        let id = registry.create(input("https://x/a")).await;

        let record = registry.get(id).await.unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.status, DownloadStatus::Initial);
        assert!(record.info.is_none());
        assert!(record.failure.is_none());
        assert_eq!(record.input.url, "https://x/a");
    }

    #[tokio::test]
    async fn ids_are_monotonic_and_never_reused() {
        let registry = JobRegistry::new(4);
        let first = registry.create(input("https://x/a")).await;
        let second = registry.create(input("https://x/b")).await;
        assert!(second > first, "ids must be monotonically assigned");

        // Removing a record must not recycle its id.
        registry.remove(first).await.unwrap();
        let third = registry.create(input("https://x/c")).await;
        assert!(third > second, "removed ids must never be reassigned");
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let registry = JobRegistry::new(4);
        match registry.get(DownloadId::new(12345)).await {
            Err(Error::NotFound(id)) => assert_eq!(id, 12345_u64),
            other => panic!("expected NotFound, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_applies_transition_atomically() {
        let registry = JobRegistry::new(4);
        let id = registry.create(input("https://x/a")).await;

        registry
            .update(id, |record| {
                record.status = DownloadStatus::Downloading;
                record.attach_info(DownloadInfo::new("https://cdn/a.mp3", "A", "mp3"));
                Ok(())
            })
            .await
            .unwrap();

        let record = registry.get(id).await.unwrap();
        assert_eq!(record.status, DownloadStatus::Downloading);
        assert_eq!(record.info.unwrap().title, "A");
    }

    #[tokio::test]
    async fn failed_update_leaves_the_record_untouched() {
        let registry = JobRegistry::new(4);
        let id = registry.create(input("https://x/a")).await;

        let result: Result<()> = registry
            .update(id, |record| {
                // Mutate, then bail — the mutation must not be observable.
                record.status = DownloadStatus::Downloading;
                Err(Error::AlreadyStarted {
                    id: record.id,
                    status: "downloading".into(),
                })
            })
            .await;
        assert!(result.is_err());

        let record = registry.get(id).await.unwrap();
        assert_eq!(
            record.status,
            DownloadStatus::Initial,
            "record must be unchanged after a failing update closure"
        );
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let registry = JobRegistry::new(4);
        let result = registry
            .update(DownloadId::new(777), |_record| Ok(()))
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn drain_where_removes_and_returns_only_matching_records() {
        let registry = JobRegistry::new(4);
        let keep = registry.create(input("https://x/keep")).await;
        let drop = registry.create(input("https://x/drop")).await;
        registry
            .update(drop, |record| {
                record.status = DownloadStatus::Downloading;
                record.complete();
                Ok(())
            })
            .await
            .unwrap();

        let drained = registry.drain_where(DownloadOutput::is_completed).await;

        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].id, drop, "drained set must hold the removed record");
        assert!(registry.get(keep).await.is_ok());
        assert!(matches!(registry.get(drop).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn drain_where_returns_records_sorted_by_id() {
        let registry = JobRegistry::new(4);
        for i in 0..10 {
            registry.create(input(&format!("https://x/{i}"))).await;
        }

        let drained = registry.drain_where(|_| true).await;
        assert_eq!(drained.len(), 10);
        for pair in drained.windows(2) {
            assert!(pair[0].id < pair[1].id);
        }
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn list_returns_records_sorted_by_id() {
        let registry = JobRegistry::new(4);
        for i in 0..10 {
            registry.create(input(&format!("https://x/{i}"))).await;
        }

        let records = registry.list().await;
        assert_eq!(records.len(), 10);
        for pair in records.windows(2) {
            assert!(pair[0].id < pair[1].id, "list must be sorted by id");
        }
    }

    #[tokio::test]
    async fn stats_counts_each_status() {
        let registry = JobRegistry::new(4);
        let a = registry.create(input("https://x/a")).await;
        let b = registry.create(input("https://x/b")).await;
        let _c = registry.create(input("https://x/c")).await;

        registry
            .update(a, |record| {
                record.status = DownloadStatus::Downloading;
                record.complete();
                Ok(())
            })
            .await
            .unwrap();
        registry
            .update(b, |record| {
                record.status = DownloadStatus::Downloading;
                record.fail("boom");
                Ok(())
            })
            .await
            .unwrap();

        let stats = registry.stats().await;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.initial, 1);
        assert_eq!(stats.downloading, 0);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn concurrent_creates_yield_unique_ids() {
        let registry = Arc::new(JobRegistry::new(8));

        let mut handles = Vec::new();
        for i in 0..100 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.create(input(&format!("https://x/{i}"))).await
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            let id = handle.await.unwrap();
            assert!(seen.insert(id), "id {id} was handed out twice");
        }
        assert_eq!(registry.len().await, 100);
    }

    #[tokio::test]
    async fn zero_shard_count_is_clamped_to_one() {
        let registry = JobRegistry::new(0);
        let id = registry.create(input("https://x/a")).await;
        assert!(registry.get(id).await.is_ok());
    }
}
