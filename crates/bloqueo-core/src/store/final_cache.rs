//! FinalStatusCache - terminal task outcomes kept for 30 minutes.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{BlobError, BloqueoError, CacheEntry, TaskStatus, Tid};
use crate::ports::{BlobStore, Clock};

use super::lock::BlobLock;
use super::to_pretty_json;

pub const FINAL_STATUS_BLOB_NAME: &str = "final_status_cache.json";

/// Cache contents, keyed by tid.
pub type CacheMap = BTreeMap<Tid, CacheEntry>;

/// FinalStatusCache is a JSON object blob of [`CacheEntry`] keyed by tid.
///
/// # Design
/// - writes go through [`BlobLock`]; under contention the write is dropped
/// - sweeps are not locked: a sweep only removes entries that are already dead
/// - writers never replace a cache blob they could not decode
pub struct FinalStatusCache {
    blobs: Arc<dyn BlobStore>,
    lock: BlobLock,
    clock: Arc<dyn Clock>,
}

impl FinalStatusCache {
    pub fn new(blobs: Arc<dyn BlobStore>, lock: BlobLock, clock: Arc<dyn Clock>) -> Self {
        Self { blobs, lock, clock }
    }

    pub fn lock(&self) -> &BlobLock {
        &self.lock
    }

    /// Whole cache; empty on a missing or corrupt blob.
    pub async fn load(&self) -> CacheMap {
        self.try_load().await.unwrap_or_else(|err| {
            warn!(blob = FINAL_STATUS_BLOB_NAME, error = %err, "final-status cache unreadable");
            CacheMap::new()
        })
    }

    async fn try_load(&self) -> Result<CacheMap, BloqueoError> {
        match self.blobs.get(FINAL_STATUS_BLOB_NAME).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(BlobError::NotFound(_)) => Ok(CacheMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, cache: &CacheMap) -> Result<(), BloqueoError> {
        let body = to_pretty_json(cache)?;
        self.blobs.put(FINAL_STATUS_BLOB_NAME, body).await?;
        Ok(())
    }

    /// Upsert the outcome of `tid`, live until now + 30 minutes.
    ///
    /// Returns `Ok(false)` when the lock is held elsewhere; the update is
    /// dropped, not retried. The lock is released even if saving fails.
    pub async fn set_final(
        &self,
        tid: &Tid,
        status: TaskStatus,
        cliente: &str,
    ) -> Result<bool, BloqueoError> {
        let written = self
            .lock
            .with_lock(|| async move {
                let mut cache = self.try_load().await?;
                cache.insert(tid.clone(), CacheEntry::new(status, cliente, self.clock.now()));
                self.save(&cache).await
            })
            .await;

        match written {
            Some(result) => result.map(|()| true),
            None => {
                warn!(tid = %tid, status = %status, "final-status cache locked; update dropped");
                Ok(false)
            }
        }
    }

    /// Live entry for `tid`, if any.
    pub async fn get(&self, tid: &Tid) -> Option<CacheEntry> {
        let now = self.clock.now();
        self.load()
            .await
            .remove(tid)
            .filter(|entry| entry.is_live(now))
    }

    /// Drop every entry whose expiration has passed. Writes back only when
    /// something was removed; returns how many entries were dropped.
    pub async fn sweep_expired(&self) -> Result<usize, BloqueoError> {
        let mut cache = self.try_load().await?;
        let now = self.clock.now();
        let before = cache.len();
        cache.retain(|_, entry| entry.is_live(now));

        let removed = before - cache.len();
        if removed > 0 {
            self.save(&cache).await?;
            info!(removed, remaining = cache.len(), "expired final-status entries swept");
        }
        Ok(removed)
    }
}
