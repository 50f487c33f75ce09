//! AppBuilder - wiring of ports into an Orchestrator.
//!
//! The blob store handle is created once at process start and shared by
//! every component for the lifetime of the process.

use std::sync::Arc;

use chrono::Duration;
use tracing::info;

use crate::ports::{BlobStore, Clock, IdGenerator, SystemClock, UlidGenerator};
use crate::store::{BlobLock, FinalStatusCache, TaskStore};

use super::orchestrator::Orchestrator;
use super::sweep_loop::CacheSweepLoop;

/// AppBuilder assembles an [`App`].
///
/// # Example
/// ```ignore
/// let app = AppBuilder::new(Arc::new(InMemoryBlobStore::new()))
///     .lock_lease(Duration::minutes(10))
///     .build()
///     .await?;
/// ```
///
/// # Defaults
/// - clock: [`SystemClock`]
/// - ids: [`UlidGenerator`] over the chosen clock
/// - lock lease: none (an abandoned lock is held forever)
pub struct AppBuilder {
    blobs: Arc<dyn BlobStore>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    lock_lease: Option<Duration>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("lock lease must be positive, got {0}")]
    NonPositiveLease(Duration),
}

impl AppBuilder {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            blobs,
            clock: None,
            ids: None,
            lock_lease: None,
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn lock_lease(mut self, lease: Duration) -> Self {
        self.lock_lease = Some(lease);
        self
    }

    /// Validate the settings, make sure the container exists and wire the app.
    ///
    /// A container that cannot be created is logged, not fatal: it usually
    /// already exists.
    pub async fn build(self) -> Result<App, BuildError> {
        if let Some(lease) = self.lock_lease.filter(|lease| *lease <= Duration::zero()) {
            return Err(BuildError::NonPositiveLease(lease));
        }

        if let Err(err) = self.blobs.create_container().await {
            info!(error = %err, "container already exists or could not be created");
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));

        let mut lock = BlobLock::new(Arc::clone(&self.blobs), Arc::clone(&clock));
        if let Some(lease) = self.lock_lease {
            lock = lock.with_lease(lease);
        }

        let tasks = TaskStore::new(Arc::clone(&self.blobs));
        let cache = FinalStatusCache::new(Arc::clone(&self.blobs), lock, Arc::clone(&clock));

        Ok(App {
            orchestrator: Arc::new(Orchestrator::new(tasks, cache, ids, clock)),
        })
    }
}

/// App is the wired application core.
pub struct App {
    pub orchestrator: Arc<Orchestrator>,
}

impl App {
    /// A sweep loop over this app's final-status cache.
    pub fn sweep_loop(&self, every: std::time::Duration) -> CacheSweepLoop {
        CacheSweepLoop::new(Arc::clone(&self.orchestrator), every)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryBlobStore;

    #[tokio::test]
    async fn test_build_with_defaults() {
        let app = AppBuilder::new(Arc::new(InMemoryBlobStore::new())).build().await;
        assert!(app.is_ok());
    }

    #[tokio::test]
    async fn test_build_rejects_non_positive_lease() {
        let app = AppBuilder::new(Arc::new(InMemoryBlobStore::new()))
            .lock_lease(Duration::zero())
            .build()
            .await;
        assert!(matches!(app, Err(BuildError::NonPositiveLease(_))));
    }

    #[tokio::test]
    async fn test_build_creates_local_container() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("tasks");
        let blobs = Arc::new(crate::impls::LocalBlobStore::new(&root));

        AppBuilder::new(blobs).build().await.unwrap();
        assert!(root.is_dir());
    }
}
