//! CacheSweepLoop - periodic cleanup of the final-status cache.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::orchestrator::Orchestrator;

/// CacheSweepLoop drops expired final-status entries on a fixed period.
///
/// # Flow
/// 1. wait for the next tick
/// 2. load the cache, keep live entries
/// 3. write back only if something expired
///
/// Runs until its task is aborted.
pub struct CacheSweepLoop {
    orchestrator: Arc<Orchestrator>,
    every: Duration,
}

impl CacheSweepLoop {
    pub fn new(orchestrator: Arc<Orchestrator>, every: Duration) -> Self {
        Self {
            orchestrator,
            every: every.max(Duration::from_secs(1)),
        }
    }

    /// One sweep. Errors are logged; returns the number of entries removed.
    pub async fn tick(&self) -> usize {
        match self.orchestrator.sweep_final_cache().await {
            Ok(removed) => {
                debug!(removed, "final-status cache sweep finished");
                removed
            }
            Err(err) => {
                warn!(error = %err, "final-status cache sweep failed");
                0
            }
        }
    }

    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }
}
