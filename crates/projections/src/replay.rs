//! Rebuilds the projection snapshot from the full event log.

use std::sync::Arc;
use std::time::Instant;

use event_store::EventLog;
use futures_util::StreamExt;
use tokio::sync::Mutex;

use crate::histogram::EventHistogram;
use crate::projection::Projection;
use crate::{ProjectionSnapshot, Result, store::ProjectionStore};

/// Replays the event log into a fresh [`EventHistogram`] and persists the
/// result as the next projection version.
///
/// Every call recomputes from scratch. The same log always yields the same
/// checksum, while the version increments on every call. Replays within one
/// service are serialized so no two of them can claim the same version.
#[derive(Clone)]
pub struct ProjectionReplayService {
    log: Arc<dyn EventLog>,
    store: Arc<dyn ProjectionStore>,
    replay_lock: Arc<Mutex<()>>,
}

impl ProjectionReplayService {
    pub fn new(log: Arc<dyn EventLog>, store: Arc<dyn ProjectionStore>) -> Self {
        Self {
            log,
            store,
            replay_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Folds the whole log and stores a new snapshot version.
    #[tracing::instrument(skip(self))]
    pub async fn replay(&self) -> Result<ProjectionSnapshot> {
        let _guard = self.replay_lock.lock().await;
        let started = Instant::now();

        let mut histogram = EventHistogram::new();
        let mut stream = self.log.stream_all().await?;
        while let Some(event) = stream.next().await {
            histogram.handle(&event?);
        }

        let replay_checkpoint = histogram.position().events_processed;
        let counters = histogram.into_counters();
        let checksum = ProjectionSnapshot::compute_checksum(replay_checkpoint, &counters)?;
        let replay_duration_ms = started.elapsed().as_millis() as u64;

        let previous = self.store.load().await?;
        let snapshot = ProjectionSnapshot {
            projection_version: previous.projection_version + 1,
            replay_checkpoint,
            replay_duration_ms,
            checksum,
            counters,
        };
        self.store.save(&snapshot).await?;

        metrics::counter!("projection_replays_total").increment(1);
        metrics::histogram!("projection_replay_duration_ms").record(replay_duration_ms as f64);
        tracing::info!(
            version = snapshot.projection_version,
            checkpoint = snapshot.replay_checkpoint,
            "projection replay complete"
        );

        Ok(snapshot)
    }

    /// Returns the last stored snapshot without recomputing.
    pub async fn snapshot(&self) -> Result<ProjectionSnapshot> {
        self.store.load().await
    }
}
