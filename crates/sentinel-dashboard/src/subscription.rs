//! # Telemetry Subscription
//!
//! Broadcast bus carrying immutable snapshot batches from the relay to any
//! number of dashboards.

use sentinel_domain::SnapshotBatch;
use tokio::sync::broadcast;
use tracing::warn;

/// Default number of batches a slow subscriber may fall behind
pub const DEFAULT_CAPACITY: usize = 1024;

/// Publishing side of the snapshot bus.
#[derive(Debug, Clone)]
pub struct TelemetryBus {
    tx: broadcast::Sender<SnapshotBatch>,
}

impl TelemetryBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Push a batch to every live subscriber. Returns how many received it;
    /// zero subscribers is not an error.
    pub fn publish(&self, batch: SnapshotBatch) -> usize {
        self.tx.send(batch).unwrap_or(0)
    }

    pub fn subscribe(&self) -> TelemetrySubscription {
        TelemetrySubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for TelemetryBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Receiving side of the snapshot bus.
#[derive(Debug)]
pub struct TelemetrySubscription {
    rx: broadcast::Receiver<SnapshotBatch>,
}

impl TelemetrySubscription {
    /// Next batch, or `None` once the bus is gone.
    ///
    /// Every batch is a full snapshot, so batches lost to lag are skipped
    /// rather than replayed.
    pub async fn recv(&mut self) -> Option<SnapshotBatch> {
        loop {
            match self.rx.recv().await {
                Ok(batch) => return Some(batch),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Telemetry subscriber lagged, skipping to latest batch");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
