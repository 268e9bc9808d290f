//! Dashboard event loop: feeds every inbound batch to the reconciler.

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::marker::MarkerBoard;
use crate::reconciler::Reconciler;
use crate::renderer::MapRenderer;
use crate::subscription::TelemetrySubscription;

/// Totals over the lifetime of one [`drive`] loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveSummary {
    pub batches: usize,
    pub skipped_entries: usize,
}

/// Reconcile batches until the subscription closes.
pub async fn drive<R: MapRenderer>(
    mut subscription: TelemetrySubscription,
    reconciler: &mut Reconciler<R>,
) -> DriveSummary {
    let mut summary = DriveSummary::default();

    while let Some(batch) = subscription.recv().await {
        let report = reconciler.reconcile(&batch);
        summary.batches += 1;
        summary.skipped_entries += report.skipped();
        debug!(
            batch = summary.batches,
            units = batch.len(),
            changed = report.changed(),
            "Snapshot applied"
        );
    }

    info!(
        batches = summary.batches,
        skipped = summary.skipped_entries,
        "Telemetry subscription closed"
    );
    summary
}

/// A dashboard loop running on its own task.
#[derive(Debug)]
pub struct DashboardHandle {
    board: MarkerBoard,
    task: JoinHandle<DriveSummary>,
}

impl DashboardHandle {
    /// Spawn [`drive`] for `reconciler` on the current runtime.
    pub fn spawn<R>(subscription: TelemetrySubscription, mut reconciler: Reconciler<R>) -> Self
    where
        R: MapRenderer + 'static,
    {
        let board = reconciler.board();
        let task = tokio::spawn(async move { drive(subscription, &mut reconciler).await });
        Self { board, task }
    }

    /// Live marker state, readable while the loop runs.
    pub fn board(&self) -> MarkerBoard {
        self.board.clone()
    }

    /// Wait for the loop to end (the bus must be dropped first).
    pub async fn join(self) -> Option<DriveSummary> {
        self.task.await.ok()
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}
