//! # Telemetry Reconciler
//!
//! Merges snapshot batches into the marker board. Markers are created on
//! first sight and updated in place afterwards; a marker is only ever
//! recreated after [`Reconciler::forget`].

use std::collections::BTreeMap;

use sentinel_domain::TelemetryRecord;
use tracing::{debug, warn};

use crate::marker::{MarkerBoard, VisualMarker};
use crate::presentation::{popup_for, present};
use crate::renderer::MapRenderer;

/// What a single `reconcile` call did, by call sign.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
    /// Entries without a usable position
    pub malformed: Vec<String>,
    /// Entries older than what the marker already shows
    pub stale: Vec<String>,
}

impl ReconcileReport {
    pub fn changed(&self) -> usize {
        self.created.len() + self.updated.len()
    }

    pub fn skipped(&self) -> usize {
        self.malformed.len() + self.stale.len()
    }
}

enum Change {
    Created(VisualMarker),
    Updated(VisualMarker),
}

/// Applies snapshot batches to a [`MarkerBoard`] and a [`MapRenderer`].
pub struct Reconciler<R> {
    board: MarkerBoard,
    renderer: R,
    next_marker_id: u64,
}

impl<R: MapRenderer> Reconciler<R> {
    pub fn new(renderer: R) -> Self {
        Self::with_board(MarkerBoard::default(), renderer)
    }

    pub fn with_board(board: MarkerBoard, renderer: R) -> Self {
        let next_marker_id = board.read().values().map(|m| m.id + 1).max().unwrap_or(1);
        Self {
            board,
            renderer,
            next_marker_id,
        }
    }

    /// Handle on the marker board, shareable with readers.
    pub fn board(&self) -> MarkerBoard {
        self.board.clone()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Merge one snapshot batch.
    ///
    /// All marker updates are applied under one write lock; the renderer is
    /// called afterwards with the fully updated markers. Malformed and stale
    /// entries are skipped one by one. Applying the same batch twice leaves
    /// the board unchanged and issues no renderer calls the second time.
    pub fn reconcile(&mut self, batch: &BTreeMap<String, TelemetryRecord>) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut changes = Vec::new();

        {
            let mut markers = self.board.write();

            for (call_sign, record) in batch {
                let snapshot = match record.snapshot() {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        warn!(%call_sign, error = %err, "Skipping malformed telemetry entry");
                        report.malformed.push(call_sign.clone());
                        continue;
                    }
                };

                let presentation =
                    present(snapshot.threat_level.as_deref(), snapshot.report.as_deref());
                let popup_content = popup_for(call_sign, &presentation);

                match markers.get_mut(call_sign) {
                    Some(marker) => {
                        if let (Some(incoming), Some(seen)) =
                            (snapshot.timestamp, marker.observed_at)
                        {
                            if incoming < seen {
                                debug!(%call_sign, incoming, seen, "Skipping stale telemetry entry");
                                report.stale.push(call_sign.clone());
                                continue;
                            }
                        }

                        let observed_at = snapshot.timestamp.or(marker.observed_at);
                        let unchanged = marker.position == snapshot.position
                            && marker.color == presentation.color
                            && marker.label == presentation.label
                            && marker.popup_content == popup_content
                            && marker.observed_at == observed_at;
                        if unchanged {
                            report.unchanged.push(call_sign.clone());
                            continue;
                        }

                        marker.position = snapshot.position;
                        marker.color = presentation.color;
                        marker.label = presentation.label;
                        marker.popup_content = popup_content;
                        marker.observed_at = observed_at;

                        report.updated.push(call_sign.clone());
                        changes.push(Change::Updated(marker.clone()));
                    }
                    None => {
                        let marker = VisualMarker {
                            id: self.next_marker_id,
                            call_sign: call_sign.clone(),
                            position: snapshot.position,
                            color: presentation.color,
                            label: presentation.label,
                            popup_content,
                            observed_at: snapshot.timestamp,
                        };
                        self.next_marker_id += 1;

                        markers.insert(call_sign.clone(), marker.clone());
                        report.created.push(call_sign.clone());
                        changes.push(Change::Created(marker));
                    }
                }
            }
        }

        for change in &changes {
            match change {
                Change::Created(marker) => self.renderer.add_marker(marker),
                Change::Updated(marker) => self.renderer.update_marker(marker),
            }
        }

        debug!(
            created = report.created.len(),
            updated = report.updated.len(),
            unchanged = report.unchanged.len(),
            skipped = report.skipped(),
            "Batch reconciled"
        );

        report
    }

    /// Drop a unit's marker, e.g. after it was decommissioned.
    pub fn forget(&mut self, call_sign: &str) -> bool {
        let removed = self.board.write().remove(call_sign).is_some();
        if removed {
            self.renderer.remove_marker(call_sign);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::{ALERT_COLOR, NOMINAL_COLOR};
    use sentinel_domain::{GeoPoint, PositionLookup};

    #[derive(Debug, Default)]
    struct RecordingRenderer {
        calls: Vec<String>,
    }

    impl MapRenderer for RecordingRenderer {
        fn add_marker(&mut self, marker: &VisualMarker) {
            self.calls.push(format!("add:{}", marker.call_sign));
        }

        fn update_marker(&mut self, marker: &VisualMarker) {
            self.calls.push(format!("update:{}", marker.call_sign));
        }

        fn remove_marker(&mut self, call_sign: &str) {
            self.calls.push(format!("remove:{call_sign}"));
        }
    }

    fn record(lat: f64, lng: f64, threat: Option<&str>, ts: i64) -> TelemetryRecord {
        TelemetryRecord {
            lat: Some(lat),
            lng: Some(lng),
            alt: Some(170.0),
            battery: Some(80.0),
            threat_level: threat.map(String::from),
            report: threat.map(|_| "armed convoy".to_string()),
            timestamp: Some(ts),
        }
    }

    fn batch(entries: &[(&str, TelemetryRecord)]) -> BTreeMap<String, TelemetryRecord> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_first_snapshot_creates_markers() {
        let mut reconciler = Reconciler::new(RecordingRenderer::default());
        let report = reconciler.reconcile(&batch(&[
            ("EAGLE-01", record(44.42, 26.10, None, 1)),
            ("HAWK-02", record(44.43, 26.11, Some("THREAT"), 1)),
        ]));

        assert_eq!(report.created, vec!["EAGLE-01", "HAWK-02"]);
        let board = reconciler.board();
        assert_eq!(board.len(), 2);
        assert_eq!(board.get("HAWK-02").unwrap().color, ALERT_COLOR);
        assert_eq!(board.get("EAGLE-01").unwrap().color, NOMINAL_COLOR);
        assert_eq!(reconciler.renderer().calls, vec!["add:EAGLE-01", "add:HAWK-02"]);
    }

    #[test]
    fn test_updates_in_place_without_recreating() {
        let mut reconciler = Reconciler::new(RecordingRenderer::default());
        reconciler.reconcile(&batch(&[("EAGLE-01", record(44.42, 26.10, None, 1))]));
        let created = reconciler.board().get("EAGLE-01").unwrap();

        let report =
            reconciler.reconcile(&batch(&[("EAGLE-01", record(44.45, 26.12, Some("THREAT"), 2))]));
        assert_eq!(report.updated, vec!["EAGLE-01"]);

        let updated = reconciler.board().get("EAGLE-01").unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.position, GeoPoint::new(44.45, 26.12));
        assert_eq!(updated.color, ALERT_COLOR);
        assert!(updated.popup_content.contains("armed convoy"));
        assert_eq!(reconciler.renderer().calls, vec!["add:EAGLE-01", "update:EAGLE-01"]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut reconciler = Reconciler::new(RecordingRenderer::default());
        let snapshot = batch(&[
            ("EAGLE-01", record(44.42, 26.10, Some("SAFE"), 5)),
            ("HAWK-02", record(44.43, 26.11, Some("THREAT"), 5)),
        ]);

        reconciler.reconcile(&snapshot);
        let first = reconciler.board().snapshot();
        let report = reconciler.reconcile(&snapshot);
        let second = reconciler.board().snapshot();

        assert_eq!(first, second);
        assert_eq!(report.unchanged.len(), 2);
        assert_eq!(report.changed(), 0);
        assert_eq!(reconciler.renderer().calls.len(), 2);
    }

    #[test]
    fn test_malformed_entries_are_skipped_individually() {
        let mut reconciler = Reconciler::new(RecordingRenderer::default());
        let broken = TelemetryRecord {
            lat: Some(44.0),
            lng: None,
            ..Default::default()
        };
        let report = reconciler.reconcile(&batch(&[
            ("BROKEN-00", broken),
            ("EAGLE-01", record(44.42, 26.10, None, 1)),
        ]));

        assert_eq!(report.malformed, vec!["BROKEN-00"]);
        assert_eq!(report.created, vec!["EAGLE-01"]);
        assert!(reconciler.board().get("BROKEN-00").is_none());
    }

    #[test]
    fn test_stale_entries_do_not_roll_back() {
        let mut reconciler = Reconciler::new(RecordingRenderer::default());
        reconciler.reconcile(&batch(&[("EAGLE-01", record(44.45, 26.12, None, 10))]));
        let report = reconciler.reconcile(&batch(&[("EAGLE-01", record(44.40, 26.00, None, 9))]));

        assert_eq!(report.stale, vec!["EAGLE-01"]);
        assert_eq!(
            reconciler.board().get("EAGLE-01").unwrap().position,
            GeoPoint::new(44.45, 26.12)
        );
    }

    #[test]
    fn test_forget_allows_fresh_marker() {
        let mut reconciler = Reconciler::new(RecordingRenderer::default());
        let snapshot = batch(&[("EAGLE-01", record(44.42, 26.10, None, 1))]);
        reconciler.reconcile(&snapshot);
        let first_id = reconciler.board().get("EAGLE-01").unwrap().id;

        assert!(reconciler.forget("EAGLE-01"));
        assert!(!reconciler.forget("EAGLE-01"));
        reconciler.reconcile(&snapshot);

        assert_ne!(reconciler.board().get("EAGLE-01").unwrap().id, first_id);
        assert_eq!(
            reconciler.renderer().calls,
            vec!["add:EAGLE-01", "remove:EAGLE-01", "add:EAGLE-01"]
        );
    }

    #[test]
    fn test_board_serves_last_known_positions() {
        let mut reconciler = Reconciler::new(RecordingRenderer::default());
        reconciler.reconcile(&batch(&[("EAGLE-01", record(44.42, 26.10, None, 1))]));
        let board = reconciler.board();
        assert_eq!(board.last_known("EAGLE-01"), Some(GeoPoint::new(44.42, 26.10)));
        assert_eq!(board.last_known("GHOST-09"), None);
    }
}
