//! Last known positions read from the relay's live map.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use reqwest::Client;
use sentinel_domain::{GeoPoint, PositionLookup, TelemetryRecord};
use tracing::debug;

use crate::error::RegistryError;

/// Positions taken from one telemetry snapshot, keyed by call sign.
#[derive(Debug, Clone, Default)]
pub struct SnapshotPositions {
    positions: HashMap<String, GeoPoint>,
}

impl SnapshotPositions {
    /// Keep every entry with a usable position; malformed ones are skipped.
    pub fn from_batch(batch: &BTreeMap<String, TelemetryRecord>) -> Self {
        let positions = batch
            .iter()
            .filter_map(|(call_sign, record)| match record.snapshot() {
                Ok(snapshot) => Some((call_sign.clone(), snapshot.position)),
                Err(err) => {
                    debug!(%call_sign, error = %err, "Skipping entry without a position");
                    None
                }
            })
            .collect();
        Self { positions }
    }

    /// Fetch `GET /api/telemetry` once.
    pub async fn fetch(base_url: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let client = Client::builder().timeout(timeout).build()?;
        let url = format!("{}/api/telemetry", base_url.trim_end_matches('/'));
        let response = client.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Status { status, body });
        }
        let batch: BTreeMap<String, TelemetryRecord> = response.json().await?;
        Ok(Self::from_batch(&batch))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl PositionLookup for SnapshotPositions {
    fn last_known(&self, call_sign: &str) -> Option<GeoPoint> {
        self.positions.get(call_sign).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::loopback::LoopbackPublisher;
    use crate::publisher::TelemetryPublisher;
    use crate::session::SessionManager;
    use sentinel_dashboard::TelemetryBus;
    use sentinel_domain::{NewUnit, TelemetryPayload, Unit};
    use sentinel_relay::{KeywordClassifier, LiveTelemetry};
    use std::sync::Arc;

    fn payload(lat: f64, lng: f64) -> TelemetryPayload {
        TelemetryPayload {
            lat,
            lng,
            alt: 170.0,
            battery: 80,
            report: "Sector clear.".into(),
        }
    }

    async fn live_with_pings() -> Arc<LiveTelemetry> {
        let live = Arc::new(LiveTelemetry::new(
            TelemetryBus::new(16),
            Arc::new(KeywordClassifier::default()),
        ));
        let publisher = LoopbackPublisher::new(live.clone());
        publisher.send("EAGLE-01", &payload(44.51, 26.21)).await.unwrap();
        publisher.send("HAWK-02", &payload(44.33, 26.05)).await.unwrap();
        live
    }

    #[tokio::test]
    async fn test_positions_follow_live_snapshot() {
        let live = live_with_pings().await;
        let mut batch = (*live.snapshot()).clone();
        batch.insert("GHOST-09".into(), TelemetryRecord::default());

        let positions = SnapshotPositions::from_batch(&batch);
        assert_eq!(positions.len(), 2);
        assert_eq!(positions.last_known("EAGLE-01"), Some(GeoPoint::new(44.51, 26.21)));
        assert_eq!(positions.last_known("HAWK-02"), Some(GeoPoint::new(44.33, 26.05)));
        assert_eq!(positions.last_known("GHOST-09"), None);
        assert!(SnapshotPositions::default().is_empty());
    }

    #[tokio::test]
    async fn test_sessions_resume_from_relay_positions() {
        let live = live_with_pings().await;
        let positions = SnapshotPositions::from_batch(&live.snapshot());
        let mut sessions = SessionManager::new(
            SimulationConfig::default(),
            Arc::new(LoopbackPublisher::new(live.clone())),
        )
        .unwrap()
        .with_positions(Arc::new(positions));

        let eagle = Unit::enlist(NewUnit {
            call_sign: "EAGLE-01".into(),
            model: "MQ-9".into(),
            battery_capacity: None,
        })
        .unwrap();
        sessions.start(&eagle).unwrap();
        assert_eq!(sessions.position(eagle.id), Some(GeoPoint::new(44.51, 26.21)));
        sessions.stop_all();
    }
}
