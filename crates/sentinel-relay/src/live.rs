//! # Live Telemetry
//!
//! The relay's live map: last known state per call sign. Every change is
//! pushed to the bus as a full, immutable snapshot batch.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sentinel_dashboard::{TelemetryBus, TelemetrySubscription};
use sentinel_domain::{GeoPoint, SnapshotBatch, TelemetryPayload, TelemetryRecord, ThreatLevel};
use tracing::{debug, info, warn};

use crate::classifier::ReportClassifier;
use crate::error::{RelayError, RelayResult};

/// Body of `POST /api/drones/{callSign}/ping`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingRequest {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub alt: Option<f64>,
    #[serde(default, alias = "batt")]
    pub battery: Option<f64>,
    #[serde(default)]
    pub report: Option<String>,
}

impl From<&TelemetryPayload> for PingRequest {
    fn from(payload: &TelemetryPayload) -> Self {
        Self {
            lat: payload.lat,
            lng: payload.lng,
            alt: Some(payload.alt),
            battery: Some(f64::from(payload.battery)),
            report: Some(payload.report.clone()),
        }
    }
}

/// Live telemetry map plus the bus it publishes on.
pub struct LiveTelemetry {
    entries: RwLock<BTreeMap<String, TelemetryRecord>>,
    bus: TelemetryBus,
    classifier: Arc<dyn ReportClassifier>,
}

impl LiveTelemetry {
    pub fn new(bus: TelemetryBus, classifier: Arc<dyn ReportClassifier>) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            bus,
            classifier,
        }
    }

    /// Merge one ping into the live map and publish the new snapshot.
    ///
    /// Position, altitude, battery and `last_seen` are overwritten; the
    /// verdict and report only change when the ping carries a non-empty
    /// report, so a unit keeps its last verdict between reports.
    pub async fn ingest(&self, call_sign: &str, ping: PingRequest) -> RelayResult<TelemetryRecord> {
        let call_sign = call_sign.trim();
        if call_sign.is_empty() {
            return Err(RelayError::InvalidInput("call sign is mandatory".to_string()));
        }
        GeoPoint::new(ping.lat, ping.lng).validate()?;

        let report = ping.report.filter(|r| !r.trim().is_empty());
        let verdict = match &report {
            Some(report) => {
                let level = self.classifier.classify(report).await;
                debug!(call_sign, %level, "Report classified");
                if level == ThreatLevel::Threat {
                    warn!(call_sign, report = %report, lat = ping.lat, lng = ping.lng, "Threat reported");
                }
                Some(level)
            }
            None => None,
        };

        let mut entries = self.write();
        let record = entries.entry(call_sign.to_string()).or_default();
        record.lat = Some(ping.lat);
        record.lng = Some(ping.lng);
        record.alt = ping.alt.or(record.alt);
        record.battery = ping.battery.or(record.battery);
        record.timestamp = Some(Utc::now().timestamp_millis());
        if let (Some(level), Some(report)) = (verdict, report) {
            record.threat_level = Some(level.as_str().to_string());
            record.report = Some(report);
        }
        let stored = record.clone();

        // Published under the lock so batches leave in write order.
        let receivers = self.bus.publish(Arc::new(entries.clone()));
        drop(entries);

        debug!(call_sign, receivers, "Telemetry ingested");
        Ok(stored)
    }

    /// Drop a unit from the live map. Publishes only when something changed.
    pub fn remove(&self, call_sign: &str) -> bool {
        let mut entries = self.write();
        if entries.remove(call_sign).is_none() {
            return false;
        }
        self.bus.publish(Arc::new(entries.clone()));
        drop(entries);

        info!(call_sign, "Unit dropped from live telemetry");
        true
    }

    pub fn snapshot(&self) -> SnapshotBatch {
        Arc::new(
            self.entries
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        )
    }

    pub fn subscribe(&self) -> TelemetrySubscription {
        self.bus.subscribe()
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, TelemetryRecord>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
