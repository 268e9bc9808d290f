//! # Sentinel Grid - Domain Model
//!
//! Units, waypoints and telemetry shared by the simulator, the relay and the
//! dashboard. The telemetry wire keys (`threat_level`, `last_report`,
//! `batt`, `last_seen`) are the ones the live map has always published.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// VALUE OBJECTS
// =============================================================================

/// A position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Planar distance in degrees. This is the metric the steering logic
    /// works in.
    #[must_use]
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        (other.lat - self.lat).hypot(other.lng - self.lng)
    }

    /// Reject NaN/infinite values and out-of-range coordinates.
    pub fn validate(&self) -> Result<(), DomainError> {
        let in_range = self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng);
        if in_range {
            Ok(())
        } else {
            Err(DomainError::InvalidCoordinates {
                lat: self.lat,
                lng: self.lng,
            })
        }
    }
}

impl Default for GeoPoint {
    fn default() -> Self {
        // Bucharest, the default map centre
        Self {
            lat: 44.4268,
            lng: 26.1025,
        }
    }
}

/// Operator-assigned target for a single unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub target_lat: f64,
    pub target_lng: f64,
}

impl Waypoint {
    pub fn new(target_lat: f64, target_lng: f64) -> Result<Self, DomainError> {
        GeoPoint::new(target_lat, target_lng).validate()?;
        Ok(Self {
            target_lat,
            target_lng,
        })
    }

    #[must_use]
    pub const fn target(&self) -> GeoPoint {
        GeoPoint::new(self.target_lat, self.target_lng)
    }
}

// =============================================================================
// ENUMS
// =============================================================================

/// Registry status of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    #[default]
    Offline,
    Active,
}

/// Verdict attached to a unit's last report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatLevel {
    Safe,
    Suspicious,
    Threat,
    Unknown,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Suspicious => "SUSPICIOUS",
            Self::Threat => "THREAT",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Lenient parse of a verdict string; anything unrecognised is `Unknown`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SAFE" => Self::Safe,
            "SUSPICIOUS" => Self::Suspicious,
            "THREAT" => Self::Threat,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ENTITY TYPES
// =============================================================================

/// Registered unit. Identity is `id`; `call_sign` is the display key used by
/// telemetry and the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: Uuid,
    pub call_sign: String,
    pub model: String,
    #[serde(default)]
    pub status: UnitStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_capacity: Option<u32>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Unit {
    /// Enlist a new unit. New units always start `OFFLINE`.
    pub fn enlist(request: NewUnit) -> Result<Self, DomainError> {
        request.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            call_sign: request.call_sign.trim().to_string(),
            model: request.model,
            status: UnitStatus::Offline,
            battery_capacity: request.battery_capacity,
            created_at: Utc::now(),
        })
    }
}

/// Registration request for a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUnit {
    #[serde(default)]
    pub call_sign: String,
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_capacity: Option<u32>,
}

impl NewUnit {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.call_sign.trim().is_empty() {
            return Err(DomainError::MissingCallSign);
        }
        Ok(())
    }
}

// =============================================================================
// TELEMETRY
// =============================================================================

/// Body of a single ping from a unit (or from the simulator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPayload {
    pub lat: f64,
    pub lng: f64,
    pub alt: f64,
    pub battery: u8,
    pub report: String,
}

impl TelemetryPayload {
    #[must_use]
    pub const fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// One entry of the live telemetry map as it travels on the bus.
///
/// Every field is optional on the wire; [`TelemetryRecord::snapshot`] is the
/// validation step consumers use before trusting it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
    #[serde(rename = "batt", alias = "battery", default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_level: Option<String>,
    #[serde(rename = "last_report", alias = "report", default, skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    /// Milliseconds since the Unix epoch
    #[serde(rename = "last_seen", alias = "timestamp", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl TelemetryRecord {
    /// Validate the entry into a [`TelemetrySnapshot`].
    pub fn snapshot(&self) -> Result<TelemetrySnapshot, DomainError> {
        let (Some(lat), Some(lng)) = (self.lat, self.lng) else {
            return Err(DomainError::MissingPosition);
        };
        let position = GeoPoint::new(lat, lng);
        position.validate()?;

        Ok(TelemetrySnapshot {
            position,
            alt: self.alt,
            battery: self.battery,
            threat_level: self.threat_level.clone(),
            report: self.report.clone(),
            timestamp: self.timestamp,
        })
    }
}

/// A validated observation of one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub position: GeoPoint,
    pub alt: Option<f64>,
    pub battery: Option<f64>,
    pub threat_level: Option<String>,
    pub report: Option<String>,
    pub timestamp: Option<i64>,
}

/// Immutable snapshot of the whole live map, keyed by call sign.
pub type SnapshotBatch = Arc<BTreeMap<String, TelemetryRecord>>;

/// Source of the last position a unit was observed at.
pub trait PositionLookup: Send + Sync {
    fn last_known(&self, call_sign: &str) -> Option<GeoPoint>;
}

// =============================================================================
// ERRORS
// =============================================================================

/// Domain-level errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Call sign is mandatory")]
    MissingCallSign,

    #[error("Telemetry entry has no position")]
    MissingPosition,

    #[error("Invalid coordinates: lat={lat}, lng={lng}")]
    InvalidCoordinates { lat: f64, lng: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::Fake;
    use fake::faker::lorem::en::Word;

    fn call_sign() -> String {
        let word: String = Word().fake();
        let number: u16 = (1..99).fake();
        format!("{}-{number:02}", word.to_uppercase())
    }

    #[test]
    fn test_threat_level_parse_is_lenient() {
        assert_eq!(ThreatLevel::parse("THREAT"), ThreatLevel::Threat);
        assert_eq!(ThreatLevel::parse(" threat\n"), ThreatLevel::Threat);
        assert_eq!(ThreatLevel::parse("Suspicious"), ThreatLevel::Suspicious);
        assert_eq!(ThreatLevel::parse("maybe"), ThreatLevel::Unknown);
    }

    #[test]
    fn test_enlist_requires_call_sign() {
        let err = Unit::enlist(NewUnit {
            call_sign: "  ".into(),
            model: "Bayraktar".into(),
            battery_capacity: None,
        })
        .unwrap_err();
        assert_eq!(err, DomainError::MissingCallSign);

        let sign = call_sign();
        let unit = Unit::enlist(NewUnit {
            call_sign: sign.clone(),
            model: "Bayraktar".into(),
            battery_capacity: Some(10_000),
        })
        .unwrap();
        assert_eq!(unit.call_sign, sign);
        assert_eq!(unit.status, UnitStatus::Offline);
    }

    #[test]
    fn test_unit_wire_format_is_camel_case() {
        let unit = Unit::enlist(NewUnit {
            call_sign: "EAGLE-01".into(),
            model: "MQ-9".into(),
            battery_capacity: Some(5000),
        })
        .unwrap();
        let json = serde_json::to_value(&unit).unwrap();
        assert_eq!(json["callSign"], "EAGLE-01");
        assert_eq!(json["batteryCapacity"], 5000);
        assert_eq!(json["status"], "OFFLINE");
    }

    #[test]
    fn test_record_reads_original_keys() {
        let record: TelemetryRecord = serde_json::from_str(
            r#"{"lat":44.4,"lng":26.1,"batt":71,"threat_level":"THREAT","last_report":"armed convoy","last_seen":1700000000000}"#,
        )
        .unwrap();
        assert_eq!(record.battery, Some(71.0));
        assert_eq!(record.report.as_deref(), Some("armed convoy"));
        assert_eq!(record.timestamp, Some(1_700_000_000_000));

        let snapshot = record.snapshot().unwrap();
        assert_eq!(snapshot.position, GeoPoint::new(44.4, 26.1));
    }

    #[test]
    fn test_record_without_position_is_rejected() {
        let record = TelemetryRecord {
            lat: Some(44.0),
            ..Default::default()
        };
        assert_eq!(record.snapshot().unwrap_err(), DomainError::MissingPosition);

        let record = TelemetryRecord {
            lat: Some(f64::NAN),
            lng: Some(26.0),
            ..Default::default()
        };
        assert!(matches!(
            record.snapshot(),
            Err(DomainError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn test_waypoint_rejects_out_of_range() {
        assert!(Waypoint::new(91.0, 0.0).is_err());
        let wp = Waypoint::new(44.43, 26.11).unwrap();
        assert_eq!(wp.target(), GeoPoint::new(44.43, 26.11));
    }

    #[test]
    fn test_distance() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }
}
