//! Waypoint steering: fixed-step motion toward a target with arrival detection.

use sentinel_domain::GeoPoint;

use crate::error::SimulationError;

/// Step size and arrival tolerance, both in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringConfig {
    pub step_deg: f64,
    pub tolerance_deg: f64,
}

impl SteeringConfig {
    pub fn new(step_deg: f64, tolerance_deg: f64) -> Result<Self, SimulationError> {
        let config = Self {
            step_deg,
            tolerance_deg,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(self.step_deg.is_finite() && self.step_deg > 0.0) {
            return Err(SimulationError::InvalidConfig(format!(
                "steering step must be positive, got {}",
                self.step_deg
            )));
        }
        if !(self.tolerance_deg.is_finite() && self.tolerance_deg > 0.0) {
            return Err(SimulationError::InvalidConfig(format!(
                "arrival tolerance must be positive, got {}",
                self.tolerance_deg
            )));
        }
        Ok(())
    }
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            step_deg: 0.002,
            tolerance_deg: 0.0005,
        }
    }
}

/// Result of one steering step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Steer {
    /// Moved one step toward the target.
    Moved(GeoPoint),
    /// Within tolerance of the target; position is unchanged.
    Arrived(GeoPoint),
}

impl Steer {
    #[must_use]
    pub const fn position(&self) -> GeoPoint {
        match self {
            Self::Moved(p) | Self::Arrived(p) => *p,
        }
    }

    #[must_use]
    pub const fn is_arrived(&self) -> bool {
        matches!(self, Self::Arrived(_))
    }
}

/// Advance `current` one step toward `target`.
///
/// Arrival is checked before moving, per axis: `|Δlat| < ε && |Δlng| < ε`.
/// The step is clamped to the remaining distance so the unit never
/// overshoots the target.
#[must_use]
pub fn steer(current: GeoPoint, target: GeoPoint, config: &SteeringConfig) -> Steer {
    let d_lat = target.lat - current.lat;
    let d_lng = target.lng - current.lng;

    if d_lat.abs() < config.tolerance_deg && d_lng.abs() < config.tolerance_deg {
        return Steer::Arrived(current);
    }

    let bearing = d_lat.atan2(d_lng);
    let step = config.step_deg.min(d_lat.hypot(d_lng));

    Steer::Moved(GeoPoint::new(
        current.lat + step * bearing.sin(),
        current.lng + step * bearing.cos(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SteeringConfig {
        SteeringConfig::new(0.002, 0.0005).unwrap()
    }

    #[test]
    fn test_distance_strictly_decreases_until_arrival() {
        let target = GeoPoint::new(44.4300, 26.1100);
        let mut current = GeoPoint::new(44.4268, 26.1025);
        let mut last_distance = current.distance_to(&target);
        let mut moves = 0;

        loop {
            match steer(current, target, &config()) {
                Steer::Moved(next) => {
                    let distance = next.distance_to(&target);
                    assert!(distance < last_distance, "{distance} >= {last_distance}");
                    last_distance = distance;
                    current = next;
                    moves += 1;
                    assert!(moves < 100, "never arrived");
                }
                Steer::Arrived(at) => {
                    assert_eq!(at, current);
                    break;
                }
            }
        }

        assert_eq!(moves, 4);
        // Holding: repeated steering at the target never moves again
        for _ in 0..5 {
            assert_eq!(steer(current, target, &config()), Steer::Arrived(current));
        }
    }

    #[test]
    fn test_step_is_clamped_to_remaining_distance() {
        let target = GeoPoint::new(0.0, 0.001);
        let next = steer(GeoPoint::new(0.0, 0.0), target, &config()).position();
        assert!((next.lng - 0.001).abs() < 1e-12);
        assert!(next.lat.abs() < 1e-12);
        assert!(steer(next, target, &config()).is_arrived());
    }

    #[test]
    fn test_bearing_follows_each_quadrant() {
        let origin = GeoPoint::new(10.0, 10.0);
        let north = steer(origin, GeoPoint::new(11.0, 10.0), &config()).position();
        assert!(north.lat > origin.lat && (north.lng - origin.lng).abs() < 1e-12);

        let south_west = steer(origin, GeoPoint::new(9.0, 9.0), &config()).position();
        assert!(south_west.lat < origin.lat && south_west.lng < origin.lng);
    }

    #[test]
    fn test_rejects_non_positive_parameters() {
        assert!(SteeringConfig::new(0.0, 0.0005).is_err());
        assert!(SteeringConfig::new(0.002, -1.0).is_err());
        assert!(SteeringConfig::new(f64::NAN, 0.0005).is_err());
    }
}
