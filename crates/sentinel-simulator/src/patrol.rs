//! Idle motion used while a unit has no waypoint.

use std::str::FromStr;

use rand::Rng;
use rand_distr::{Distribution, Uniform};
use sentinel_domain::GeoPoint;

use crate::error::SimulationError;

/// Patrol strategy, chosen once per session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PatrolStrategy {
    /// Random offset of at most `max_offset_deg` on each axis per tick.
    Jitter { max_offset_deg: f64 },
    /// Circle of `radius_deg` around the orbit centre, advancing
    /// `angular_step_rad` per tick.
    Orbit {
        radius_deg: f64,
        angular_step_rad: f64,
    },
}

impl PatrolStrategy {
    #[must_use]
    pub const fn jitter() -> Self {
        Self::Jitter {
            max_offset_deg: 0.0005,
        }
    }

    #[must_use]
    pub const fn orbit() -> Self {
        Self::Orbit {
            radius_deg: 0.02,
            angular_step_rad: 0.2,
        }
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        let ok = match *self {
            Self::Jitter { max_offset_deg } => max_offset_deg.is_finite() && max_offset_deg >= 0.0,
            Self::Orbit {
                radius_deg,
                angular_step_rad,
            } => radius_deg.is_finite() && radius_deg >= 0.0 && angular_step_rad.is_finite(),
        };
        if ok {
            Ok(())
        } else {
            Err(SimulationError::InvalidConfig(format!(
                "invalid patrol strategy: {self:?}"
            )))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jitter { .. } => "jitter",
            Self::Orbit { .. } => "orbit",
        }
    }

    /// Move the orbit centre so `current` lies on the ring at the current
    /// angle. Used when a unit resumes patrol away from its old orbit.
    pub fn anchor(&self, orbit: &mut OrbitState, current: GeoPoint) {
        if let Self::Orbit { radius_deg, .. } = *self {
            orbit.center = GeoPoint::new(
                current.lat - orbit.angle.sin() * radius_deg,
                current.lng - orbit.angle.cos() * radius_deg,
            );
        }
    }

    /// Next idle position. `orbit` carries the orbit centre and angle across
    /// ticks; the jitter strategy ignores it.
    pub fn next_position<R: Rng + ?Sized>(
        &self,
        current: GeoPoint,
        orbit: &mut OrbitState,
        rng: &mut R,
    ) -> GeoPoint {
        match *self {
            Self::Jitter { max_offset_deg } => {
                if max_offset_deg == 0.0 {
                    return current;
                }
                let offset = Uniform::new_inclusive(-max_offset_deg, max_offset_deg);
                GeoPoint::new(
                    current.lat + offset.sample(rng),
                    current.lng + offset.sample(rng),
                )
            }
            Self::Orbit {
                radius_deg,
                angular_step_rad,
            } => {
                orbit.angle += angular_step_rad;
                GeoPoint::new(
                    orbit.center.lat + orbit.angle.sin() * radius_deg,
                    orbit.center.lng + orbit.angle.cos() * radius_deg,
                )
            }
        }
    }
}

impl Default for PatrolStrategy {
    fn default() -> Self {
        Self::orbit()
    }
}

impl FromStr for PatrolStrategy {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "orbit" | "circle" => Ok(Self::orbit()),
            "jitter" => Ok(Self::jitter()),
            other => Err(SimulationError::InvalidConfig(format!(
                "unknown patrol strategy '{other}' (expected orbit or jitter)"
            ))),
        }
    }
}

/// Orbit centre and current angle of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitState {
    pub center: GeoPoint,
    pub angle: f64,
}

impl OrbitState {
    #[must_use]
    pub const fn around(center: GeoPoint) -> Self {
        Self { center, angle: 0.0 }
    }
}
