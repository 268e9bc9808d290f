//! # Simulation Configuration
//!
//! Environment-based configuration for simulation sessions. The CLI layers
//! its flags on top of [`SimulationConfig::from_env`].

use std::env;
use std::time::Duration;

use sentinel_domain::GeoPoint;

use crate::error::{Result, SimulationError};
use crate::patrol::PatrolStrategy;
use crate::steering::SteeringConfig;
use crate::threat::DEFAULT_THREAT_PROBABILITY;

/// Per-session simulation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Period between two ticks of a session
    pub tick_interval: Duration,

    /// Waypoint step size and arrival tolerance
    pub steering: SteeringConfig,

    /// Idle motion while no waypoint is assigned
    pub patrol: PatrolStrategy,

    /// Per-tick probability of a THREAT report
    pub threat_probability: f64,

    /// Seed position for units never seen on the map
    pub origin: GeoPoint,

    /// Battery percentage lost per tick
    pub battery_drain_per_tick: f32,

    /// Base seed; `None` draws from OS entropy
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(3000),
            steering: SteeringConfig::default(),
            patrol: PatrolStrategy::default(),
            threat_probability: DEFAULT_THREAT_PROBABILITY,
            origin: GeoPoint::default(),
            battery_drain_per_tick: 0.5,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            tick_interval: env::var("SIM_TICK_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map_or(defaults.tick_interval, Duration::from_millis),

            steering: SteeringConfig {
                step_deg: parse_env("SIM_STEP_DEG").unwrap_or(defaults.steering.step_deg),
                tolerance_deg: parse_env("SIM_TOLERANCE_DEG")
                    .unwrap_or(defaults.steering.tolerance_deg),
            },

            patrol: parse_env("SIM_PATROL").unwrap_or(defaults.patrol),

            threat_probability: parse_env("SIM_THREAT_PROBABILITY")
                .unwrap_or(defaults.threat_probability),

            origin: GeoPoint::new(
                parse_env("SIM_ORIGIN_LAT").unwrap_or(defaults.origin.lat),
                parse_env("SIM_ORIGIN_LNG").unwrap_or(defaults.origin.lng),
            ),

            battery_drain_per_tick: parse_env("SIM_BATTERY_DRAIN")
                .unwrap_or(defaults.battery_drain_per_tick),

            seed: parse_env("SIM_SEED"),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(SimulationError::InvalidConfig(
                "tick interval must be non-zero".to_string(),
            ));
        }
        self.steering.validate()?;
        self.patrol.validate()?;
        if !(0.0..=1.0).contains(&self.threat_probability) {
            return Err(SimulationError::InvalidConfig(format!(
                "threat probability must be within [0, 1], got {}",
                self.threat_probability
            )));
        }
        if !(self.battery_drain_per_tick.is_finite() && self.battery_drain_per_tick >= 0.0) {
            return Err(SimulationError::InvalidConfig(format!(
                "battery drain must be non-negative, got {}",
                self.battery_drain_per_tick
            )));
        }
        self.origin.validate()?;
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_interval, Duration::from_secs(3));
        assert_eq!(config.patrol, PatrolStrategy::orbit());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = SimulationConfig {
            tick_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SimulationConfig {
            threat_probability: 2.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SimulationConfig {
            origin: GeoPoint::new(120.0, 0.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
