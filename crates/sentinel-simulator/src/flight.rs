//! Per-unit flight model driven once per session tick.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sentinel_domain::{GeoPoint, TelemetryPayload, ThreatLevel, Waypoint};

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::patrol::{OrbitState, PatrolStrategy};
use crate::steering::{Steer, SteeringConfig, steer};
use crate::threat::ThreatSynthesizer;

const BASE_ALTITUDE_M: f64 = 150.0;
const ALTITUDE_SPREAD_M: f64 = 50.0;

/// How the unit moved on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Seek,
    Hold,
    Patrol,
}

/// Everything a tick produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub payload: TelemetryPayload,
    pub threat: ThreatLevel,
    pub motion: Motion,
    /// Set on the tick that detected arrival at the waypoint.
    pub arrived: bool,
}

/// Position, orbit, hold flag and battery of one simulated unit.
#[derive(Debug, Clone)]
pub struct UnitFlight<R = StdRng> {
    position: GeoPoint,
    orbit: OrbitState,
    holding: bool,
    last_motion: Option<Motion>,
    battery_pct: f32,
    battery_drain: f32,
    steering: SteeringConfig,
    patrol: PatrolStrategy,
    synthesizer: ThreatSynthesizer<R>,
    rng: R,
}

impl UnitFlight<StdRng> {
    /// Build a flight seeded at `start`. With a seed, two independent
    /// streams are derived for motion and threat synthesis.
    pub fn new(start: GeoPoint, config: &SimulationConfig, seed: Option<u64>) -> Result<Self> {
        let (motion_rng, threat_rng) = match seed {
            Some(seed) => (
                StdRng::seed_from_u64(seed),
                StdRng::seed_from_u64(seed.wrapping_add(0x9e37_79b9_7f4a_7c15)),
            ),
            None => (StdRng::from_entropy(), StdRng::from_entropy()),
        };
        Self::with_rngs(start, config, motion_rng, threat_rng)
    }
}

impl<R: Rng> UnitFlight<R> {
    pub fn with_rngs(
        start: GeoPoint,
        config: &SimulationConfig,
        motion_rng: R,
        threat_rng: R,
    ) -> Result<Self> {
        Ok(Self {
            position: start,
            orbit: OrbitState::around(start),
            holding: false,
            last_motion: None,
            battery_pct: 100.0,
            battery_drain: config.battery_drain_per_tick,
            steering: config.steering,
            patrol: config.patrol,
            synthesizer: ThreatSynthesizer::with_rng(config.threat_probability, threat_rng)?,
            rng: motion_rng,
        })
    }

    /// Override the configured patrol strategy for this unit.
    #[must_use]
    pub fn with_patrol(mut self, patrol: PatrolStrategy) -> Self {
        self.patrol = patrol;
        self
    }

    pub fn position(&self) -> GeoPoint {
        self.position
    }

    pub fn angle(&self) -> f64 {
        self.orbit.angle
    }

    pub fn battery_pct(&self) -> f32 {
        self.battery_pct
    }

    /// Advance one tick.
    ///
    /// With a waypoint the unit steers toward it; once arrived it holds
    /// position until a waypoint is present again. Without a waypoint and
    /// not holding, the patrol strategy moves it. Patrol resumed after a
    /// seek continues from the current position instead of the old orbit.
    pub fn tick(&mut self, waypoint: Option<Waypoint>) -> TickOutcome {
        let (motion, arrived) = match waypoint {
            Some(wp) => {
                self.holding = false;
                match steer(self.position, wp.target(), &self.steering) {
                    Steer::Moved(next) => {
                        self.position = next;
                        (Motion::Seek, false)
                    }
                    Steer::Arrived(_) => {
                        self.holding = true;
                        (Motion::Hold, true)
                    }
                }
            }
            None if self.holding => (Motion::Hold, false),
            None => {
                if matches!(self.last_motion, Some(motion) if motion != Motion::Patrol) {
                    self.patrol.anchor(&mut self.orbit, self.position);
                }
                self.position =
                    self.patrol
                        .next_position(self.position, &mut self.orbit, &mut self.rng);
                (Motion::Patrol, false)
            }
        };
        self.last_motion = Some(motion);

        self.battery_pct = (self.battery_pct - self.battery_drain).max(0.0);
        let reading = self.synthesizer.next_reading();
        let alt = BASE_ALTITUDE_M + self.rng.gen_range(0.0..ALTITUDE_SPREAD_M);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let battery = self.battery_pct.round() as u8;

        TickOutcome {
            payload: TelemetryPayload {
                lat: self.position.lat,
                lng: self.position.lng,
                alt,
                battery,
                report: reading.report.to_string(),
            },
            threat: reading.level,
            motion,
            arrived,
        }
    }
}
