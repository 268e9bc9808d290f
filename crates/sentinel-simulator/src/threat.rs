//! Synthetic sensor reports.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sentinel_domain::ThreatLevel;

use crate::error::SimulationError;

/// Default per-tick threat probability (one in five).
pub const DEFAULT_THREAT_PROBABILITY: f64 = 0.2;

/// Report emitted on a clear tick.
pub const CLEAR_REPORT: &str = "Sector clear. Patrolling assigned perimeter.";

/// Reports emitted on a threat tick, used in rotation.
pub const THREAT_REPORTS: [&str; 4] = [
    "Visual contact: Armed convoy moving towards civilian sector.",
    "Hostile personnel with weapons sighted near the perimeter fence.",
    "Weapon launch signature detected from the tree line.",
    "Armed technical vehicle closing on the supply route.",
];

/// One synthesized observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreatReading {
    pub level: ThreatLevel,
    pub report: &'static str,
}

impl ThreatReading {
    #[must_use]
    pub fn is_threat(&self) -> bool {
        self.level == ThreatLevel::Threat
    }
}

/// Draws exactly one Bernoulli trial per reading.
#[derive(Debug, Clone)]
pub struct ThreatSynthesizer<R = StdRng> {
    probability: f64,
    rng: R,
    threats_emitted: usize,
}

impl ThreatSynthesizer<StdRng> {
    pub fn seeded(probability: f64, seed: u64) -> Result<Self, SimulationError> {
        Self::with_rng(probability, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> ThreatSynthesizer<R> {
    pub fn with_rng(probability: f64, rng: R) -> Result<Self, SimulationError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(SimulationError::InvalidConfig(format!(
                "threat probability must be within [0, 1], got {probability}"
            )));
        }
        Ok(Self {
            probability,
            rng,
            threats_emitted: 0,
        })
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn next_reading(&mut self) -> ThreatReading {
        if self.rng.gen_bool(self.probability) {
            let report = THREAT_REPORTS[self.threats_emitted % THREAT_REPORTS.len()];
            self.threats_emitted += 1;
            ThreatReading {
                level: ThreatLevel::Threat,
                report,
            }
        } else {
            ThreatReading {
                level: ThreatLevel::Safe,
                report: CLEAR_REPORT,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threat_frequency_matches_probability() {
        const N: usize = 10_000;
        let mut synth = ThreatSynthesizer::seeded(DEFAULT_THREAT_PROBABILITY, 0x5e17).unwrap();
        let threats = (0..N).filter(|_| synth.next_reading().is_threat()).count();

        // sigma = sqrt(0.2 * 0.8 / 10_000) = 0.004; allow five sigma
        let observed = threats as f64 / N as f64;
        assert!((observed - 0.2).abs() < 0.02, "observed {observed}");
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = ThreatSynthesizer::seeded(0.5, 99).unwrap();
        let mut b = ThreatSynthesizer::seeded(0.5, 99).unwrap();
        for _ in 0..200 {
            assert_eq!(a.next_reading(), b.next_reading());
        }
    }

    #[test]
    fn test_extremes() {
        let mut never = ThreatSynthesizer::seeded(0.0, 1).unwrap();
        let mut always = ThreatSynthesizer::seeded(1.0, 1).unwrap();
        for _ in 0..100 {
            let clear = never.next_reading();
            assert_eq!(clear.level, ThreatLevel::Safe);
            assert_eq!(clear.report, CLEAR_REPORT);
            assert!(always.next_reading().is_threat());
        }
    }

    #[test]
    fn test_threat_reports_rotate() {
        let mut always = ThreatSynthesizer::seeded(1.0, 3).unwrap();
        let reports: Vec<_> = (0..THREAT_REPORTS.len())
            .map(|_| always.next_reading().report)
            .collect();
        assert_eq!(reports, THREAT_REPORTS.to_vec());
    }

    #[test]
    fn test_rejects_invalid_probability() {
        assert!(ThreatSynthesizer::seeded(1.5, 0).is_err());
        assert!(ThreatSynthesizer::seeded(-0.1, 0).is_err());
        assert!(ThreatSynthesizer::seeded(f64::NAN, 0).is_err());
    }
}
