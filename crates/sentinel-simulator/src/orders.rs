//! Orders given on the command line: waypoints as `CALLSIGN=lat,lng` and
//! per-unit patrol strategies as `CALLSIGN=orbit|jitter`.

use std::str::FromStr;

use sentinel_domain::{Unit, Waypoint};

use crate::error::{Result, SimulationError};
use crate::patrol::PatrolStrategy;
use crate::session::SessionManager;

/// A waypoint addressed to a unit by call sign.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointOrder {
    pub call_sign: String,
    pub waypoint: Waypoint,
}

impl WaypointOrder {
    /// Resolve the call sign against `units` and assign the waypoint.
    pub fn apply(&self, manager: &SessionManager, units: &[Unit]) -> Result<()> {
        let unit = units
            .iter()
            .find(|unit| unit.call_sign.eq_ignore_ascii_case(&self.call_sign))
            .ok_or_else(|| SimulationError::UnknownUnit(self.call_sign.clone()))?;
        manager.set_waypoint(unit.id, self.waypoint);
        Ok(())
    }
}

impl FromStr for WaypointOrder {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid =
            || SimulationError::InvalidConfig(format!("expected CALLSIGN=lat,lng, got '{s}'"));

        let (call_sign, coords) = s.split_once('=').ok_or_else(invalid)?;
        let (lat, lng) = coords.split_once(',').ok_or_else(invalid)?;
        let call_sign = call_sign.trim();
        if call_sign.is_empty() {
            return Err(invalid());
        }

        let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
        let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;

        Ok(Self {
            call_sign: call_sign.to_string(),
            waypoint: Waypoint::new(lat, lng)?,
        })
    }
}

/// A patrol strategy addressed to a unit by call sign.
#[derive(Debug, Clone, PartialEq)]
pub struct PatrolOrder {
    pub call_sign: String,
    pub patrol: PatrolStrategy,
}

impl PatrolOrder {
    /// Strategy ordered for `unit`, if any. The last matching order wins.
    pub fn for_unit<'a>(orders: &'a [PatrolOrder], unit: &Unit) -> Option<&'a PatrolStrategy> {
        orders
            .iter()
            .rev()
            .find(|order| order.call_sign.eq_ignore_ascii_case(&unit.call_sign))
            .map(|order| &order.patrol)
    }
}

impl FromStr for PatrolOrder {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self> {
        let (call_sign, patrol) = s.split_once('=').ok_or_else(|| {
            SimulationError::InvalidConfig(format!("expected CALLSIGN=orbit|jitter, got '{s}'"))
        })?;
        let call_sign = call_sign.trim();
        if call_sign.is_empty() {
            return Err(SimulationError::InvalidConfig(format!(
                "missing call sign in '{s}'"
            )));
        }

        Ok(Self {
            call_sign: call_sign.to_string(),
            patrol: patrol.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::publisher::LogPublisher;
    use sentinel_domain::NewUnit;
    use std::sync::Arc;

    #[test]
    fn test_parse_order() {
        let order: WaypointOrder = "EAGLE-01 = 44.43, 26.11".parse().unwrap();
        assert_eq!(order.call_sign, "EAGLE-01");
        assert_eq!(order.waypoint, Waypoint::new(44.43, 26.11).unwrap());
    }

    #[test]
    fn test_parse_rejects_malformed_orders() {
        for raw in ["EAGLE-01", "EAGLE-01=44.4", "=44.4,26.1", "EAGLE-01=north,26.1"] {
            assert!(
                matches!(raw.parse::<WaypointOrder>(), Err(SimulationError::InvalidConfig(_))),
                "{raw}"
            );
        }
        assert!(matches!(
            "EAGLE-01=91.0,26.1".parse::<WaypointOrder>(),
            Err(SimulationError::Domain(_))
        ));
    }

    #[test]
    fn test_apply_resolves_call_sign() {
        let manager =
            SessionManager::new(SimulationConfig::default(), Arc::new(LogPublisher)).unwrap();
        let unit = Unit::enlist(NewUnit {
            call_sign: "EAGLE-01".into(),
            model: "Reaper".into(),
            battery_capacity: None,
        })
        .unwrap();
        let units = vec![unit.clone()];

        let order: WaypointOrder = "eagle-01=44.43,26.11".parse().unwrap();
        order.apply(&manager, &units).unwrap();
        assert_eq!(manager.waypoint(unit.id), Some(order.waypoint));

        let stray: WaypointOrder = "GHOST-09=44.43,26.11".parse().unwrap();
        assert!(matches!(
            stray.apply(&manager, &units),
            Err(SimulationError::UnknownUnit(cs)) if cs == "GHOST-09"
        ));
    }

    #[test]
    fn test_patrol_order_matches_call_sign() {
        let orders: Vec<PatrolOrder> = ["hawk-02=jitter", "HAWK-02=orbit", "EAGLE-01=jitter"]
            .iter()
            .map(|raw| raw.parse().unwrap())
            .collect();
        let hawk = Unit::enlist(NewUnit {
            call_sign: "HAWK-02".into(),
            model: "Reaper".into(),
            battery_capacity: None,
        })
        .unwrap();
        let viper = Unit::enlist(NewUnit {
            call_sign: "VIPER-03".into(),
            model: "Reaper".into(),
            battery_capacity: None,
        })
        .unwrap();

        assert_eq!(PatrolOrder::for_unit(&orders, &hawk), Some(&PatrolStrategy::orbit()));
        assert_eq!(PatrolOrder::for_unit(&orders, &viper), None);
        assert!("HAWK-02=zigzag".parse::<PatrolOrder>().is_err());
        assert!("=orbit".parse::<PatrolOrder>().is_err());
        assert!("orbit".parse::<PatrolOrder>().is_err());
    }
}
