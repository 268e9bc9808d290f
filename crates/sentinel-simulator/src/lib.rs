//! # Sentinel Simulator
//!
//! Drives simulated units for the Sentinel Grid live map.
//!
//! ## Features
//!
//! - Waypoint steering with arrival tolerance, holding position on arrival
//! - Orbit or jitter patrol while no waypoint is assigned
//! - Seeded threat report synthesis
//! - One cancellable tick session per unit, publishing fire-and-forget

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod flight;
pub mod loopback;
pub mod orders;
pub mod patrol;
pub mod positions;
pub mod publisher;
pub mod registry;
pub mod session;
pub mod steering;
pub mod threat;

pub use config::SimulationConfig;
pub use error::{PublishError, RegistryError, Result, SimulationError};
pub use flight::{Motion, TickOutcome, UnitFlight};
pub use loopback::{LoopbackPublisher, LoopbackRegistry};
pub use orders::{PatrolOrder, WaypointOrder};
pub use patrol::{OrbitState, PatrolStrategy};
pub use positions::SnapshotPositions;
pub use publisher::{HttpTelemetryPublisher, LogPublisher, PublishAck, TelemetryPublisher};
pub use registry::{FleetRegistry, HttpFleetRegistry};
pub use session::{SessionManager, SessionState, SessionToken, WaypointBoard};
pub use steering::{Steer, SteeringConfig, steer};
pub use threat::{ThreatReading, ThreatSynthesizer};
