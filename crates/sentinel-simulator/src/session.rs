//! # Simulation Sessions
//!
//! One session per running unit. The [`SessionManager`] owns the session
//! registry; each session is a tokio task ticking on its own interval and
//! handing payloads to the publisher without awaiting them.
//!
//! Sessions must be driven from a single event loop: `start` refuses a
//! multi-thread runtime. `stop` is synchronous, so once it returns the
//! session's task is never polled again and no further publish call is made.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use sentinel_domain::{GeoPoint, PositionLookup, Unit, Waypoint};
use tokio::runtime::RuntimeFlavor;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SimulationConfig;
use crate::error::{Result, SimulationError};
use crate::flight::UnitFlight;
use crate::patrol::PatrolStrategy;
use crate::publisher::TelemetryPublisher;

/// Lifecycle state of a unit's session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Stopped,
}

/// Cancellation token handed out by [`SessionManager::start`].
///
/// Every tick and every in-flight publish of the session holds a clone.
#[derive(Debug, Clone)]
pub struct SessionToken {
    rx: watch::Receiver<bool>,
}

impl SessionToken {
    fn pair() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once the session is stopped.
    pub async fn cancelled(&mut self) {
        // A dropped sender also means the session is gone
        let _ = self.rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// The single live waypoint per unit, shared with running sessions.
#[derive(Debug, Clone, Default)]
pub struct WaypointBoard {
    inner: Arc<Mutex<HashMap<Uuid, Waypoint>>>,
}

impl WaypointBoard {
    pub fn assign(&self, unit_id: Uuid, waypoint: Waypoint) -> Option<Waypoint> {
        self.lock().insert(unit_id, waypoint)
    }

    pub fn get(&self, unit_id: Uuid) -> Option<Waypoint> {
        self.lock().get(&unit_id).copied()
    }

    pub fn clear(&self, unit_id: Uuid) -> Option<Waypoint> {
        self.lock().remove(&unit_id)
    }

    /// Clear the unit's waypoint only if it is still `reached`; a newer
    /// assignment made in the meantime survives.
    pub fn clear_if(&self, unit_id: Uuid, reached: &Waypoint) -> bool {
        let mut board = self.lock();
        if board.get(&unit_id) == Some(reached) {
            board.remove(&unit_id);
            true
        } else {
            false
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Waypoint>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registry entry for a running session
struct Session {
    call_sign: String,
    cancel: watch::Sender<bool>,
    token: SessionToken,
    flight: Arc<Mutex<UnitFlight>>,
    task: JoinHandle<()>,
    started_at: DateTime<Utc>,
}

impl Session {
    fn cancel(self) {
        let _ = self.cancel.send(true);
        self.task.abort();
    }
}

/// Everything a session task needs, moved into the task.
struct SessionContext {
    unit_id: Uuid,
    call_sign: String,
    flight: Arc<Mutex<UnitFlight>>,
    waypoints: WaypointBoard,
    publisher: Arc<dyn TelemetryPublisher>,
    tick_interval: Duration,
}

/// Owns the session registry and the waypoint board.
pub struct SessionManager {
    config: SimulationConfig,
    publisher: Arc<dyn TelemetryPublisher>,
    positions: Option<Arc<dyn PositionLookup>>,
    waypoints: WaypointBoard,
    sessions: HashMap<Uuid, Session>,
    sessions_started: u64,
}

impl SessionManager {
    pub fn new(config: SimulationConfig, publisher: Arc<dyn TelemetryPublisher>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            publisher,
            positions: None,
            waypoints: WaypointBoard::default(),
            sessions: HashMap::new(),
            sessions_started: 0,
        })
    }

    /// Seed new sessions from the last position seen on the map.
    #[must_use]
    pub fn with_positions(mut self, positions: Arc<dyn PositionLookup>) -> Self {
        self.positions = Some(positions);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn waypoints(&self) -> &WaypointBoard {
        &self.waypoints
    }

    /// Start simulating `unit` with the configured patrol strategy. A no-op
    /// returning the existing token if the unit is already running.
    pub fn start(&mut self, unit: &Unit) -> Result<SessionToken> {
        self.start_with(unit, self.config.patrol)
    }

    /// Start simulating `unit` with its own patrol strategy.
    pub fn start_with(&mut self, unit: &Unit, patrol: PatrolStrategy) -> Result<SessionToken> {
        if let Some(session) = self.sessions.get(&unit.id) {
            debug!(call_sign = %session.call_sign, "Session already running");
            return Ok(session.token.clone());
        }

        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| SimulationError::NoRuntime)?;
        if runtime.runtime_flavor() != RuntimeFlavor::CurrentThread {
            return Err(SimulationError::NoRuntime);
        }
        patrol.validate()?;

        let origin = self
            .positions
            .as_ref()
            .and_then(|lookup| lookup.last_known(&unit.call_sign))
            .unwrap_or(self.config.origin);

        let seed = self
            .config
            .seed
            .map(|base| base.wrapping_add(self.sessions_started));
        let flight = Arc::new(Mutex::new(UnitFlight::new(origin, &self.config, seed)?.with_patrol(patrol)));
        let (cancel, token) = SessionToken::pair();

        let ctx = SessionContext {
            unit_id: unit.id,
            call_sign: unit.call_sign.clone(),
            flight: flight.clone(),
            waypoints: self.waypoints.clone(),
            publisher: self.publisher.clone(),
            tick_interval: self.config.tick_interval,
        };
        let task = runtime.spawn(run_session(ctx, token.clone()));

        info!(
            call_sign = %unit.call_sign,
            unit_id = %unit.id,
            lat = origin.lat,
            lng = origin.lng,
            interval = ?self.config.tick_interval,
            patrol = patrol.as_str(),
            "Starting simulation"
        );

        self.sessions_started += 1;
        self.sessions.insert(
            unit.id,
            Session {
                call_sign: unit.call_sign.clone(),
                cancel,
                token: token.clone(),
                flight,
                task,
                started_at: Utc::now(),
            },
        );

        Ok(token)
    }

    /// Stop simulating a unit. Returns `false` if it was not running.
    pub fn stop(&mut self, unit_id: Uuid) -> bool {
        let Some(session) = self.sessions.remove(&unit_id) else {
            return false;
        };

        let uptime = Utc::now() - session.started_at;
        info!(
            call_sign = %session.call_sign,
            uptime_secs = uptime.num_seconds(),
            "Stopping simulation"
        );
        session.cancel();
        true
    }

    /// Caller-side convenience: stop if running, start otherwise.
    pub fn toggle(&mut self, unit: &Unit) -> Result<SessionState> {
        if self.stop(unit.id) {
            Ok(SessionState::Stopped)
        } else {
            self.start(unit)?;
            Ok(SessionState::Running)
        }
    }

    pub fn stop_all(&mut self) {
        let ids: Vec<Uuid> = self.sessions.keys().copied().collect();
        for id in ids {
            self.stop(id);
        }
    }

    /// Assign (or overwrite) the unit's waypoint.
    pub fn set_waypoint(&self, unit_id: Uuid, waypoint: Waypoint) {
        if let Some(previous) = self.waypoints.assign(unit_id, waypoint) {
            debug!(%unit_id, ?previous, "Waypoint overwritten");
        }
        info!(
            %unit_id,
            target_lat = waypoint.target_lat,
            target_lng = waypoint.target_lng,
            "Waypoint assigned"
        );
    }

    pub fn clear_waypoint(&self, unit_id: Uuid) -> Option<Waypoint> {
        self.waypoints.clear(unit_id)
    }

    pub fn waypoint(&self, unit_id: Uuid) -> Option<Waypoint> {
        self.waypoints.get(unit_id)
    }

    pub fn state(&self, unit_id: Uuid) -> SessionState {
        if self.sessions.contains_key(&unit_id) {
            SessionState::Running
        } else {
            SessionState::Stopped
        }
    }

    pub fn is_running(&self, unit_id: Uuid) -> bool {
        self.state(unit_id) == SessionState::Running
    }

    pub fn running_units(&self) -> Vec<Uuid> {
        self.sessions.keys().copied().collect()
    }

    /// Current simulated position of a running unit
    pub fn position(&self, unit_id: Uuid) -> Option<GeoPoint> {
        self.sessions.get(&unit_id).map(|session| {
            session
                .flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .position()
        })
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.stop_all();
    }
}

async fn run_session(ctx: SessionContext, mut token: SessionToken) {
    let mut ticker = interval_at(Instant::now() + ctx.tick_interval, ctx.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let waypoint = ctx.waypoints.get(ctx.unit_id);
        let outcome = ctx
            .flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tick(waypoint);

        if outcome.arrived {
            if let Some(reached) = waypoint {
                ctx.waypoints.clear_if(ctx.unit_id, &reached);
            }
            info!(call_sign = %ctx.call_sign, "Waypoint reached, holding position");
        }

        debug!(
            call_sign = %ctx.call_sign,
            motion = ?outcome.motion,
            threat = %outcome.threat,
            "Tick"
        );

        dispatch(
            ctx.publisher.clone(),
            ctx.call_sign.clone(),
            outcome.payload,
            token.clone(),
        );
    }

    debug!(call_sign = %ctx.call_sign, "Session task finished");
}

/// Fire-and-forget publish. The result is only logged, and dropped
/// entirely once the session has been stopped.
fn dispatch(
    publisher: Arc<dyn TelemetryPublisher>,
    call_sign: String,
    payload: sentinel_domain::TelemetryPayload,
    token: SessionToken,
) {
    tokio::spawn(async move {
        if token.is_cancelled() {
            return;
        }

        let result = publisher.send(&call_sign, &payload).await;

        if token.is_cancelled() {
            debug!(%call_sign, "Discarding publish result of stopped session");
            return;
        }

        match result {
            Ok(ack) => debug!(call_sign = %ack.call_sign, "Ping delivered"),
            Err(err) => warn!(%call_sign, error = %err, "Ping failed"),
        }
    });
}
