//! Sentinel Grid Simulator CLI
//!
//! Runs simulated units against a relay, or entirely in-process with
//! `--local`, and manages the fleet registry.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use sentinel_dashboard::{DashboardHandle, Reconciler, TracingRenderer};
use sentinel_domain::{NewUnit, PositionLookup, Unit};
use sentinel_relay::AppState;
use sentinel_simulator::{
    FleetRegistry, HttpFleetRegistry, HttpTelemetryPublisher, LogPublisher, LoopbackPublisher,
    LoopbackRegistry, PatrolOrder, PatrolStrategy, SessionManager, SimulationConfig,
    SnapshotPositions, TelemetryPublisher, WaypointOrder,
};
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Units simulated in dry-run and local mode when `--units` is omitted
const DEFAULT_UNITS: [&str; 3] = ["EAGLE-01", "HAWK-02", "VIPER-03"];

#[derive(Parser, Debug)]
#[command(name = "sentinel-sim")]
#[command(about = "Simulate Sentinel Grid units and stream their telemetry")]
struct Cli {
    /// Relay base URL
    #[arg(long, global = true, default_value = "http://localhost:8080")]
    relay_url: String,

    /// HTTP timeout in milliseconds
    #[arg(long, global = true, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run simulation sessions until Ctrl+C or the run duration elapses
    Run(RunArgs),

    /// List registered units
    List {
        /// Print the raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Register a unit
    Enlist {
        #[arg(long)]
        call_sign: String,

        #[arg(long, default_value = "")]
        model: String,

        /// Battery capacity in mAh
        #[arg(long)]
        battery_capacity: Option<u32>,
    },

    /// Remove a unit from the registry
    Decommission {
        /// Unit id
        id: Uuid,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Call signs to simulate; all registered units when omitted
    #[arg(long, value_delimiter = ',')]
    units: Vec<String>,

    /// Waypoint order, repeatable
    #[arg(long = "waypoint", value_name = "CALLSIGN=LAT,LNG")]
    waypoints: Vec<WaypointOrder>,

    /// Idle motion: orbit or jitter
    #[arg(long)]
    patrol: Option<PatrolStrategy>,

    /// Per-unit idle motion, repeatable; overrides --patrol
    #[arg(long = "unit-patrol", value_name = "CALLSIGN=orbit|jitter")]
    unit_patrols: Vec<PatrolOrder>,

    /// Per-tick probability of a THREAT report
    #[arg(long)]
    threat_probability: Option<f64>,

    /// Base seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Tick interval in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Stop after this many seconds
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Log payloads instead of posting them
    #[arg(long, conflicts_with = "local")]
    dry_run: bool,

    /// Run relay, bus and dashboard in-process
    #[arg(long)]
    local: bool,
}

impl RunArgs {
    fn config(&self) -> SimulationConfig {
        let mut config = SimulationConfig::from_env();
        if let Some(patrol) = self.patrol {
            config.patrol = patrol;
        }
        if let Some(probability) = self.threat_probability {
            config.threat_probability = probability;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(tick_ms) = self.tick_ms {
            config.tick_interval = Duration::from_millis(tick_ms);
        }
        config
    }

    fn call_signs(&self) -> Vec<String> {
        if self.units.is_empty() {
            DEFAULT_UNITS.iter().map(ToString::to_string).collect()
        } else {
            self.units.clone()
        }
    }
}

/// Everything a run needs, per mode.
struct Wiring {
    units: Vec<Unit>,
    publisher: Arc<dyn TelemetryPublisher>,
    positions: Option<Arc<dyn PositionLookup>>,
    dashboard: Option<DashboardHandle>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("sentinel_simulator=info".parse()?)
                .add_directive("sentinel_dashboard=info".parse()?)
                .add_directive("sentinel_relay=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_millis(cli.timeout_ms);

    match cli.command {
        Command::Run(args) => run(&cli.relay_url, timeout, args).await,
        Command::List { json } => {
            let registry = HttpFleetRegistry::new(&cli.relay_url, timeout)?;
            let units = registry.get_all().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&units)?);
            } else {
                for unit in &units {
                    println!(
                        "{}  {:<12} {:<8} {}",
                        unit.id,
                        unit.call_sign,
                        format!("{:?}", unit.status).to_uppercase(),
                        unit.model
                    );
                }
            }
            Ok(())
        }
        Command::Enlist {
            call_sign,
            model,
            battery_capacity,
        } => {
            let registry = HttpFleetRegistry::new(&cli.relay_url, timeout)?;
            let unit = registry
                .create(&NewUnit {
                    call_sign,
                    model,
                    battery_capacity,
                })
                .await?;
            info!(id = %unit.id, call_sign = %unit.call_sign, "Unit enlisted");
            println!("{}", unit.id);
            Ok(())
        }
        Command::Decommission { id } => {
            let registry = HttpFleetRegistry::new(&cli.relay_url, timeout)?;
            registry.delete(id).await?;
            info!(%id, "Unit decommissioned");
            Ok(())
        }
    }
}

async fn run(relay_url: &str, timeout: Duration, args: RunArgs) -> Result<()> {
    let config = args.config();

    let wiring = if args.local {
        local_wiring(&args).await?
    } else if args.dry_run {
        dry_run_wiring(&args)?
    } else {
        remote_wiring(relay_url, timeout, &args).await?
    };

    if wiring.units.is_empty() {
        warn!("No units to simulate");
        return Ok(());
    }

    let mut manager = SessionManager::new(config, wiring.publisher)?;
    if let Some(positions) = wiring.positions {
        manager = manager.with_positions(positions);
    }

    for order in &args.waypoints {
        order.apply(&manager, &wiring.units)?;
    }
    for unit in &wiring.units {
        match PatrolOrder::for_unit(&args.unit_patrols, unit) {
            Some(patrol) => manager.start_with(unit, *patrol)?,
            None => manager.start(unit)?,
        };
    }

    info!(
        units = wiring.units.len(),
        local = args.local,
        dry_run = args.dry_run,
        tick = ?manager.config().tick_interval,
        "Simulation running"
    );

    match args.duration_secs {
        Some(secs) => {
            tokio::select! {
                () = sleep(Duration::from_secs(secs)) => info!("Run duration elapsed"),
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    info!("Received Ctrl+C, stopping");
                }
            }
        }
        None => {
            tokio::signal::ctrl_c().await?;
            info!("Received Ctrl+C, stopping");
        }
    }

    for unit in &wiring.units {
        if let Some(position) = manager.position(unit.id) {
            info!(
                call_sign = %unit.call_sign,
                lat = position.lat,
                lng = position.lng,
                "Final position"
            );
        }
    }
    manager.stop_all();

    if let Some(dashboard) = wiring.dashboard {
        dashboard.abort();
        let board = dashboard.board();
        info!(markers = board.len(), "=== FINAL MAP ===");
        for marker in board.snapshot().values() {
            info!(
                call_sign = %marker.call_sign,
                status = %marker.label,
                color = marker.color,
                lat = marker.position.lat,
                lng = marker.position.lng,
                "Marker"
            );
        }
    }

    Ok(())
}

async fn local_wiring(args: &RunArgs) -> Result<Wiring> {
    let state = AppState::with_capacity(sentinel_dashboard::subscription::DEFAULT_CAPACITY);
    let registry = LoopbackRegistry::new(state.fleet.clone(), state.live.clone());
    let dashboard =
        DashboardHandle::spawn(state.live.subscribe(), Reconciler::new(TracingRenderer));

    let mut units = Vec::new();
    for call_sign in args.call_signs() {
        let unit = registry
            .create(&NewUnit {
                call_sign,
                model: "Simulated".to_string(),
                battery_capacity: None,
            })
            .await?;
        units.push(unit);
    }

    let positions: Arc<dyn PositionLookup> = Arc::new(dashboard.board());

    Ok(Wiring {
        units,
        publisher: Arc::new(LoopbackPublisher::new(state.live.clone())),
        positions: Some(positions),
        dashboard: Some(dashboard),
    })
}

fn dry_run_wiring(args: &RunArgs) -> Result<Wiring> {
    let units = args
        .call_signs()
        .into_iter()
        .map(|call_sign| {
            Unit::enlist(NewUnit {
                call_sign,
                model: "Simulated".to_string(),
                battery_capacity: None,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Wiring {
        units,
        publisher: Arc::new(LogPublisher),
        positions: None,
        dashboard: None,
    })
}

async fn remote_wiring(relay_url: &str, timeout: Duration, args: &RunArgs) -> Result<Wiring> {
    let registry = HttpFleetRegistry::new(relay_url, timeout)?;
    let mut units = registry.get_all().await?;
    info!(registered = units.len(), %relay_url, "Fleet loaded");

    if !args.units.is_empty() {
        for wanted in &args.units {
            if !units.iter().any(|u| u.call_sign.eq_ignore_ascii_case(wanted)) {
                warn!(call_sign = %wanted, "Unit not registered, skipping");
            }
        }
        units.retain(|unit| {
            args.units
                .iter()
                .any(|wanted| unit.call_sign.eq_ignore_ascii_case(wanted))
        });
    }

    let positions: Option<Arc<dyn PositionLookup>> =
        match SnapshotPositions::fetch(relay_url, timeout).await {
            Ok(snapshot) => {
                info!(known = snapshot.len(), "Last known positions loaded");
                Some(Arc::new(snapshot))
            }
            Err(err) => {
                warn!(error = %err, "Could not load last known positions, starting from origin");
                None
            }
        };

    Ok(Wiring {
        units,
        publisher: Arc::new(HttpTelemetryPublisher::new(relay_url, timeout)?),
        positions,
        dashboard: None,
    })
}
