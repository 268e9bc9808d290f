//! # Sentinel Grid Relay
//!
//! Ingest service for unit telemetry.
//!
//! ## Features
//!
//! - **Ping ingest**: `POST /api/drones/{callSign}/ping` merges a unit's
//!   position into the live map and classifies its field report
//! - **Live map**: `GET /api/telemetry` and a server-sent event stream of
//!   whole snapshot batches
//! - **Fleet registry**: enlist, list, update and decommission units
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               Axum HTTP Server               │
//! │        (REST endpoints + SSE stream)         │
//! └──────────────────────────────────────────────┘
//!            │                        │
//!            ▼                        ▼
//! ┌──────────────────────┐   ┌──────────────────────┐
//! │    LiveTelemetry     │   │      FleetStore      │
//! │ (classifier, bus)    │   │  (registered units)  │
//! └──────────────────────┘   └──────────────────────┘
//!            │
//!            ▼
//! ┌──────────────────────────────────────────────┐
//! │     TelemetryBus → dashboards / streams      │
//! └──────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod classifier;
pub mod config;
pub mod error;
pub mod live;
pub mod registry;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post, put};
use sentinel_dashboard::TelemetryBus;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use classifier::{KeywordClassifier, ReportClassifier};
pub use config::Config;
pub use error::{RelayError, RelayResult};
pub use live::{LiveTelemetry, PingRequest};
pub use registry::{FleetStore, UnitPatch};

/// Application state for Axum handlers
#[derive(Clone)]
pub struct AppState {
    pub live: Arc<LiveTelemetry>,
    pub fleet: Arc<FleetStore>,
}

impl AppState {
    pub fn new(live: Arc<LiveTelemetry>, fleet: Arc<FleetStore>) -> Self {
        Self { live, fleet }
    }

    /// Fresh state with the keyword classifier and a bus of `capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        let live = LiveTelemetry::new(
            TelemetryBus::new(capacity),
            Arc::new(KeywordClassifier::default()),
        );
        Self::new(Arc::new(live), Arc::new(FleetStore::default()))
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Build the Axum router
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_origin(allow_origin(cors_origins))
        .allow_headers(Any);

    // `{key}` is a unit id on the first route and a call sign under `/ping`.
    Router::new()
        .route(
            "/api/drones",
            get(routes::list_units).post(routes::enlist_unit),
        )
        .route(
            "/api/drones/{key}",
            put(routes::update_unit).delete(routes::decommission_unit),
        )
        .route("/api/drones/{key}/ping", post(routes::ping))
        .route("/api/telemetry", get(routes::telemetry))
        .route("/api/telemetry/stream", get(routes::telemetry_stream))
        // Health check
        .route("/health", get(health_check))
        .route("/", get(|| async { "Sentinel Grid Relay" }))
        // State and middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn allow_origin(origins: &[String]) -> AllowOrigin {
    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return AllowOrigin::any();
    }
    AllowOrigin::list(
        origins
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok()),
    )
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
