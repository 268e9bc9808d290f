//! HTTP handlers.

use std::convert::Infallible;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::Stream;
use sentinel_domain::{NewUnit, TelemetryRecord, Unit};
use tracing::warn;
use uuid::Uuid;

use crate::AppState;
use crate::error::RelayResult;
use crate::live::PingRequest;
use crate::registry::UnitPatch;

/// `GET /api/drones`
pub async fn list_units(State(state): State<AppState>) -> Json<Vec<Unit>> {
    Json(state.fleet.list())
}

/// `POST /api/drones`
pub async fn enlist_unit(
    State(state): State<AppState>,
    Json(request): Json<NewUnit>,
) -> RelayResult<(StatusCode, Json<Unit>)> {
    let unit = state.fleet.enlist(request)?;
    Ok((StatusCode::CREATED, Json(unit)))
}

/// `PUT /api/drones/{id}`; a rename drops the old call sign from the live map.
pub async fn update_unit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<UnitPatch>,
) -> RelayResult<Json<Unit>> {
    let id = Uuid::parse_str(&id)?;
    let previous = state.fleet.get(id)?;
    let unit = state.fleet.update(id, patch)?;
    if previous.call_sign != unit.call_sign {
        state.live.remove(&previous.call_sign);
    }
    Ok(Json(unit))
}

/// `DELETE /api/drones/{id}`; also drops the unit from the live map.
pub async fn decommission_unit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RelayResult<StatusCode> {
    let id = Uuid::parse_str(&id)?;
    let unit = state.fleet.decommission(id)?;
    state.live.remove(&unit.call_sign);
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/drones/{callSign}/ping`
pub async fn ping(
    State(state): State<AppState>,
    Path(call_sign): Path<String>,
    Json(ping): Json<PingRequest>,
) -> RelayResult<Json<TelemetryRecord>> {
    Ok(Json(state.live.ingest(&call_sign, ping).await?))
}

/// `GET /api/telemetry`
pub async fn telemetry(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.live.snapshot().as_ref().clone())
}

/// `GET /api/telemetry/stream`: current map first, then one event per batch.
pub async fn telemetry_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = state.live.subscribe();
    let current = state.live.snapshot();

    let stream = async_stream::stream! {
        if let Some(event) = snapshot_event(&current) {
            yield Ok(event);
        }
        while let Some(batch) = subscription.recv().await {
            if let Some(event) = snapshot_event(&batch) {
                yield Ok(event);
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn snapshot_event(batch: &sentinel_domain::SnapshotBatch) -> Option<Event> {
    match Event::default().event("snapshot").json_data(batch.as_ref()) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, "Failed to encode snapshot event");
            None
        }
    }
}
