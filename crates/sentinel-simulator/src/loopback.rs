//! # In-Process Relay
//!
//! Publisher and registry that talk to a relay living in the same process,
//! used by `sentinel-sim run --local` and by tests that need the full
//! simulator → relay → bus path without a network.

use std::sync::Arc;

use async_trait::async_trait;
use sentinel_domain::{NewUnit, TelemetryPayload, Unit};
use sentinel_relay::{FleetStore, LiveTelemetry, PingRequest, RelayError};
use uuid::Uuid;

use crate::error::{PublishError, RegistryError};
use crate::publisher::{PublishAck, TelemetryPublisher};
use crate::registry::FleetRegistry;

/// Feeds pings straight into a [`LiveTelemetry`] store.
#[derive(Clone)]
pub struct LoopbackPublisher {
    live: Arc<LiveTelemetry>,
}

impl LoopbackPublisher {
    pub fn new(live: Arc<LiveTelemetry>) -> Self {
        Self { live }
    }
}

#[async_trait]
impl TelemetryPublisher for LoopbackPublisher {
    async fn send(
        &self,
        call_sign: &str,
        payload: &TelemetryPayload,
    ) -> Result<PublishAck, PublishError> {
        self.live
            .ingest(call_sign, PingRequest::from(payload))
            .await
            .map_err(|err| PublishError::Rejected {
                call_sign: call_sign.to_string(),
                status: err.status_code().as_u16(),
            })?;
        Ok(PublishAck::now(call_sign))
    }
}

/// [`FleetRegistry`] over an in-process [`FleetStore`].
#[derive(Clone)]
pub struct LoopbackRegistry {
    fleet: Arc<FleetStore>,
    live: Arc<LiveTelemetry>,
}

impl LoopbackRegistry {
    pub fn new(fleet: Arc<FleetStore>, live: Arc<LiveTelemetry>) -> Self {
        Self { fleet, live }
    }
}

#[async_trait]
impl FleetRegistry for LoopbackRegistry {
    async fn get_all(&self) -> Result<Vec<Unit>, RegistryError> {
        Ok(self.fleet.list())
    }

    async fn create(&self, unit: &NewUnit) -> Result<Unit, RegistryError> {
        self.fleet.enlist(unit.clone()).map_err(rejected)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RegistryError> {
        match self.fleet.decommission(id) {
            Ok(unit) => {
                self.live.remove(&unit.call_sign);
                Ok(())
            }
            Err(RelayError::NotFound { .. }) => Err(RegistryError::NotFound(id)),
            Err(err) => Err(rejected(err)),
        }
    }
}

fn rejected(err: RelayError) -> RegistryError {
    RegistryError::Status {
        status: err.status_code().as_u16(),
        body: err.to_string(),
    }
}
