//! # Telemetry Publishers
//!
//! Outbound seam of the simulator. Sessions hand every tick's payload to a
//! [`TelemetryPublisher`] and never await the result on the tick path.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use sentinel_domain::TelemetryPayload;
use tracing::info;

use crate::error::PublishError;

/// Acknowledgement of a delivered ping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishAck {
    pub call_sign: String,
    pub accepted_at: DateTime<Utc>,
}

impl PublishAck {
    pub fn now(call_sign: &str) -> Self {
        Self {
            call_sign: call_sign.to_string(),
            accepted_at: Utc::now(),
        }
    }
}

/// Destination for simulated telemetry
#[async_trait]
pub trait TelemetryPublisher: Send + Sync {
    /// Deliver one payload for `call_sign`
    async fn send(
        &self,
        call_sign: &str,
        payload: &TelemetryPayload,
    ) -> Result<PublishAck, PublishError>;
}

/// Posts pings to the relay's `/api/drones/{callSign}/ping` endpoint.
pub struct HttpTelemetryPublisher {
    client: Client,
    base_url: String,
}

impl HttpTelemetryPublisher {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PublishError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn ping_url(&self, call_sign: &str) -> String {
        format!("{}/api/drones/{}/ping", self.base_url, call_sign)
    }
}

#[async_trait]
impl TelemetryPublisher for HttpTelemetryPublisher {
    async fn send(
        &self,
        call_sign: &str,
        payload: &TelemetryPayload,
    ) -> Result<PublishAck, PublishError> {
        let response = self
            .client
            .post(self.ping_url(call_sign))
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PublishError::Rejected {
                call_sign: call_sign.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(PublishAck::now(call_sign))
    }
}

/// Dry-run publisher: logs every payload and acknowledges it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

#[async_trait]
impl TelemetryPublisher for LogPublisher {
    async fn send(
        &self,
        call_sign: &str,
        payload: &TelemetryPayload,
    ) -> Result<PublishAck, PublishError> {
        info!(
            call_sign,
            lat = payload.lat,
            lng = payload.lng,
            alt = payload.alt,
            battery = payload.battery,
            report = %payload.report,
            "Ping (dry run)"
        );
        Ok(PublishAck::now(call_sign))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_url_trims_trailing_slash() {
        let publisher =
            HttpTelemetryPublisher::new("http://localhost:8080/", Duration::from_secs(2)).unwrap();
        assert_eq!(
            publisher.ping_url("EAGLE-01"),
            "http://localhost:8080/api/drones/EAGLE-01/ping"
        );
    }

    #[tokio::test]
    async fn test_log_publisher_acknowledges() {
        let payload = TelemetryPayload {
            lat: 44.4,
            lng: 26.1,
            alt: 170.0,
            battery: 88,
            report: "Sector clear.".into(),
        };
        let ack = tokio_test::assert_ok!(LogPublisher.send("EAGLE-01", &payload).await);
        assert_eq!(ack.call_sign, "EAGLE-01");
    }
}
