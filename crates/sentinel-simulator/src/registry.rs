//! Fleet registry client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use sentinel_domain::{NewUnit, Unit};
use uuid::Uuid;

use crate::error::RegistryError;

/// Registry of enlisted units
#[async_trait]
pub trait FleetRegistry: Send + Sync {
    /// List every enlisted unit
    async fn get_all(&self) -> Result<Vec<Unit>, RegistryError>;

    /// Enlist a new unit
    async fn create(&self, unit: &NewUnit) -> Result<Unit, RegistryError>;

    /// Decommission a unit
    async fn delete(&self, id: Uuid) -> Result<(), RegistryError>;
}

/// REST client for `/api/drones`
pub struct HttpFleetRegistry {
    client: Client,
    base_url: String,
}

impl HttpFleetRegistry {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn units_url(&self) -> String {
        format!("{}/api/drones", self.base_url)
    }

    async fn check(response: Response) -> Result<Response, RegistryError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(RegistryError::Status { status, body })
    }
}

#[async_trait]
impl FleetRegistry for HttpFleetRegistry {
    async fn get_all(&self) -> Result<Vec<Unit>, RegistryError> {
        let response = self.client.get(self.units_url()).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn create(&self, unit: &NewUnit) -> Result<Unit, RegistryError> {
        let response = self.client.post(self.units_url()).json(unit).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RegistryError> {
        let response = self
            .client
            .delete(format!("{}/{id}", self.units_url()))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(id));
        }
        Self::check(response).await?;
        Ok(())
    }
}
