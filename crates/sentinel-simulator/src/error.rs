//! Simulator error types

use thiserror::Error;
use uuid::Uuid;

/// Errors raised while configuring or driving sessions
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No current-thread tokio runtime available to schedule session ticks")]
    NoRuntime,

    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    #[error("Domain error: {0}")]
    Domain(#[from] sentinel_domain::DomainError),
}

/// Errors returned by a telemetry publisher
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Ping for {call_sign} rejected with status {status}")]
    Rejected { call_sign: String, status: u16 },

    #[error("Publisher unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by the fleet registry client
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Registry returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unit not found: {0}")]
    NotFound(Uuid),
}

pub type Result<T> = std::result::Result<T, SimulationError>;
