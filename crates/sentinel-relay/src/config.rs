//! # Relay Configuration
//!
//! Environment-based configuration for the relay service.

use std::env;
use std::net::SocketAddr;

use crate::error::{RelayError, RelayResult};

/// Relay server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address
    pub server_addr: SocketAddr,

    /// Logging level
    pub log_level: String,

    /// CORS allowed origins
    pub cors_origins: Vec<String>,

    /// Snapshot batches a slow stream client may fall behind
    pub stream_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> RelayResult<Self> {
        let raw_addr = env::var("RELAY_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let server_addr = raw_addr
            .parse()
            .map_err(|_| RelayError::Config(format!("invalid RELAY_ADDR '{raw_addr}'")))?;

        Ok(Self {
            server_addr,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            cors_origins: split_origins(
                &env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()),
            ),

            stream_capacity: env::var("STREAM_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(sentinel_dashboard::subscription::DEFAULT_CAPACITY),
        })
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|origin| origin == "*")
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}
