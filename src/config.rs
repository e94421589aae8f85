//! Configuration for the repository layer
//!
//! Provides a builder pattern for configuring the store client and registry.

use std::time::Duration;

use crate::error::{RepositoryError, Result};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the store client and repositories
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// PostgreSQL database URL
    pub database_url: String,
    /// Maximum number of pooled connections (default: 5)
    pub max_connections: u32,
    /// How long to wait for a pooled connection (default: 30s)
    pub acquire_timeout: Duration,
    /// Per-statement timeout applied by the store client (default: none)
    pub statement_timeout: Option<Duration>,
    /// Whether create/update bodies are checked against the resource's
    /// validation rule before execution (default: false)
    pub validate_bodies: bool,
}

impl StoreConfig {
    /// Create a new configuration builder
    pub fn builder(database_url: impl Into<String>) -> StoreConfigBuilder {
        StoreConfigBuilder::new(database_url)
    }

    /// Load configuration from the process environment
    ///
    /// Reads `DATABASE_URL` (required), `DATABASE_MAX_CONNECTIONS` and
    /// `VALIDATE_BODIES`.
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| RepositoryError::Configuration("DATABASE_URL is not set".to_string()))?;

        let mut builder = Self::builder(database_url);

        if let Ok(raw) = std::env::var("DATABASE_MAX_CONNECTIONS") {
            let max = raw.parse::<u32>().map_err(|_| {
                RepositoryError::Configuration(format!(
                    "DATABASE_MAX_CONNECTIONS must be a positive integer, got '{}'",
                    raw
                ))
            })?;
            builder = builder.max_connections(max);
        }

        if let Ok(raw) = std::env::var("VALIDATE_BODIES") {
            builder = builder.validate_bodies(parse_flag(&raw).ok_or_else(|| {
                RepositoryError::Configuration(format!(
                    "VALIDATE_BODIES must be a boolean, got '{}'",
                    raw
                ))
            })?);
        }

        Ok(builder.build())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Builder for StoreConfig
#[derive(Debug)]
pub struct StoreConfigBuilder {
    database_url: String,
    max_connections: u32,
    acquire_timeout: Duration,
    statement_timeout: Option<Duration>,
    validate_bodies: bool,
}

impl StoreConfigBuilder {
    /// Create a new builder with the database URL
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            statement_timeout: None,
            validate_bodies: false,
        }
    }

    /// Set the maximum pool size (values below 1 are raised to 1)
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    /// Set the connection acquire timeout
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Bound every statement execution by `timeout`
    pub fn statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    /// Enable or disable body validation on create/update (default: false)
    pub fn validate_bodies(mut self, enabled: bool) -> Self {
        self.validate_bodies = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> StoreConfig {
        StoreConfig {
            database_url: self.database_url,
            max_connections: self.max_connections,
            acquire_timeout: self.acquire_timeout,
            statement_timeout: self.statement_timeout,
            validate_bodies: self.validate_bodies,
        }
    }
}
