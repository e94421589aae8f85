//! Error types for repository operations

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while building or executing resource statements
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Invalid query parameters: {0}")]
    InvalidQueryParameters(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Invalid resource definition: {0}")]
    InvalidDefinition(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("Statement timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl RepositoryError {
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQueryParameters(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn resource_not_found(msg: impl Into<String>) -> Self {
        Self::ResourceNotFound(msg.into())
    }

    pub fn invalid_definition(msg: impl Into<String>) -> Self {
        Self::InvalidDefinition(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Whether the failure was caused by the caller's input rather than the store.
    ///
    /// Client errors are raised before any statement reaches the store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidQueryParameters(_) | Self::Validation(_) | Self::ResourceNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
