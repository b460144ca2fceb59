//! Error types for the marketplace persistence layer.
//!
//! Database failures are classified once, at the point where a `sqlx::Error`
//! is converted, so that everything above the router only ever sees either a
//! result or a genuine business error.

use crate::database::classify::{ClassifyFailure, FailureClass};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketplaceError {
    /// The database could not be reached (refused, reset, timed out, pool closed)
    #[error("Database connectivity error: {0}")]
    Connectivity(String),
    /// SQLSTATE class 23: unique, foreign key, not-null or check violation
    #[error("Constraint violation ({code}): {message}")]
    ConstraintViolation { code: String, message: String },
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Purchase verification failed: {0}")]
    VerificationFailed(String),
}

impl MarketplaceError {
    /// True when the failure should send this one call to the fallback store
    pub fn is_connectivity(&self) -> bool {
        matches!(self, MarketplaceError::Connectivity(_))
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        MarketplaceError::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        MarketplaceError::ValidationError(message.into())
    }
}

impl ClassifyFailure for MarketplaceError {
    fn failure_class(&self) -> FailureClass {
        match self {
            MarketplaceError::Connectivity(_) => FailureClass::Connectivity,
            MarketplaceError::ConstraintViolation { .. } | MarketplaceError::Conflict(_) => {
                FailureClass::Integrity
            }
            _ => FailureClass::Other,
        }
    }
}

impl From<sqlx::Error> for MarketplaceError {
    fn from(err: sqlx::Error) -> Self {
        match err.failure_class() {
            FailureClass::Connectivity => MarketplaceError::Connectivity(err.to_string()),
            FailureClass::Integrity => {
                let code = err
                    .as_database_error()
                    .and_then(|db| db.code().map(|c| c.into_owned()))
                    .unwrap_or_default();
                MarketplaceError::ConstraintViolation {
                    code,
                    message: err.to_string(),
                }
            }
            FailureClass::Other => MarketplaceError::DatabaseError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for MarketplaceError {
    fn from(error: serde_json::Error) -> Self {
        MarketplaceError::StorageError(format!("JSON serialization error: {error}"))
    }
}

impl From<std::io::Error> for MarketplaceError {
    fn from(error: std::io::Error) -> Self {
        MarketplaceError::StorageError(error.to_string())
    }
}

impl From<crate::config::ConfigurationError> for MarketplaceError {
    fn from(error: crate::config::ConfigurationError) -> Self {
        MarketplaceError::ConfigurationError(error.to_string())
    }
}

pub type MarketplaceResult<T> = Result<T, MarketplaceError>;
