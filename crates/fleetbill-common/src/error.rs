//! Error types for Fleetbill
//!
//! Provides a unified error type, the not-found sub-taxonomy, and the
//! coarse [`ErrorClass`] used by callers to pick a response status.

use thiserror::Error;

/// Result type alias using BillingError
pub type Result<T> = std::result::Result<T, BillingError>;

/// Unified error type for Fleetbill operations
#[derive(Debug, Error)]
pub enum BillingError {
    // Missing trip / contract / version
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    // Malformed identifiers or numeric input
    #[error("Validation error: {0}")]
    Validation(String),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Lookup failures surfaced to callers as business errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("Trip {trip_id} not found")]
    Trip { trip_id: String },

    #[error("No contract links client {tenant_id} and vendor {vendor_id}")]
    Contract { tenant_id: String, vendor_id: String },

    #[error("No contract version of {contract_id} covers the start of trip {trip_id}")]
    CoveringVersion { trip_id: String, contract_id: String },

    #[error("No active contract for client {tenant_id}")]
    ActiveContract { tenant_id: String },
}

/// Coarse classification of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Validation,
    Internal,
}

impl BillingError {
    /// Classify this error for the caller
    pub fn class(&self) -> ErrorClass {
        match self {
            BillingError::NotFound(_) => ErrorClass::NotFound,
            BillingError::Validation(_) => ErrorClass::Validation,
            BillingError::Storage(_)
            | BillingError::Config(_)
            | BillingError::Serialization(_)
            | BillingError::Timeout(_)
            | BillingError::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Short machine-readable name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            BillingError::NotFound(NotFoundError::Trip { .. }) => "TripNotFoundError",
            BillingError::NotFound(NotFoundError::Contract { .. })
            | BillingError::NotFound(NotFoundError::ActiveContract { .. }) => {
                "ContractNotFoundError"
            }
            BillingError::NotFound(NotFoundError::CoveringVersion { .. }) => {
                "ContractVersionNotFoundError"
            }
            BillingError::Validation(_) => "ValidationError",
            BillingError::Storage(_) => "StorageError",
            BillingError::Config(_) => "ConfigError",
            BillingError::Serialization(_) => "SerializationError",
            BillingError::Timeout(_) => "TimeoutError",
            BillingError::Internal(_) => "InternalServerError",
        }
    }

    /// True for errors that should be reported to end users verbatim
    pub fn is_business(&self) -> bool {
        self.class() != ErrorClass::Internal
    }
}

// Implement From for common external error types
impl From<rusqlite::Error> for BillingError {
    fn from(err: rusqlite::Error) -> Self {
        BillingError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for BillingError {
    fn from(err: serde_json::Error) -> Self {
        BillingError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for BillingError {
    fn from(err: std::io::Error) -> Self {
        BillingError::Storage(err.to_string())
    }
}

impl From<anyhow::Error> for BillingError {
    fn from(err: anyhow::Error) -> Self {
        BillingError::Internal(err.to_string())
    }
}
