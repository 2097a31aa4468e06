//! Error types for the store engine.

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during engine operation.
///
/// Every variant except the I/O wrappers is an operator-input error: it is
/// surfaced for correction and never retried automatically.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Commit attempted with an empty cart or without a customer
    #[error("Cannot commit order: {0}")]
    InvalidCommit(String),

    /// Refund attempted on an order that is already refunded
    #[error("Order {0} has already been refunded")]
    AlreadyRefunded(String),

    /// Import batch rejected as a whole
    #[error("Invalid import at row {row}: {message}")]
    Format { row: usize, message: String },

    /// Operation referenced an id that does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Stock or balance arithmetic left the representable range
    #[error("Value out of range for {0}")]
    OutOfRange(String),

    /// Only raised when the oversell policy is disabled
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Administrative input failed validation
    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Failed to read or write a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Persisted snapshot could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Environment configuration could not be read
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Missing command-line argument
    #[error("Missing argument. Usage: {0}")]
    MissingArgument(&'static str),

    /// Unrecognised CLI command
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        StoreError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
