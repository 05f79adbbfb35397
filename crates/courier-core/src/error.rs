//! Error types for Courier.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CourierError>;

/// Top-level error for store, config, and validation failures.
#[derive(Debug, Error)]
pub enum CourierError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single delivery attempt failed. None of these are retried inside
/// the client; the message stays unsent and is picked up on a later tick.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to serialize payload: {0}")]
    Serialize(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("deadline exceeded")]
    Timeout,

    #[error("bad status: {0}")]
    Status(u16),

    #[error("unreadable response body: {0}")]
    Body(String),
}
