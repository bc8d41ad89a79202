//! Property domain errors

use thiserror::Error;

/// Errors that can occur in the property domain
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropertyError {
    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    #[error("Invalid property data: {0}")]
    InvalidData(String),

    #[error("Property is not open for investment (status: {0})")]
    NotActive(String),

    #[error("Insufficient shares: requested {requested}, available {available}")]
    InsufficientShares {
        requested: i64,
        available: i64,
    },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: String,
        to: String,
    },

    #[error("Releasing {releasing} shares would exceed total supply of {total}")]
    InventoryOverflow {
        releasing: i64,
        total: i64,
    },
}

impl PropertyError {
    pub fn invalid(message: impl Into<String>) -> Self {
        PropertyError::InvalidData(message.into())
    }
}
