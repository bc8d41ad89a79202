//! Ledger errors
//!
//! `LedgerError` is what every service returns. Callers that need a stable,
//! machine-readable code (the HTTP layer, clients) use [`LedgerError::kind`],
//! which maps onto the closed [`ErrorKind`] enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use core_kernel::{CoreError, Money, MoneyError, PortError};
use domain_investor::InvestorError;
use domain_property::PropertyError;

/// Stable error codes exposed to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    KycRequired,
    PropertyNotActive,
    InsufficientShares,
    AmountMismatch,
    InsufficientWalletBalance,
    ConcurrentConflict,
    IdempotencyKeyReused,
    Validation,
    NotFound,
    InvalidState,
    Forbidden,
    Infrastructure,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::KycRequired => "KYC_REQUIRED",
            ErrorKind::PropertyNotActive => "PROPERTY_NOT_ACTIVE",
            ErrorKind::InsufficientShares => "INSUFFICIENT_SHARES",
            ErrorKind::AmountMismatch => "AMOUNT_MISMATCH",
            ErrorKind::InsufficientWalletBalance => "INSUFFICIENT_WALLET_BALANCE",
            ErrorKind::ConcurrentConflict => "CONCURRENT_CONFLICT",
            ErrorKind::IdempotencyKeyReused => "IDEMPOTENCY_KEY_REUSED",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::Infrastructure => "INFRASTRUCTURE",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors returned by ledger services
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("KYC verification required (current status: {0})")]
    KycRequired(String),

    #[error("Property is not open for this operation (status: {status})")]
    PropertyNotActive { status: String },

    #[error("Insufficient shares: requested {requested}, available {available}")]
    InsufficientShares { requested: i64, available: i64 },

    #[error("Amount mismatch: expected {expected}, provided {provided}")]
    AmountMismatch { expected: Money, provided: Money },

    #[error("Insufficient wallet balance: requested {requested}, available {available}")]
    InsufficientWalletBalance { requested: Money, available: Money },

    #[error("Gave up after {attempts} attempts due to concurrent updates")]
    ConcurrentConflict { attempts: u32 },

    #[error("Idempotency key {0} was already used for a different request")]
    IdempotencyKeyReused(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Port(#[from] PortError),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        LedgerError::Forbidden(message.into())
    }

    /// Client-facing error code
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::KycRequired(_) => ErrorKind::KycRequired,
            LedgerError::PropertyNotActive { .. } => ErrorKind::PropertyNotActive,
            LedgerError::InsufficientShares { .. } => ErrorKind::InsufficientShares,
            LedgerError::AmountMismatch { .. } => ErrorKind::AmountMismatch,
            LedgerError::InsufficientWalletBalance { .. } => ErrorKind::InsufficientWalletBalance,
            LedgerError::ConcurrentConflict { .. } => ErrorKind::ConcurrentConflict,
            LedgerError::IdempotencyKeyReused(_) => ErrorKind::IdempotencyKeyReused,
            LedgerError::Validation(_) => ErrorKind::Validation,
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::InvalidState(_) => ErrorKind::InvalidState,
            LedgerError::Forbidden(_) => ErrorKind::Forbidden,
            LedgerError::Port(port) => match port {
                PortError::Conflict { .. } => ErrorKind::ConcurrentConflict,
                PortError::NotFound { .. } => ErrorKind::NotFound,
                PortError::Validation { .. } => ErrorKind::Validation,
                _ => ErrorKind::Infrastructure,
            },
        }
    }

    /// True when the whole command can be retried from scratch
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Port(port) if port.is_conflict())
    }
}

impl From<PropertyError> for LedgerError {
    fn from(err: PropertyError) -> Self {
        match err {
            PropertyError::PropertyNotFound(id) => LedgerError::NotFound { entity: "Property", id },
            PropertyError::InvalidData(message) => LedgerError::Validation(message),
            PropertyError::NotActive(status) => LedgerError::PropertyNotActive { status },
            PropertyError::InsufficientShares { requested, available } => {
                LedgerError::InsufficientShares { requested, available }
            }
            PropertyError::InvalidStatusTransition { from, to } => {
                LedgerError::InvalidState(format!("Property cannot move from {} to {}", from, to))
            }
            other @ PropertyError::InventoryOverflow { .. } => LedgerError::InvalidState(other.to_string()),
        }
    }
}

impl From<InvestorError> for LedgerError {
    fn from(err: InvestorError) -> Self {
        match err {
            InvestorError::KycRequired(status) => LedgerError::KycRequired(status),
            InvestorError::InsufficientWalletBalance { requested, available } => {
                LedgerError::InsufficientWalletBalance { requested, available }
            }
            InvestorError::SelfReview => LedgerError::Forbidden(err.to_string()),
            InvestorError::AlreadyReviewed(_) | InvestorError::InsufficientReservedBalance { .. } => {
                LedgerError::InvalidState(err.to_string())
            }
            InvestorError::InvalidAmount(_) | InvestorError::InvalidData(_) | InvestorError::Money(_) => {
                LedgerError::Validation(err.to_string())
            }
        }
    }
}

impl From<MoneyError> for LedgerError {
    fn from(err: MoneyError) -> Self {
        LedgerError::Validation(err.to_string())
    }
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(id) => LedgerError::NotFound { entity: "Entity", id },
            CoreError::InvalidStateTransition(message) => LedgerError::InvalidState(message),
            other => LedgerError::Validation(other.to_string()),
        }
    }
}
