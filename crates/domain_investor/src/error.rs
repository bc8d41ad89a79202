//! Investor domain errors

use thiserror::Error;

use core_kernel::{Money, MoneyError};

/// Errors that can occur in the investor domain
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvestorError {
    /// The investor has not completed KYC verification
    #[error("KYC verification required (current status: {0})")]
    KycRequired(String),

    /// Wallet cannot cover the requested amount
    #[error("Insufficient wallet balance: requested {requested}, available {available}")]
    InsufficientWalletBalance { requested: Money, available: Money },

    /// Escrow cannot cover the requested amount
    #[error("Insufficient reserved balance: requested {requested}, reserved {reserved}")]
    InsufficientReservedBalance { requested: Money, reserved: Money },

    /// Amount was zero, negative or otherwise unusable
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Invalid investor or document data
    #[error("Invalid investor data: {0}")]
    InvalidData(String),

    /// Reviewers may not review their own documents
    #[error("Reviewer cannot review their own KYC document")]
    SelfReview,

    /// Document already carries a decision
    #[error("KYC document already reviewed: {0}")]
    AlreadyReviewed(String),

    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl InvestorError {
    /// Creates an InvalidData error with a message
    pub fn invalid(message: impl Into<String>) -> Self {
        InvestorError::InvalidData(message.into())
    }
}
