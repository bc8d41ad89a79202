//! Core Kernel - Foundational types shared by every crate of the platform
//!
//! This crate provides the building blocks used across the domain modules:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers for properties, investors and ledger rows
//! - The port error taxonomy used by storage adapters

pub mod money;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use money::{Money, Currency, MoneyError, Rate};
pub use identifiers::{
    UserId, PropertyId, SpvId, PropertyDocumentId, InvestmentId, TransactionId,
    MarketOrderId, TradeId, KycDocumentId, DividendId,
};
pub use error::CoreError;
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth
};
