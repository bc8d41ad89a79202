//! Test Utilities Crate
//!
//! Shared test infrastructure, fixtures, and helpers for the fractional
//! real-estate ledger test suite.
//!
//! # Modules
//!
//! - `fixtures`: Deterministic test data for common entities
//! - `builders`: Builder patterns for properties, investors, positions and orders
//! - `database`: PostgreSQL testcontainer with the ledger migrations applied
//! - `assertions`: Assertion helpers for ledger invariants
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
