//! Domain Adapters
//!
//! Implementations of domain ports on top of the PostgreSQL repositories.
//! Each adapter translates between domain models and row types and maps
//! [`crate::DatabaseError`] onto the port error taxonomy.

pub mod ledger;

pub use ledger::{PostgresLedgerAdapter, PostgresUnitOfWork};
