//! Infrastructure Database Layer
//!
//! PostgreSQL storage for the fractional real-estate ledger using SQLx.
//!
//! # Architecture
//!
//! - [`repositories`]: row types and executor-generic SQL per table group
//! - [`adapters`]: [`PostgresLedgerAdapter`], the `LedgerPort`
//!   implementation, which runs each unit of work in one database
//!   transaction
//! - [`pool`]: connection pool configuration and embedded migrations
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresLedgerAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/fractional_estate")).await?;
//! run_migrations(&pool).await?;
//! let adapter = PostgresLedgerAdapter::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use adapters::{PostgresLedgerAdapter, PostgresUnitOfWork};
