//! Row types and SQL for the ledger tables
//!
//! Every query function is generic over [`sqlx::PgExecutor`], so the same
//! SQL serves plain reads against the pool and locked reads inside a
//! transaction. Each row type converts into its domain type, failing with
//! [`DatabaseError::SerializationError`] when a stored value is not a known
//! variant.

pub mod property;
pub mod investor;
pub mod ledger;
pub mod market;

use std::fmt;
use std::str::FromStr;

use core_kernel::Currency;

use crate::error::DatabaseError;

/// Row locking applied to a `SELECT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lock {
    None,
    /// `FOR UPDATE`: the rows stay locked until the transaction ends
    ForUpdate,
}

impl Lock {
    pub(crate) fn clause(&self) -> &'static str {
        match self {
            Lock::None => "",
            Lock::ForUpdate => " FOR UPDATE",
        }
    }
}

/// Parses a text column into a domain enumeration
pub(crate) fn parse_column<T>(column: &str, value: &str) -> Result<T, DatabaseError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|_| DatabaseError::decode(column, value))
}

pub(crate) fn parse_currency(value: &str) -> Result<Currency, DatabaseError> {
    parse_column::<Currency>("currency", value)
}
