//! Request and response bodies

pub mod property;
pub mod investment;
pub mod wallet;
pub mod kyc;
pub mod market;
pub mod dividend;

use std::fmt::Display;
use std::str::FromStr;

use crate::error::ApiError;

/// Parses a snake_case enum value sent as a plain string
pub fn parse_enum<T>(field: &str, value: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| ApiError::bad_request(format!("{}: {}", field, e)))
}
