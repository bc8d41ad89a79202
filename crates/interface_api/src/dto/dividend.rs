//! Dividend DTOs

use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct DistributeRequest {
    /// Cash to split across holders
    pub amount: Decimal,
    pub idempotency_key: Option<String>,
}
