//! Secondary market DTOs

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use domain_ledger::OrderSide;

#[derive(Debug, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    pub property_id: Uuid,
    pub side: OrderSide,
    #[validate(range(min = 1))]
    pub shares: i64,
    pub price_per_share: Decimal,
    pub idempotency_key: Option<String>,
}
