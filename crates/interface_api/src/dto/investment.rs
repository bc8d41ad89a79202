//! Investment DTOs

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use domain_ledger::PaymentOutcome;

#[derive(Debug, Deserialize, Validate)]
pub struct QuoteQuery {
    pub property_id: Uuid,
    #[validate(range(min = 1))]
    pub shares: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct InvestRequestBody {
    pub property_id: Uuid,
    #[validate(range(min = 1))]
    pub shares: i64,
    /// Amount the client expects to pay, fee included
    pub total_amount: Decimal,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    pub idempotency_key: Option<String>,
}

fn default_payment_method() -> String {
    "wallet".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub outcome: PaymentOutcome,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefundRequest {
    #[validate(range(min = 1))]
    pub shares: i64,
}
