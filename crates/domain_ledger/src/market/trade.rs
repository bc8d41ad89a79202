//! Executed trades

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{MarketOrderId, Money, PropertyId, TradeId, UserId};

/// A match between one buy order and one sell order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub property_id: PropertyId,
    pub buy_order_id: MarketOrderId,
    pub sell_order_id: MarketOrderId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub shares: i64,
    /// Execution price, always the resting order's limit
    pub price_per_share: Money,
    pub total: Money,
    pub executed_at: DateTime<Utc>,
}
