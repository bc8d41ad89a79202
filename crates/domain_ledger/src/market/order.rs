//! Secondary-market orders

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{CoreError, MarketOrderId, Money, PropertyId, UserId};
use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }

    pub fn opposite(&self) -> OrderSide {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderSide {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            other => Err(CoreError::unknown_variant("order_side", other)),
        }
    }
}

/// Order lifecycle
///
/// ```text
/// open ──► partially_filled ──► filled
///   │              │
///   └──────────────┴──► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::PartiallyFilled => "partially_filled",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
    }

    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (*self, target),
            (Open, PartiallyFilled)
                | (Open, Filled)
                | (Open, Cancelled)
                | (PartiallyFilled, PartiallyFilled)
                | (PartiallyFilled, Filled)
                | (PartiallyFilled, Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(OrderStatus::Open),
            "partially_filled" => Ok(OrderStatus::PartiallyFilled),
            "filled" => Ok(OrderStatus::Filled),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(CoreError::unknown_variant("order_status", other)),
        }
    }
}

/// A limit order to buy or sell shares of one property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOrder {
    pub id: MarketOrderId,
    pub user_id: UserId,
    pub property_id: PropertyId,
    pub side: OrderSide,
    pub shares: i64,
    pub filled_shares: i64,
    pub price_per_share: Money,
    pub status: OrderStatus,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MarketOrder {
    pub fn new(
        user_id: UserId,
        property_id: PropertyId,
        side: OrderSide,
        shares: i64,
        price_per_share: Money,
        idempotency_key: impl Into<String>,
    ) -> Result<Self, LedgerError> {
        if shares <= 0 {
            return Err(LedgerError::validation(format!(
                "Shares must be positive, got {}",
                shares
            )));
        }
        if !price_per_share.is_positive() {
            return Err(LedgerError::validation("Price per share must be positive"));
        }
        if price_per_share.round_to_currency() != price_per_share {
            return Err(LedgerError::validation(format!(
                "Price per share has more precision than {} allows",
                price_per_share.currency()
            )));
        }

        let now = Utc::now();
        Ok(Self {
            id: MarketOrderId::new_v7(),
            user_id,
            property_id,
            side,
            shares,
            filled_shares: 0,
            price_per_share,
            status: OrderStatus::Open,
            idempotency_key: idempotency_key.into(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Shares still waiting to be matched
    pub fn remaining(&self) -> i64 {
        self.shares - self.filled_shares
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Cash needed to cover `shares` at this order's limit price
    pub fn notional(&self, shares: i64) -> Result<Money, LedgerError> {
        Ok(self.price_per_share.times(shares)?.round_to_currency())
    }

    /// Records an execution of `shares`
    pub fn fill(&mut self, shares: i64) -> Result<(), LedgerError> {
        if shares <= 0 || shares > self.remaining() {
            return Err(LedgerError::InvalidState(format!(
                "Cannot fill {} shares of order {} with {} remaining",
                shares,
                self.id,
                self.remaining()
            )));
        }
        let target = if shares == self.remaining() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self.transition(target)?;
        self.filled_shares += shares;
        Ok(())
    }

    /// Cancels the order, returning the unfilled remainder
    pub fn cancel(&mut self) -> Result<i64, LedgerError> {
        self.transition(OrderStatus::Cancelled)?;
        Ok(self.remaining())
    }

    fn transition(&mut self, target: OrderStatus) -> Result<(), LedgerError> {
        if !self.status.can_transition_to(target) {
            return Err(LedgerError::InvalidState(format!(
                "Order {} cannot move from {} to {}",
                self.id, self.status, target
            )));
        }
        self.status = target;
        self.updated_at = Utc::now();
        Ok(())
    }
}
