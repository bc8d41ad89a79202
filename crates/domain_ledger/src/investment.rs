//! Investment positions
//!
//! One `Investment` row exists per (user, property). Buys accumulate into it
//! at a weighted-average price; sales and refunds reduce it at that average
//! cost. A row whose last share is gone becomes `sold` and is reactivated by
//! the next buy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{CoreError, Currency, InvestmentId, Money, PropertyId, UserId};
use crate::error::LedgerError;

/// Whether the position still holds shares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentStatus {
    Active,
    Sold,
}

impl InvestmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentStatus::Active => "active",
            InvestmentStatus::Sold => "sold",
        }
    }
}

impl fmt::Display for InvestmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvestmentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(InvestmentStatus::Active),
            "sold" => Ok(InvestmentStatus::Sold),
            other => Err(CoreError::unknown_variant("investment_status", other)),
        }
    }
}

/// A user's position in one property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investment {
    pub id: InvestmentId,
    pub user_id: UserId,
    pub property_id: PropertyId,
    pub shares_owned: i64,
    /// Shares locked by open sell orders
    pub shares_listed: i64,
    /// Cost basis of the shares currently owned
    pub total_invested: Money,
    pub average_buy_price: Money,
    pub status: InvestmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Investment {
    /// Creates an empty position; it becomes meaningful after `accumulate`
    pub fn open(user_id: UserId, property_id: PropertyId, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id: InvestmentId::new_v7(),
            user_id,
            property_id,
            shares_owned: 0,
            shares_listed: 0,
            total_invested: Money::zero(currency),
            average_buy_price: Money::zero(currency),
            status: InvestmentStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Shares that can still be listed, sold or refunded
    pub fn unlisted_shares(&self) -> i64 {
        self.shares_owned - self.shares_listed
    }

    /// Market value of the position at a share price
    pub fn current_value(&self, share_price: &Money) -> Money {
        share_price
            .times(self.shares_owned)
            .map(|m| m.round_to_currency())
            .unwrap_or_else(|_| Money::zero(share_price.currency()))
    }

    /// Adds bought shares at the given total cost
    pub fn accumulate(&mut self, shares: i64, cost: &Money) -> Result<(), LedgerError> {
        ensure_positive_shares(shares)?;
        let shares_owned = self
            .shares_owned
            .checked_add(shares)
            .ok_or_else(|| LedgerError::validation("Share count overflow"))?;
        let total_invested = self.total_invested.checked_add(cost)?;

        self.shares_owned = shares_owned;
        self.total_invested = total_invested;
        self.average_buy_price = total_invested.per_unit(shares_owned)?;
        self.status = InvestmentStatus::Active;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Removes unlisted shares and returns their cost basis
    pub fn reduce(&mut self, shares: i64) -> Result<Money, LedgerError> {
        ensure_positive_shares(shares)?;
        if shares > self.unlisted_shares() {
            return Err(LedgerError::InsufficientShares {
                requested: shares,
                available: self.unlisted_shares(),
            });
        }
        Ok(self.remove(shares))
    }

    /// Removes shares sold through a listed order, releasing the lock
    pub fn settle_listed(&mut self, shares: i64) -> Result<Money, LedgerError> {
        ensure_positive_shares(shares)?;
        if shares > self.shares_listed {
            return Err(LedgerError::InvalidState(format!(
                "Cannot settle {} shares, only {} listed",
                shares, self.shares_listed
            )));
        }
        self.shares_listed -= shares;
        Ok(self.remove(shares))
    }

    /// Locks shares for a sell order
    pub fn list(&mut self, shares: i64) -> Result<(), LedgerError> {
        ensure_positive_shares(shares)?;
        if shares > self.unlisted_shares() {
            return Err(LedgerError::InsufficientShares {
                requested: shares,
                available: self.unlisted_shares(),
            });
        }
        self.shares_listed += shares;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Unlocks shares of a cancelled sell order
    pub fn unlist(&mut self, shares: i64) -> Result<(), LedgerError> {
        if shares < 0 || shares > self.shares_listed {
            return Err(LedgerError::InvalidState(format!(
                "Cannot unlist {} shares, only {} listed",
                shares, self.shares_listed
            )));
        }
        self.shares_listed -= shares;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn remove(&mut self, shares: i64) -> Money {
        let cost = if shares == self.shares_owned {
            self.total_invested
        } else {
            self.average_buy_price
                .multiply(shares.into())
                .round_to_currency()
        };

        self.shares_owned -= shares;
        self.total_invested = self
            .total_invested
            .checked_sub(&cost)
            .unwrap_or_else(|_| Money::zero(self.total_invested.currency()));
        if self.shares_owned == 0 {
            self.status = InvestmentStatus::Sold;
            self.total_invested = Money::zero(self.total_invested.currency());
        }
        self.updated_at = Utc::now();
        cost
    }
}

fn ensure_positive_shares(shares: i64) -> Result<(), LedgerError> {
    if shares <= 0 {
        return Err(LedgerError::validation(format!(
            "Shares must be positive, got {}",
            shares
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usd(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }

    fn position() -> Investment {
        Investment::open(UserId::new(), PropertyId::new(), Currency::USD)
    }

    #[test]
    fn test_weighted_average_across_buys() {
        let mut inv = position();
        inv.accumulate(10, &usd(dec!(510000))).unwrap();
        inv.accumulate(5, &usd(dec!(240000))).unwrap();

        assert_eq!(inv.shares_owned, 15);
        assert_eq!(inv.total_invested, usd(dec!(750000)));
        assert_eq!(inv.average_buy_price, usd(dec!(50000)));
    }

    #[test]
    fn test_reduce_uses_average_cost() {
        let mut inv = position();
        inv.accumulate(3, &usd(dec!(100))).unwrap();

        let cost = inv.reduce(1).unwrap();
        assert_eq!(cost, usd(dec!(33.33)));
        assert_eq!(inv.total_invested, usd(dec!(66.67)));

        let rest = inv.reduce(2).unwrap();
        assert_eq!(rest, usd(dec!(66.67)));
        assert_eq!(inv.status, InvestmentStatus::Sold);
        assert!(inv.total_invested.is_zero());
    }

    #[test]
    fn test_listed_shares_cannot_be_reduced() {
        let mut inv = position();
        inv.accumulate(10, &usd(dec!(1000))).unwrap();
        inv.list(8).unwrap();

        assert!(matches!(
            inv.reduce(3),
            Err(LedgerError::InsufficientShares { requested: 3, available: 2 })
        ));
        assert!(inv.list(3).is_err());

        inv.settle_listed(8).unwrap();
        assert_eq!(inv.shares_owned, 2);
        assert_eq!(inv.shares_listed, 0);
    }

    #[test]
    fn test_sold_position_reactivates() {
        let mut inv = position();
        inv.accumulate(1, &usd(dec!(10))).unwrap();
        inv.reduce(1).unwrap();
        assert_eq!(inv.status, InvestmentStatus::Sold);

        inv.accumulate(2, &usd(dec!(30))).unwrap();
        assert_eq!(inv.status, InvestmentStatus::Active);
        assert_eq!(inv.average_buy_price, usd(dec!(15)));
    }
}
