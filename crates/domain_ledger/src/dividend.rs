//! Dividend distributions
//!
//! A distribution splits a cash amount across every active position in a
//! property, pro rata by shares owned. Allocations are rounded down to the
//! currency's minor unit and the remainder goes to the last recipient, so the
//! credited amounts always sum to exactly the distributed total.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{DividendId, Money, PropertyId, UserId};
use crate::error::LedgerError;
use crate::investment::{Investment, InvestmentStatus};

/// Record of one distribution run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividendDistribution {
    pub id: DividendId,
    pub property_id: PropertyId,
    pub total_amount: Money,
    /// Nominal amount per share before rounding
    pub per_share_amount: Money,
    pub recipients: i64,
    pub idempotency_key: String,
    pub distributed_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// Cash owed to one holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividendAllocation {
    pub user_id: UserId,
    pub shares: i64,
    pub amount: Money,
}

/// Splits `total` across holders by shares owned
///
/// Holders are ordered by user id first so the recipient of the rounding
/// remainder is deterministic.
pub fn allocate_dividend(total: &Money, holders: &[Investment]) -> Result<Vec<DividendAllocation>, LedgerError> {
    if !total.is_positive() {
        return Err(LedgerError::validation("Dividend amount must be positive"));
    }

    let mut eligible: Vec<&Investment> = holders
        .iter()
        .filter(|inv| inv.status == InvestmentStatus::Active && inv.shares_owned > 0)
        .collect();
    if eligible.is_empty() {
        return Err(LedgerError::validation("Property has no shareholders to pay"));
    }
    eligible.sort_by_key(|inv| inv.user_id);

    let weights: Vec<i64> = eligible.iter().map(|inv| inv.shares_owned).collect();
    let amounts = total.allocate_by_weights(&weights)?;

    Ok(eligible
        .into_iter()
        .zip(amounts)
        .map(|(inv, amount)| DividendAllocation {
            user_id: inv.user_id,
            shares: inv.shares_owned,
            amount,
        })
        .collect())
}

impl DividendDistribution {
    pub fn new(
        property_id: PropertyId,
        total_amount: Money,
        allocations: &[DividendAllocation],
        idempotency_key: impl Into<String>,
        distributed_by: UserId,
    ) -> Result<Self, LedgerError> {
        let shares: i64 = allocations.iter().map(|a| a.shares).sum();
        let per_share_amount = total_amount.per_unit(shares)?;

        Ok(Self {
            id: DividendId::new_v7(),
            property_id,
            total_amount,
            per_share_amount,
            recipients: allocations.len() as i64,
            idempotency_key: idempotency_key.into(),
            distributed_by,
            created_at: Utc::now(),
        })
    }
}
