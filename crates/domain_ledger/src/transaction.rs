//! Ledger transactions
//!
//! Every movement of cash or shares leaves one immutable `Transaction` row.
//! The only mutation ever applied to a stored transaction is its status,
//! and only `pending -> completed | failed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{CoreError, Money, PropertyId, TransactionId, UserId};
use crate::error::LedgerError;

/// Kind of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    SharePurchase,
    ShareSale,
    Dividend,
    Refund,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::SharePurchase => "share_purchase",
            TransactionType::ShareSale => "share_sale",
            TransactionType::Dividend => "dividend",
            TransactionType::Refund => "refund",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionType::Deposit),
            "withdrawal" => Ok(TransactionType::Withdrawal),
            "share_purchase" => Ok(TransactionType::SharePurchase),
            "share_sale" => Ok(TransactionType::ShareSale),
            "dividend" => Ok(TransactionType::Dividend),
            "refund" => Ok(TransactionType::Refund),
            other => Err(CoreError::unknown_variant("transaction_type", other)),
        }
    }
}

/// Settlement state of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(CoreError::unknown_variant("transaction_status", other)),
        }
    }
}

/// How a share purchase is paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Debited from the custodial wallet immediately
    Wallet,
    /// Settled later; effects wait for payment confirmation
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wallet" => Ok(PaymentMethod::Wallet),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            other => Err(CoreError::unknown_variant("payment_method", other)),
        }
    }
}

/// An immutable ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub transaction_type: TransactionType,
    /// Cash moved, fee included
    pub amount: Money,
    /// Platform fee contained in `amount`
    pub fee: Money,
    pub status: TransactionStatus,
    pub payment_method: Option<PaymentMethod>,
    pub property_id: Option<PropertyId>,
    pub shares: Option<i64>,
    /// Client token, unique per user
    pub idempotency_key: Option<String>,
    /// Related entity (trade, dividend, investment) for audit
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Creates a completed cash transaction without property context
    pub fn cash(user_id: UserId, transaction_type: TransactionType, amount: Money) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new_v7(),
            user_id,
            transaction_type,
            amount,
            fee: Money::zero(amount.currency()),
            status: TransactionStatus::Completed,
            payment_method: None,
            property_id: None,
            shares: None,
            idempotency_key: None,
            reference: None,
            created_at: now,
            completed_at: Some(now),
        }
    }

    /// Creates a completed transaction that moves shares of a property
    pub fn for_shares(
        user_id: UserId,
        transaction_type: TransactionType,
        property_id: PropertyId,
        shares: i64,
        amount: Money,
    ) -> Self {
        Self {
            property_id: Some(property_id),
            shares: Some(shares),
            ..Self::cash(user_id, transaction_type, amount)
        }
    }

    pub fn with_fee(mut self, fee: Money) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn with_reference(mut self, reference: impl fmt::Display) -> Self {
        self.reference = Some(reference.to_string());
        self
    }

    /// Leaves the transaction pending until payment is confirmed
    pub fn pending(mut self) -> Self {
        self.status = TransactionStatus::Pending;
        self.completed_at = None;
        self
    }

    /// Net amount excluding the fee
    pub fn net_amount(&self) -> Money {
        self.amount
            .checked_sub(&self.fee)
            .unwrap_or(self.amount)
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    /// Marks a pending transaction completed
    pub fn complete(&mut self) -> Result<(), LedgerError> {
        self.transition(TransactionStatus::Completed)?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Marks a pending transaction failed
    pub fn fail(&mut self) -> Result<(), LedgerError> {
        self.transition(TransactionStatus::Failed)
    }

    fn transition(&mut self, target: TransactionStatus) -> Result<(), LedgerError> {
        if self.status != TransactionStatus::Pending {
            return Err(LedgerError::InvalidState(format!(
                "Transaction {} is {} and cannot become {}",
                self.id, self.status, target
            )));
        }
        self.status = target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_only_pending_transactions_change_status() {
        let amount = Money::new(dec!(100), Currency::USD);
        let mut txn = Transaction::cash(UserId::new(), TransactionType::Deposit, amount).pending();
        txn.complete().unwrap();
        assert_eq!(txn.status, TransactionStatus::Completed);
        assert!(txn.completed_at.is_some());

        assert!(txn.fail().is_err());
        assert!(txn.complete().is_err());
        assert_eq!(txn.status, TransactionStatus::Completed);
    }

    #[test]
    fn test_net_amount_excludes_fee() {
        let txn = Transaction::for_shares(
            UserId::new(),
            TransactionType::SharePurchase,
            PropertyId::new(),
            10,
            Money::new(dec!(510000), Currency::USD),
        )
        .with_fee(Money::new(dec!(10000), Currency::USD));
        assert_eq!(txn.net_amount().amount(), dec!(500000));
    }

    #[test]
    fn test_type_codes_parse() {
        assert_eq!("share_sale".parse::<TransactionType>().unwrap(), TransactionType::ShareSale);
        assert_eq!("bank_transfer".parse::<PaymentMethod>().unwrap(), PaymentMethod::BankTransfer);
        assert!("chargeback".parse::<TransactionType>().is_err());
    }
}
