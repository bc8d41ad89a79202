//! Investor profile and custodial wallet
//!
//! One profile exists per user and is created lazily on first access. It
//! carries the KYC status that gates investment, plus two cash balances:
//!
//! - `wallet_balance`: cash the investor can spend or withdraw
//! - `reserved_balance`: cash escrowed by open buy orders on the market
//!
//! Both balances are non-negative after every operation; a failing operation
//! leaves the profile untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, Money, UserId};
use crate::error::InvestorError;
use crate::kyc::KycStatus;

/// Per-user investor state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestorProfile {
    pub user_id: UserId,
    pub kyc_status: KycStatus,
    pub wallet_balance: Money,
    pub reserved_balance: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvestorProfile {
    /// Creates an empty, unverified profile
    pub fn new(user_id: UserId, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            kyc_status: KycStatus::NotStarted,
            wallet_balance: Money::zero(currency),
            reserved_balance: Money::zero(currency),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn currency(&self) -> Currency {
        self.wallet_balance.currency()
    }

    /// True iff the investor may buy shares
    pub fn is_eligible_to_invest(&self) -> bool {
        self.kyc_status == KycStatus::Verified
    }

    /// Fails with `KycRequired` unless the investor is verified
    pub fn require_verified(&self) -> Result<(), InvestorError> {
        if self.is_eligible_to_invest() {
            Ok(())
        } else {
            Err(InvestorError::KycRequired(self.kyc_status.to_string()))
        }
    }

    /// Adds cash to the wallet
    pub fn credit(&mut self, amount: &Money) -> Result<(), InvestorError> {
        ensure_positive(amount)?;
        self.wallet_balance = self.wallet_balance.checked_add(amount)?;
        self.touch();
        Ok(())
    }

    /// Removes cash from the wallet
    pub fn debit(&mut self, amount: &Money) -> Result<(), InvestorError> {
        ensure_positive(amount)?;
        self.wallet_balance.ensure_same_currency(amount)?;
        if self.wallet_balance.amount() < amount.amount() {
            return Err(InvestorError::InsufficientWalletBalance {
                requested: *amount,
                available: self.wallet_balance,
            });
        }
        self.wallet_balance = self.wallet_balance.checked_sub(amount)?;
        self.touch();
        Ok(())
    }

    /// Moves cash from the wallet into escrow for an open buy order
    pub fn escrow(&mut self, amount: &Money) -> Result<(), InvestorError> {
        self.debit(amount)?;
        self.reserved_balance = self.reserved_balance.checked_add(amount)?;
        Ok(())
    }

    /// Pays out of escrow, e.g. to settle a matched buy order
    pub fn consume_escrow(&mut self, amount: &Money) -> Result<(), InvestorError> {
        if amount.is_zero() {
            return Ok(());
        }
        self.take_reserved(amount)?;
        self.touch();
        Ok(())
    }

    /// Returns escrowed cash to the wallet
    pub fn release_escrow(&mut self, amount: &Money) -> Result<(), InvestorError> {
        if amount.is_zero() {
            return Ok(());
        }
        self.take_reserved(amount)?;
        self.wallet_balance = self.wallet_balance.checked_add(amount)?;
        self.touch();
        Ok(())
    }

    /// Marks that a document is awaiting review
    ///
    /// Verified investors stay verified while an additional document is
    /// reviewed; everyone else moves to `pending`.
    pub fn mark_documents_submitted(&mut self) {
        if self.kyc_status != KycStatus::Verified {
            self.set_kyc_status(KycStatus::Pending);
        }
    }

    pub fn set_kyc_status(&mut self, status: KycStatus) {
        if self.kyc_status != status {
            tracing::info!(
                user_id = %self.user_id,
                from = %self.kyc_status,
                to = %status,
                "KYC status changed"
            );
            self.kyc_status = status;
            self.touch();
        }
    }

    fn take_reserved(&mut self, amount: &Money) -> Result<(), InvestorError> {
        if amount.is_negative() {
            return Err(InvestorError::InvalidAmount(amount.to_string()));
        }
        self.reserved_balance.ensure_same_currency(amount)?;
        if self.reserved_balance.amount() < amount.amount() {
            return Err(InvestorError::InsufficientReservedBalance {
                requested: *amount,
                reserved: self.reserved_balance,
            });
        }
        self.reserved_balance = self.reserved_balance.checked_sub(amount)?;
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn ensure_positive(amount: &Money) -> Result<(), InvestorError> {
    if !amount.is_positive() {
        return Err(InvestorError::InvalidAmount(format!(
            "Amount must be positive, got {}",
            amount
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

    #[test]
    fn test_new_profile_is_not_eligible() {
        let profile = InvestorProfile::new(UserId::new(), Currency::USD);
        assert!(!profile.is_eligible_to_invest());
        assert_eq!(
            profile.require_verified(),
            Err(InvestorError::KycRequired("not_started".to_string()))
        );
    }

    #[test]
    fn test_debit_beyond_balance_leaves_wallet_untouched() {
        let mut profile = InvestorProfile::new(UserId::new(), Currency::USD);
        profile.credit(&usd(dec!(100))).unwrap();

        let result = profile.debit(&usd(dec!(100.01)));
        assert!(matches!(result, Err(InvestorError::InsufficientWalletBalance { .. })));
        assert_eq!(profile.wallet_balance, usd(dec!(100)));
    }

    #[test]
    fn test_escrow_cycle() {
        let mut profile = InvestorProfile::new(UserId::new(), Currency::USD);
        profile.credit(&usd(dec!(1000))).unwrap();
        profile.escrow(&usd(dec!(600))).unwrap();
        assert_eq!(profile.wallet_balance, usd(dec!(400)));
        assert_eq!(profile.reserved_balance, usd(dec!(600)));

        profile.consume_escrow(&usd(dec!(450))).unwrap();
        profile.release_escrow(&usd(dec!(150))).unwrap();
        assert_eq!(profile.wallet_balance, usd(dec!(550)));
        assert!(profile.reserved_balance.is_zero());
    }

    #[test]
    fn test_rejects_non_positive_and_foreign_amounts() {
        let mut profile = InvestorProfile::new(UserId::new(), Currency::USD);
        assert!(matches!(profile.credit(&usd(dec!(0))), Err(InvestorError::InvalidAmount(_))));
        assert!(matches!(
            profile.credit(&Money::new(dec!(5), Currency::EUR)),
            Err(InvestorError::Money(_))
        ));
    }

    #[test]
    fn test_verified_investor_stays_verified_on_new_submission() {
        let mut profile = InvestorProfile::new(UserId::new(), Currency::USD);
        profile.mark_documents_submitted();
        assert_eq!(profile.kyc_status, KycStatus::Pending);

        profile.set_kyc_status(KycStatus::Verified);
        profile.mark_documents_submitted();
        assert_eq!(profile.kyc_status, KycStatus::Verified);
    }
}
