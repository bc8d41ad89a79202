//! Custodial wallet: deposits, withdrawals and statements

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use core_kernel::{Money, UserId};
use domain_investor::InvestorProfile;

use super::{ensure_currency, load_or_create_profile, LedgerSettings};
use crate::error::LedgerError;
use crate::idempotency::IdempotencyKey;
use crate::ports::LedgerPort;
use crate::transaction::{Transaction, TransactionType};

/// Outcome of a deposit or withdrawal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletReceipt {
    pub transaction: Transaction,
    /// True when the key matched an earlier identical entry
    pub replayed: bool,
}

#[derive(Clone)]
pub struct WalletService {
    port: Arc<dyn LedgerPort>,
    settings: LedgerSettings,
}

impl WalletService {
    pub fn new(port: Arc<dyn LedgerPort>, settings: LedgerSettings) -> Self {
        Self { port, settings }
    }

    /// Credits the wallet
    #[instrument(skip_all, fields(user_id = %user_id, amount = %amount))]
    pub async fn deposit(
        &self,
        user_id: UserId,
        amount: Money,
        key: IdempotencyKey,
    ) -> Result<WalletReceipt, LedgerError> {
        self.apply(user_id, TransactionType::Deposit, amount, key).await
    }

    /// Debits the wallet; fails with `InsufficientWalletBalance` on overdraw
    #[instrument(skip_all, fields(user_id = %user_id, amount = %amount))]
    pub async fn withdraw(
        &self,
        user_id: UserId,
        amount: Money,
        key: IdempotencyKey,
    ) -> Result<WalletReceipt, LedgerError> {
        self.apply(user_id, TransactionType::Withdrawal, amount, key).await
    }

    async fn apply(
        &self,
        user_id: UserId,
        transaction_type: TransactionType,
        amount: Money,
        key: IdempotencyKey,
    ) -> Result<WalletReceipt, LedgerError> {
        ensure_currency(self.settings.currency, &amount)?;
        if !amount.is_positive() || amount.round_to_currency() != amount {
            return Err(LedgerError::validation(format!(
                "Amount must be positive with at most {} decimal places",
                amount.currency().decimal_places()
            )));
        }

        let key = &key;
        let receipt = self
            .settings
            .retry
            .run(transaction_type.as_str(), move || {
                self.try_apply(user_id, transaction_type, amount, key)
            })
            .await?;
        tracing::info!(
            transaction_id = %receipt.transaction.id,
            replayed = receipt.replayed,
            "Wallet {} recorded",
            transaction_type
        );
        Ok(receipt)
    }

    async fn try_apply(
        &self,
        user_id: UserId,
        transaction_type: TransactionType,
        amount: Money,
        key: &IdempotencyKey,
    ) -> Result<WalletReceipt, LedgerError> {
        let mut uow = self.port.begin().await?;

        if let Some(existing) = uow.find_transaction_by_key(user_id, key.as_str()).await? {
            if existing.transaction_type == transaction_type && existing.amount == amount {
                return Ok(WalletReceipt {
                    transaction: existing,
                    replayed: true,
                });
            }
            return Err(LedgerError::IdempotencyKeyReused(key.to_string()));
        }

        let mut profile = load_or_create_profile(uow.as_mut(), user_id, self.settings.currency).await?;
        match transaction_type {
            TransactionType::Deposit => profile.credit(&amount)?,
            TransactionType::Withdrawal => profile.debit(&amount)?,
            other => {
                return Err(LedgerError::validation(format!(
                    "{} is not a wallet operation",
                    other
                )))
            }
        }

        let transaction = Transaction::cash(user_id, transaction_type, amount).with_idempotency_key(key.as_str());
        uow.save_profile(&profile).await?;
        uow.insert_transaction(&transaction).await?;
        uow.commit().await?;
        Ok(WalletReceipt {
            transaction,
            replayed: false,
        })
    }

    /// Current balances; an investor who never interacted gets an empty profile
    pub async fn balance(&self, user_id: UserId) -> Result<InvestorProfile, LedgerError> {
        Ok(self
            .port
            .get_profile(user_id)
            .await?
            .unwrap_or_else(|| InvestorProfile::new(user_id, self.settings.currency)))
    }

    /// Ledger entries for the user, newest first
    pub async fn list_transactions(&self, user_id: UserId) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.port.list_transactions(user_id).await?)
    }
}
