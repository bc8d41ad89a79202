//! Investment orchestrator
//!
//! Turns an investor's cash commitment into a recorded position against a
//! property's fixed share supply. For a wallet payment, the inventory
//! decrement, wallet debit, position upsert and ledger entry are one atomic
//! unit. A bank transfer only records a pending entry; its effects are applied
//! when the payment is confirmed.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use core_kernel::{InvestmentId, Money, PropertyId, TransactionId, UserId};
use domain_property::Property;

use super::{ensure_currency, load_or_create_profile, require_property, Actor, LedgerSettings};
use crate::error::LedgerError;
use crate::fees::Quote;
use crate::idempotency::IdempotencyKey;
use crate::investment::{Investment, InvestmentStatus};
use crate::ports::{LedgerPort, LedgerUnitOfWork};
use crate::transaction::{PaymentMethod, Transaction, TransactionType};

/// A request to buy shares on the primary market
#[derive(Debug, Clone)]
pub struct InvestRequest {
    pub user_id: UserId,
    pub property_id: PropertyId,
    pub shares: i64,
    /// Total the client expects to pay, fee included
    pub total_amount: Money,
    pub payment_method: PaymentMethod,
    pub idempotency_key: IdempotencyKey,
}

/// Outcome of an investment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentReceipt {
    pub transaction: Transaction,
    /// Position after the purchase; `None` while a bank transfer is pending
    pub investment: Option<Investment>,
    pub property: Property,
    pub quote: Quote,
    /// True when an earlier identical request was returned unchanged
    pub replayed: bool,
}

/// Result reported by the payment provider for a bank transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
}

/// One line of a user's portfolio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioEntry {
    pub investment: Investment,
    pub property_name: String,
    pub share_price: Money,
    pub current_value: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub entries: Vec<PortfolioEntry>,
    pub total_invested: Money,
    pub current_value: Money,
}

#[derive(Clone)]
pub struct InvestmentService {
    port: Arc<dyn LedgerPort>,
    settings: LedgerSettings,
}

impl InvestmentService {
    pub fn new(port: Arc<dyn LedgerPort>, settings: LedgerSettings) -> Self {
        Self { port, settings }
    }

    /// Prices a primary purchase
    pub async fn quote(&self, property_id: PropertyId, shares: i64) -> Result<Quote, LedgerError> {
        let property = self
            .port
            .get_property(property_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Property", property_id))?;
        if !property.is_open_for_investment() {
            return Err(LedgerError::PropertyNotActive {
                status: property.status.to_string(),
            });
        }
        self.settings.fees.quote(&property, shares)
    }

    /// Buys shares of a property
    ///
    /// # Errors
    ///
    /// - `KycRequired` unless the investor is verified
    /// - `PropertyNotActive`, `InsufficientShares` for the property
    /// - `AmountMismatch` when `total_amount` differs from the server quote
    /// - `InsufficientWalletBalance` for wallet payments
    /// - `IdempotencyKeyReused` when the key belongs to a different request
    /// - `ConcurrentConflict` after the retry budget is spent
    #[instrument(
        skip(self, request),
        fields(
            user_id = %request.user_id,
            property_id = %request.property_id,
            shares = request.shares,
            payment_method = request.payment_method.as_str(),
        )
    )]
    pub async fn invest(&self, request: InvestRequest) -> Result<InvestmentReceipt, LedgerError> {
        if request.shares <= 0 {
            return Err(LedgerError::validation(format!(
                "Shares must be positive, got {}",
                request.shares
            )));
        }
        ensure_currency(self.settings.currency, &request.total_amount)?;

        let request = &request;
        let receipt = self
            .settings
            .retry
            .run("invest", move || self.try_invest(request))
            .await?;

        if receipt.replayed {
            tracing::info!(transaction_id = %receipt.transaction.id, "Replayed investment");
        } else {
            tracing::info!(
                transaction_id = %receipt.transaction.id,
                total = %receipt.quote.total,
                status = %receipt.transaction.status,
                "Investment recorded"
            );
        }
        Ok(receipt)
    }

    async fn try_invest(&self, request: &InvestRequest) -> Result<InvestmentReceipt, LedgerError> {
        let mut uow = self.port.begin().await?;

        if let Some(existing) = uow
            .find_transaction_by_key(request.user_id, request.idempotency_key.as_str())
            .await?
        {
            return self.replay(uow.as_mut(), existing, request).await;
        }

        // Property row before profile row, the same order as order placement
        let property = uow.lock_property(request.property_id).await?;
        let mut profile = load_or_create_profile(uow.as_mut(), request.user_id, self.settings.currency).await?;
        profile.require_verified()?;

        let property = property.ok_or_else(|| LedgerError::not_found("Property", request.property_id))?;
        if !property.is_open_for_investment() {
            return Err(LedgerError::PropertyNotActive {
                status: property.status.to_string(),
            });
        }
        if property.available_shares < request.shares {
            return Err(LedgerError::InsufficientShares {
                requested: request.shares,
                available: property.available_shares,
            });
        }

        let quote = self.settings.fees.quote(&property, request.shares)?;
        quote.verify_total(&request.total_amount)?;

        let purchase = Transaction::for_shares(
            request.user_id,
            TransactionType::SharePurchase,
            property.id,
            request.shares,
            quote.total,
        )
        .with_fee(quote.fee)
        .with_payment_method(request.payment_method)
        .with_idempotency_key(request.idempotency_key.as_str());

        match request.payment_method {
            PaymentMethod::Wallet => {
                profile.debit(&quote.total)?;
                let property = reserve_shares(uow.as_mut(), &property, request.shares).await?;
                let investment =
                    accumulate_position(uow.as_mut(), request.user_id, &property, request.shares, &quote.total).await?;

                uow.save_profile(&profile).await?;
                uow.insert_transaction(&purchase).await?;
                uow.commit().await?;

                Ok(InvestmentReceipt {
                    transaction: purchase,
                    investment: Some(investment),
                    property,
                    quote,
                    replayed: false,
                })
            }
            PaymentMethod::BankTransfer => {
                let purchase = purchase.pending();
                uow.save_profile(&profile).await?;
                uow.insert_transaction(&purchase).await?;
                uow.commit().await?;

                Ok(InvestmentReceipt {
                    transaction: purchase,
                    investment: None,
                    property,
                    quote,
                    replayed: false,
                })
            }
        }
    }

    async fn replay(
        &self,
        uow: &mut dyn LedgerUnitOfWork,
        existing: Transaction,
        request: &InvestRequest,
    ) -> Result<InvestmentReceipt, LedgerError> {
        let same_request = existing.transaction_type == TransactionType::SharePurchase
            && existing.property_id == Some(request.property_id)
            && existing.shares == Some(request.shares)
            && existing.amount == request.total_amount
            && existing.payment_method == Some(request.payment_method);
        if !same_request {
            return Err(LedgerError::IdempotencyKeyReused(request.idempotency_key.to_string()));
        }

        let property = require_property(uow, request.property_id).await?;
        let investment = uow.lock_investment(request.user_id, request.property_id).await?;
        let quote = Quote {
            property_id: property.id,
            shares: request.shares,
            share_price: property.share_price,
            gross: existing.net_amount(),
            fee: existing.fee,
            fee_percent: self.settings.fees.platform_fee.as_percentage(),
            total: existing.amount,
        };

        Ok(InvestmentReceipt {
            investment: if existing.is_pending() { None } else { investment },
            transaction: existing,
            property,
            quote,
            replayed: true,
        })
    }

    /// Applies or fails a pending bank-transfer purchase
    ///
    /// A successful payment applies the deferred effects (inventory and
    /// position) and completes the transaction. If the property can no longer
    /// deliver the shares, or the payment failed, the transaction is marked
    /// failed instead.
    #[instrument(skip(self, actor), fields(admin_id = %actor.user_id))]
    pub async fn confirm_payment(
        &self,
        actor: &Actor,
        transaction_id: TransactionId,
        outcome: PaymentOutcome,
    ) -> Result<Transaction, LedgerError> {
        actor.require_admin()?;
        let transaction = self
            .settings
            .retry
            .run("confirm_payment", move || self.try_confirm(transaction_id, outcome))
            .await?;
        tracing::info!(status = %transaction.status, "Payment confirmation processed");
        Ok(transaction)
    }

    async fn try_confirm(
        &self,
        transaction_id: TransactionId,
        outcome: PaymentOutcome,
    ) -> Result<Transaction, LedgerError> {
        let mut uow = self.port.begin().await?;
        let mut transaction = uow
            .lock_transaction(transaction_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Transaction", transaction_id))?;

        if transaction.transaction_type != TransactionType::SharePurchase
            || transaction.payment_method != Some(PaymentMethod::BankTransfer)
        {
            return Err(LedgerError::InvalidState(format!(
                "Transaction {} is not a bank-transfer purchase",
                transaction_id
            )));
        }
        if !transaction.is_pending() {
            return Err(LedgerError::InvalidState(format!(
                "Transaction {} is already {}",
                transaction_id, transaction.status
            )));
        }

        let (property_id, shares) = match (transaction.property_id, transaction.shares) {
            (Some(property_id), Some(shares)) => (property_id, shares),
            _ => {
                return Err(LedgerError::InvalidState(format!(
                    "Transaction {} has no share context",
                    transaction_id
                )))
            }
        };

        if outcome == PaymentOutcome::Failed {
            transaction.fail()?;
            uow.update_transaction_status(&transaction).await?;
            uow.commit().await?;
            return Ok(transaction);
        }

        match uow.reserve_shares(property_id, shares).await? {
            Some(property) => {
                accumulate_position(uow.as_mut(), transaction.user_id, &property, shares, &transaction.amount).await?;
                transaction.complete()?;
            }
            None => {
                tracing::warn!(%transaction_id, %property_id, shares, "Property can no longer fill pending purchase");
                transaction.fail()?;
            }
        }

        uow.update_transaction_status(&transaction).await?;
        uow.commit().await?;
        Ok(transaction)
    }

    /// Returns shares to the primary inventory and refunds their cost
    ///
    /// Only unlisted shares can be refunded. The investor is credited the
    /// cost basis (`shares * average_buy_price`).
    #[instrument(skip(self, actor), fields(admin_id = %actor.user_id))]
    pub async fn refund_investment(
        &self,
        actor: &Actor,
        investment_id: InvestmentId,
        shares: i64,
    ) -> Result<Transaction, LedgerError> {
        actor.require_admin()?;
        let refund = self
            .settings
            .retry
            .run("refund_investment", move || self.try_refund(investment_id, shares))
            .await?;
        tracing::info!(transaction_id = %refund.id, amount = %refund.amount, "Investment refunded");
        Ok(refund)
    }

    async fn try_refund(&self, investment_id: InvestmentId, shares: i64) -> Result<Transaction, LedgerError> {
        let mut uow = self.port.begin().await?;
        let mut investment = uow
            .lock_investment_by_id(investment_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Investment", investment_id))?;

        let cost = investment.reduce(shares)?;
        let property = require_property(uow.as_mut(), investment.property_id).await?;
        if uow.release_shares(property.id, shares).await?.is_none() {
            return Err(match property.clone().release(shares) {
                Err(err) => err.into(),
                Ok(()) => LedgerError::from(core_kernel::PortError::conflict("Inventory changed during refund")),
            });
        }

        let mut profile = load_or_create_profile(uow.as_mut(), investment.user_id, self.settings.currency).await?;
        if cost.is_positive() {
            profile.credit(&cost)?;
        }

        let refund = Transaction::for_shares(
            investment.user_id,
            TransactionType::Refund,
            property.id,
            shares,
            cost,
        )
        .with_reference(investment.id);

        uow.save_investment(&investment).await?;
        uow.save_profile(&profile).await?;
        uow.insert_transaction(&refund).await?;
        uow.commit().await?;
        Ok(refund)
    }

    /// Active positions with their current market value
    pub async fn portfolio(&self, user_id: UserId) -> Result<Portfolio, LedgerError> {
        let currency = self.settings.currency;
        let mut entries = Vec::new();
        let mut total_invested = Money::zero(currency);
        let mut current_value = Money::zero(currency);

        for investment in self.port.list_investments(user_id).await? {
            if investment.status != InvestmentStatus::Active {
                continue;
            }
            let Some(property) = self.port.get_property(investment.property_id).await? else {
                continue;
            };
            let value = investment.current_value(&property.share_price);
            total_invested = total_invested.checked_add(&investment.total_invested)?;
            current_value = current_value.checked_add(&value)?;
            entries.push(PortfolioEntry {
                property_name: property.name.clone(),
                share_price: property.share_price,
                current_value: value,
                investment,
            });
        }

        Ok(Portfolio {
            entries,
            total_invested,
            current_value,
        })
    }
}

/// Conditionally decrements inventory, translating a failed guard into the
/// business error it stands for
pub(crate) async fn reserve_shares(
    uow: &mut dyn LedgerUnitOfWork,
    property: &Property,
    shares: i64,
) -> Result<Property, LedgerError> {
    match uow.reserve_shares(property.id, shares).await? {
        Some(updated) => Ok(updated),
        None => {
            let current = uow.lock_property(property.id).await?.unwrap_or_else(|| property.clone());
            match current.clone().reserve(shares) {
                Err(err) => Err(err.into()),
                Ok(()) => Err(core_kernel::PortError::conflict("Inventory changed concurrently").into()),
            }
        }
    }
}

/// Adds bought shares to the user's position in a property
pub(crate) async fn accumulate_position(
    uow: &mut dyn LedgerUnitOfWork,
    user_id: UserId,
    property: &Property,
    shares: i64,
    cost: &Money,
) -> Result<Investment, LedgerError> {
    let mut investment = uow
        .lock_investment(user_id, property.id)
        .await?
        .unwrap_or_else(|| Investment::open(user_id, property.id, property.currency()));
    investment.accumulate(shares, cost)?;
    uow.save_investment(&investment).await?;
    Ok(investment)
}
