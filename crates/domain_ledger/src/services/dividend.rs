//! Dividend distribution to shareholders

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use core_kernel::{Money, PropertyId};

use super::{ensure_currency, load_or_create_profile, require_property, Actor, LedgerSettings};
use crate::dividend::{allocate_dividend, DividendAllocation, DividendDistribution};
use crate::error::LedgerError;
use crate::idempotency::IdempotencyKey;
use crate::ports::LedgerPort;
use crate::transaction::{Transaction, TransactionType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DividendReceipt {
    pub distribution: DividendDistribution,
    /// Per-holder amounts; empty when an earlier distribution was replayed
    pub allocations: Vec<DividendAllocation>,
    pub replayed: bool,
}

#[derive(Clone)]
pub struct DividendService {
    port: Arc<dyn LedgerPort>,
    settings: LedgerSettings,
}

impl DividendService {
    pub fn new(port: Arc<dyn LedgerPort>, settings: LedgerSettings) -> Self {
        Self { port, settings }
    }

    /// Pays `total` pro rata to every active position in the property
    ///
    /// Wallet credits and one `dividend` transaction per recipient commit
    /// together. Reusing the key for the same property returns the earlier
    /// distribution.
    #[instrument(skip_all, fields(admin_id = %actor.user_id, property_id = %property_id, total = %total))]
    pub async fn distribute(
        &self,
        actor: &Actor,
        property_id: PropertyId,
        total: Money,
        key: IdempotencyKey,
    ) -> Result<DividendReceipt, LedgerError> {
        actor.require_admin()?;
        ensure_currency(self.settings.currency, &total)?;
        if total.round_to_currency() != total {
            return Err(LedgerError::validation(format!(
                "Dividend amount has more precision than {} allows",
                total.currency()
            )));
        }

        let distributed_by = actor.user_id;
        let (total, key) = (&total, &key);
        let receipt = self
            .settings
            .retry
            .run("distribute_dividend", move || async move {
                let mut uow = self.port.begin().await?;

                if let Some(existing) = uow.find_dividend_by_key(property_id, key.as_str()).await? {
                    if existing.total_amount != *total {
                        return Err(LedgerError::IdempotencyKeyReused(key.to_string()));
                    }
                    return Ok(DividendReceipt {
                        distribution: existing,
                        allocations: Vec::new(),
                        replayed: true,
                    });
                }

                require_property(uow.as_mut(), property_id).await?;
                let holders = uow.lock_property_investments(property_id).await?;
                let allocations = allocate_dividend(total, &holders)?;
                let distribution =
                    DividendDistribution::new(property_id, *total, &allocations, key.as_str(), distributed_by)?;

                for allocation in allocations.iter().filter(|a| a.amount.is_positive()) {
                    let mut profile =
                        load_or_create_profile(uow.as_mut(), allocation.user_id, self.settings.currency).await?;
                    profile.credit(&allocation.amount)?;
                    uow.save_profile(&profile).await?;

                    let payout = Transaction::for_shares(
                        allocation.user_id,
                        TransactionType::Dividend,
                        property_id,
                        allocation.shares,
                        allocation.amount,
                    )
                    .with_reference(distribution.id);
                    uow.insert_transaction(&payout).await?;
                }

                uow.insert_dividend(&distribution).await?;
                uow.commit().await?;
                Ok::<_, LedgerError>(DividendReceipt {
                    distribution,
                    allocations,
                    replayed: false,
                })
            })
            .await?;

        tracing::info!(
            dividend_id = %receipt.distribution.id,
            recipients = receipt.distribution.recipients,
            replayed = receipt.replayed,
            "Dividend distributed"
        );
        Ok(receipt)
    }

    /// Past distributions of a property
    pub async fn list(&self, property_id: PropertyId) -> Result<Vec<DividendDistribution>, LedgerError> {
        Ok(self.port.list_dividends(property_id).await?)
    }
}
