//! In-memory Ledger Store
//!
//! All state sits behind one async mutex. A unit of work holds that mutex for
//! its whole lifetime and writes to a private copy of the state; `commit`
//! swaps the copy in. Dropping an uncommitted unit leaves the shared state
//! exactly as it was.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use core_kernel::{
    AdapterHealth, DividendId, DomainPort, HealthCheckResult, HealthCheckable, InvestmentId,
    KycDocumentId, MarketOrderId, PortError, PropertyId, SpvId, TradeId, TransactionId, UserId,
};
use domain_investor::{InvestorProfile, KycDocument};
use domain_property::{DueDiligence, Property, PropertyDocument, PropertyError, PropertyStatus, Spv};

use super::{LedgerPort, LedgerUnitOfWork};
use crate::dividend::DividendDistribution;
use crate::investment::Investment;
use crate::market::{MarketOrder, OrderSide, Trade};
use crate::transaction::Transaction;

#[derive(Debug, Clone, Default)]
struct LedgerState {
    properties: HashMap<PropertyId, Property>,
    spvs: HashMap<SpvId, Spv>,
    property_documents: Vec<PropertyDocument>,
    due_diligence: HashMap<PropertyId, DueDiligence>,
    profiles: HashMap<UserId, InvestorProfile>,
    kyc_documents: HashMap<KycDocumentId, KycDocument>,
    investments: HashMap<InvestmentId, Investment>,
    transactions: HashMap<TransactionId, Transaction>,
    orders: HashMap<MarketOrderId, MarketOrder>,
    trades: HashMap<TradeId, Trade>,
    dividends: HashMap<DividendId, DividendDistribution>,
}

/// In-memory implementation of [`LedgerPort`]
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedgerPort {
    state: Arc<Mutex<LedgerState>>,
    injected_conflicts: Arc<AtomicU32>,
}

impl InMemoryLedgerPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` commits fail with a conflict
    pub fn inject_conflicts(&self, count: u32) {
        self.injected_conflicts.store(count, Ordering::SeqCst);
    }
}

impl DomainPort for InMemoryLedgerPort {}

#[async_trait]
impl HealthCheckable for InMemoryLedgerPort {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::new("memory-ledger", AdapterHealth::Healthy, 0)
            .with_message("In-memory store")
    }
}

fn newest_first<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
    items
}

#[async_trait]
impl LedgerPort for InMemoryLedgerPort {
    async fn begin(&self) -> Result<Box<dyn LedgerUnitOfWork>, PortError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryUnitOfWork {
            guard,
            working,
            injected_conflicts: self.injected_conflicts.clone(),
        }))
    }

    async fn get_property(&self, id: PropertyId) -> Result<Option<Property>, PortError> {
        Ok(self.state.lock().await.properties.get(&id).cloned())
    }

    async fn list_properties(&self, status: Option<PropertyStatus>) -> Result<Vec<Property>, PortError> {
        let state = self.state.lock().await;
        let properties = state
            .properties
            .values()
            .filter(|p| status.map_or(true, |s| p.status == s))
            .cloned()
            .collect();
        Ok(newest_first(properties, |p: &Property| p.created_at))
    }

    async fn list_property_documents(&self, property_id: PropertyId) -> Result<Vec<PropertyDocument>, PortError> {
        let state = self.state.lock().await;
        Ok(state
            .property_documents
            .iter()
            .filter(|d| d.property_id == property_id)
            .cloned()
            .collect())
    }

    async fn get_spv(&self, id: SpvId) -> Result<Option<Spv>, PortError> {
        Ok(self.state.lock().await.spvs.get(&id).cloned())
    }

    async fn get_due_diligence(&self, property_id: PropertyId) -> Result<Option<DueDiligence>, PortError> {
        Ok(self.state.lock().await.due_diligence.get(&property_id).cloned())
    }

    async fn get_profile(&self, user_id: UserId) -> Result<Option<InvestorProfile>, PortError> {
        Ok(self.state.lock().await.profiles.get(&user_id).cloned())
    }

    async fn list_kyc_documents(&self, user_id: UserId) -> Result<Vec<KycDocument>, PortError> {
        let state = self.state.lock().await;
        let documents = state
            .kyc_documents
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(documents, |d: &KycDocument| d.submitted_at))
    }

    async fn get_investment(&self, id: InvestmentId) -> Result<Option<Investment>, PortError> {
        Ok(self.state.lock().await.investments.get(&id).cloned())
    }

    async fn list_investments(&self, user_id: UserId) -> Result<Vec<Investment>, PortError> {
        let state = self.state.lock().await;
        let investments = state
            .investments
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(investments, |i: &Investment| i.created_at))
    }

    async fn list_property_investments(&self, property_id: PropertyId) -> Result<Vec<Investment>, PortError> {
        let state = self.state.lock().await;
        Ok(state
            .investments
            .values()
            .filter(|i| i.property_id == property_id)
            .cloned()
            .collect())
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, PortError> {
        Ok(self.state.lock().await.transactions.get(&id).cloned())
    }

    async fn list_transactions(&self, user_id: UserId) -> Result<Vec<Transaction>, PortError> {
        let state = self.state.lock().await;
        let transactions = state
            .transactions
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(transactions, |t: &Transaction| (t.created_at, t.id)))
    }

    async fn list_orders(&self, user_id: UserId) -> Result<Vec<MarketOrder>, PortError> {
        let state = self.state.lock().await;
        let orders = state
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(orders, |o: &MarketOrder| (o.created_at, o.id)))
    }

    async fn list_open_orders(&self, property_id: PropertyId) -> Result<Vec<MarketOrder>, PortError> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .values()
            .filter(|o| o.property_id == property_id && o.is_active())
            .cloned()
            .collect())
    }

    async fn list_trades(&self, property_id: PropertyId) -> Result<Vec<Trade>, PortError> {
        let state = self.state.lock().await;
        let trades = state
            .trades
            .values()
            .filter(|t| t.property_id == property_id)
            .cloned()
            .collect();
        Ok(newest_first(trades, |t: &Trade| (t.executed_at, t.id)))
    }

    async fn list_dividends(&self, property_id: PropertyId) -> Result<Vec<DividendDistribution>, PortError> {
        let state = self.state.lock().await;
        let dividends = state
            .dividends
            .values()
            .filter(|d| d.property_id == property_id)
            .cloned()
            .collect();
        Ok(newest_first(dividends, |d: &DividendDistribution| d.created_at))
    }
}

/// A unit of work over a private copy of the state
pub struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<LedgerState>,
    working: LedgerState,
    injected_conflicts: Arc<AtomicU32>,
}

impl InMemoryUnitOfWork {
    fn property_mut(&mut self, id: PropertyId) -> Option<&mut Property> {
        self.working.properties.get_mut(&id)
    }
}

fn require_existing<T>(found: Option<T>, entity: &str, id: impl std::fmt::Display) -> Result<T, PortError> {
    found.ok_or_else(|| PortError::not_found(entity, id))
}

#[async_trait]
impl LedgerUnitOfWork for InMemoryUnitOfWork {
    async fn lock_property(&mut self, id: PropertyId) -> Result<Option<Property>, PortError> {
        Ok(self.working.properties.get(&id).cloned())
    }

    async fn insert_property(&mut self, property: &Property) -> Result<(), PortError> {
        if self.working.properties.contains_key(&property.id) {
            return Err(PortError::validation_field("Property already exists", "id"));
        }
        self.working.properties.insert(property.id, property.clone());
        Ok(())
    }

    async fn update_property(&mut self, property: &Property) -> Result<(), PortError> {
        let stored = require_existing(self.property_mut(property.id), "Property", property.id)?;
        let (available, total) = (stored.available_shares, stored.total_shares);
        *stored = property.clone();
        stored.available_shares = available;
        stored.total_shares = total;
        Ok(())
    }

    async fn reserve_shares(&mut self, id: PropertyId, shares: i64) -> Result<Option<Property>, PortError> {
        let Some(property) = self.property_mut(id) else {
            return Ok(None);
        };
        let mut candidate = property.clone();
        match candidate.reserve(shares) {
            Ok(()) => {
                *property = candidate.clone();
                Ok(Some(candidate))
            }
            Err(PropertyError::NotActive(_)) | Err(PropertyError::InsufficientShares { .. }) => Ok(None),
            Err(other) => Err(PortError::validation(other.to_string())),
        }
    }

    async fn release_shares(&mut self, id: PropertyId, shares: i64) -> Result<Option<Property>, PortError> {
        let Some(property) = self.property_mut(id) else {
            return Ok(None);
        };
        let mut candidate = property.clone();
        match candidate.release(shares) {
            Ok(()) => {
                *property = candidate.clone();
                Ok(Some(candidate))
            }
            Err(PropertyError::NotActive(_)) | Err(PropertyError::InventoryOverflow { .. }) => Ok(None),
            Err(other) => Err(PortError::validation(other.to_string())),
        }
    }

    async fn insert_spv(&mut self, spv: &Spv) -> Result<(), PortError> {
        if self
            .working
            .spvs
            .values()
            .any(|existing| existing.registration_number == spv.registration_number)
        {
            return Err(PortError::validation_field(
                format!("SPV registration number {} is already registered", spv.registration_number),
                "registration_number",
            ));
        }
        self.working.spvs.insert(spv.id, spv.clone());
        Ok(())
    }

    async fn insert_property_document(&mut self, document: &PropertyDocument) -> Result<(), PortError> {
        require_existing(self.working.properties.get(&document.property_id), "Property", document.property_id)?;
        self.working.property_documents.push(document.clone());
        Ok(())
    }

    async fn upsert_due_diligence(&mut self, report: &DueDiligence) -> Result<(), PortError> {
        require_existing(self.working.properties.get(&report.property_id), "Property", report.property_id)?;
        self.working.due_diligence.insert(report.property_id, report.clone());
        Ok(())
    }

    async fn lock_profile(&mut self, user_id: UserId) -> Result<Option<InvestorProfile>, PortError> {
        Ok(self.working.profiles.get(&user_id).cloned())
    }

    async fn save_profile(&mut self, profile: &InvestorProfile) -> Result<(), PortError> {
        self.working.profiles.insert(profile.user_id, profile.clone());
        Ok(())
    }

    async fn lock_kyc_document(&mut self, id: KycDocumentId) -> Result<Option<KycDocument>, PortError> {
        Ok(self.working.kyc_documents.get(&id).cloned())
    }

    async fn user_kyc_documents(&mut self, user_id: UserId) -> Result<Vec<KycDocument>, PortError> {
        Ok(self
            .working
            .kyc_documents
            .values()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn save_kyc_document(&mut self, document: &KycDocument) -> Result<(), PortError> {
        self.working.kyc_documents.insert(document.id, document.clone());
        Ok(())
    }

    async fn lock_investment(
        &mut self,
        user_id: UserId,
        property_id: PropertyId,
    ) -> Result<Option<Investment>, PortError> {
        Ok(self
            .working
            .investments
            .values()
            .find(|i| i.user_id == user_id && i.property_id == property_id)
            .cloned())
    }

    async fn lock_investment_by_id(&mut self, id: InvestmentId) -> Result<Option<Investment>, PortError> {
        Ok(self.working.investments.get(&id).cloned())
    }

    async fn lock_property_investments(&mut self, property_id: PropertyId) -> Result<Vec<Investment>, PortError> {
        Ok(self
            .working
            .investments
            .values()
            .filter(|i| i.property_id == property_id)
            .cloned()
            .collect())
    }

    async fn save_investment(&mut self, investment: &Investment) -> Result<(), PortError> {
        let duplicate = self.working.investments.values().any(|i| {
            i.id != investment.id && i.user_id == investment.user_id && i.property_id == investment.property_id
        });
        if duplicate {
            return Err(PortError::conflict("Investment for this user and property already exists"));
        }
        self.working.investments.insert(investment.id, investment.clone());
        Ok(())
    }

    async fn find_transaction_by_key(
        &mut self,
        user_id: UserId,
        key: &str,
    ) -> Result<Option<Transaction>, PortError> {
        Ok(self
            .working
            .transactions
            .values()
            .find(|t| t.user_id == user_id && t.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn lock_transaction(&mut self, id: TransactionId) -> Result<Option<Transaction>, PortError> {
        Ok(self.working.transactions.get(&id).cloned())
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), PortError> {
        if let Some(key) = transaction.idempotency_key.as_deref() {
            if self.find_transaction_by_key(transaction.user_id, key).await?.is_some() {
                return Err(PortError::conflict("Idempotency key already recorded"));
            }
        }
        self.working.transactions.insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn update_transaction_status(&mut self, transaction: &Transaction) -> Result<(), PortError> {
        let stored = require_existing(
            self.working.transactions.get_mut(&transaction.id),
            "Transaction",
            transaction.id,
        )?;
        stored.status = transaction.status;
        stored.completed_at = transaction.completed_at;
        Ok(())
    }

    async fn find_order_by_key(&mut self, user_id: UserId, key: &str) -> Result<Option<MarketOrder>, PortError> {
        Ok(self
            .working
            .orders
            .values()
            .find(|o| o.user_id == user_id && o.idempotency_key == key)
            .cloned())
    }

    async fn lock_order(&mut self, id: MarketOrderId) -> Result<Option<MarketOrder>, PortError> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn lock_open_orders(
        &mut self,
        property_id: PropertyId,
        side: OrderSide,
    ) -> Result<Vec<MarketOrder>, PortError> {
        Ok(self
            .working
            .orders
            .values()
            .filter(|o| o.property_id == property_id && o.side == side && o.is_active())
            .cloned()
            .collect())
    }

    async fn save_order(&mut self, order: &MarketOrder) -> Result<(), PortError> {
        let duplicate = self
            .working
            .orders
            .values()
            .any(|o| o.id != order.id && o.user_id == order.user_id && o.idempotency_key == order.idempotency_key);
        if duplicate {
            return Err(PortError::conflict("Idempotency key already recorded"));
        }
        self.working.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn insert_trade(&mut self, trade: &Trade) -> Result<(), PortError> {
        self.working.trades.insert(trade.id, trade.clone());
        Ok(())
    }

    async fn find_dividend_by_key(
        &mut self,
        property_id: PropertyId,
        key: &str,
    ) -> Result<Option<DividendDistribution>, PortError> {
        Ok(self
            .working
            .dividends
            .values()
            .find(|d| d.property_id == property_id && d.idempotency_key == key)
            .cloned())
    }

    async fn insert_dividend(&mut self, distribution: &DividendDistribution) -> Result<(), PortError> {
        if self
            .find_dividend_by_key(distribution.property_id, &distribution.idempotency_key)
            .await?
            .is_some()
        {
            return Err(PortError::conflict("Idempotency key already recorded"));
        }
        self.working.dividends.insert(distribution.id, distribution.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        let pending = self.injected_conflicts.load(Ordering::SeqCst);
        if pending > 0 {
            self.injected_conflicts.store(pending - 1, Ordering::SeqCst);
            return Err(PortError::conflict("Injected write conflict"));
        }

        let InMemoryUnitOfWork { mut guard, working, .. } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{Currency, Money};
    use rust_decimal_macros::dec;

    async fn seeded() -> (InMemoryLedgerPort, PropertyId) {
        let port = InMemoryLedgerPort::new();
        let mut property = Property::new("Harbour View", "Sydney", 10, Money::new(dec!(100), Currency::USD)).unwrap();
        property.transition_to(PropertyStatus::Active).unwrap();
        let id = property.id;

        let mut uow = port.begin().await.unwrap();
        uow.insert_property(&property).await.unwrap();
        uow.commit().await.unwrap();
        (port, id)
    }

    #[tokio::test]
    async fn test_dropped_unit_discards_writes() {
        let (port, id) = seeded().await;
        {
            let mut uow = port.begin().await.unwrap();
            assert!(uow.reserve_shares(id, 4).await.unwrap().is_some());
        }
        let property = port.get_property(id).await.unwrap().unwrap();
        assert_eq!(property.available_shares, 10);
    }

    #[tokio::test]
    async fn test_conditional_reserve() {
        let (port, id) = seeded().await;
        let mut uow = port.begin().await.unwrap();
        assert!(uow.reserve_shares(id, 11).await.unwrap().is_none());
        let funded = uow.reserve_shares(id, 10).await.unwrap().unwrap();
        assert_eq!(funded.status, PropertyStatus::Funded);
        assert!(uow.reserve_shares(id, 1).await.unwrap().is_none());
        uow.commit().await.unwrap();

        let property = port.get_property(id).await.unwrap().unwrap();
        assert_eq!(property.available_shares, 0);
    }

    #[tokio::test]
    async fn test_injected_conflict_rolls_back() {
        let (port, id) = seeded().await;
        port.inject_conflicts(1);

        let mut uow = port.begin().await.unwrap();
        uow.reserve_shares(id, 3).await.unwrap();
        let err = uow.commit().await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(port.get_property(id).await.unwrap().unwrap().available_shares, 10);
    }

    #[tokio::test]
    async fn test_health_check() {
        let port = InMemoryLedgerPort::new();
        assert!(port.health_check().await.is_healthy());
    }
}
