//! PostgreSQL Ledger Store
//!
//! [`PostgresLedgerAdapter`] implements the ledger port on a connection pool.
//! Reads run directly against the pool. [`LedgerPort::begin`] opens a
//! database transaction wrapped in a [`PostgresUnitOfWork`]:
//!
//! - `lock_*` reads use `SELECT ... FOR UPDATE`
//! - share inventory moves through conditional `UPDATE ... RETURNING`
//!   statements, so two units can never oversell a property
//! - dropping the unit without `commit` rolls the transaction back
//!
//! Unique violations, serialization failures and deadlocks surface as
//! [`PortError::Conflict`] and the services retry the whole command.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresLedgerAdapter};
//! use domain_ledger::LedgerPort;
//!
//! let pool = create_pool(DatabaseConfig::new(url)).await?;
//! run_migrations(&pool).await?;
//! let port: Arc<dyn LedgerPort> = Arc::new(PostgresLedgerAdapter::new(pool));
//! ```

use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use tracing::{debug, instrument, warn};

use core_kernel::{
    AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, InvestmentId, KycDocumentId,
    MarketOrderId, PortError, PropertyId, SpvId, TransactionId, UserId,
};
use domain_investor::{InvestorProfile, KycDocument};
use domain_ledger::{
    DividendDistribution, Investment, LedgerPort, LedgerUnitOfWork, MarketOrder, OrderSide, Trade,
    Transaction,
};
use domain_property::{DueDiligence, Property, PropertyDocument, PropertyStatus, Spv};

use crate::error::DatabaseError;
use crate::repositories::{investor, ledger, market, property, Lock};

/// PostgreSQL-backed implementation of [`LedgerPort`]
#[derive(Debug, Clone)]
pub struct PostgresLedgerAdapter {
    pool: PgPool,
}

impl PostgresLedgerAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DomainPort for PostgresLedgerAdapter {}

#[async_trait]
impl HealthCheckable for PostgresLedgerAdapter {
    /// Runs `SELECT 1` against the pool
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::new("postgres-ledger", AdapterHealth::Healthy, latency_ms),
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                HealthCheckResult::new("postgres-ledger", AdapterHealth::Unhealthy, latency_ms)
                    .with_message(e.to_string())
            }
        }
    }
}

#[async_trait]
impl LedgerPort for PostgresLedgerAdapter {
    async fn begin(&self) -> Result<Box<dyn LedgerUnitOfWork>, PortError> {
        let tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        Ok(Box::new(PostgresUnitOfWork { tx }))
    }

    #[instrument(skip(self), fields(property_id = %id))]
    async fn get_property(&self, id: PropertyId) -> Result<Option<Property>, PortError> {
        Ok(property::find_property(&self.pool, id, Lock::None).await?)
    }

    #[instrument(skip(self))]
    async fn list_properties(&self, status: Option<PropertyStatus>) -> Result<Vec<Property>, PortError> {
        Ok(property::list_properties(&self.pool, status).await?)
    }

    async fn list_property_documents(&self, property_id: PropertyId) -> Result<Vec<PropertyDocument>, PortError> {
        Ok(property::list_documents(&self.pool, property_id).await?)
    }

    async fn get_spv(&self, id: SpvId) -> Result<Option<Spv>, PortError> {
        Ok(property::find_spv(&self.pool, id).await?)
    }

    async fn get_due_diligence(&self, property_id: PropertyId) -> Result<Option<DueDiligence>, PortError> {
        Ok(property::find_due_diligence(&self.pool, property_id).await?)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn get_profile(&self, user_id: UserId) -> Result<Option<InvestorProfile>, PortError> {
        Ok(investor::find_profile(&self.pool, user_id, Lock::None).await?)
    }

    async fn list_kyc_documents(&self, user_id: UserId) -> Result<Vec<KycDocument>, PortError> {
        Ok(investor::list_kyc_documents(&self.pool, user_id).await?)
    }

    async fn get_investment(&self, id: InvestmentId) -> Result<Option<Investment>, PortError> {
        Ok(ledger::find_investment(&self.pool, id, Lock::None).await?)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_investments(&self, user_id: UserId) -> Result<Vec<Investment>, PortError> {
        Ok(ledger::list_user_investments(&self.pool, user_id).await?)
    }

    async fn list_property_investments(&self, property_id: PropertyId) -> Result<Vec<Investment>, PortError> {
        Ok(ledger::list_property_investments(&self.pool, property_id, Lock::None).await?)
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, PortError> {
        Ok(ledger::find_transaction(&self.pool, id, Lock::None).await?)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_transactions(&self, user_id: UserId) -> Result<Vec<Transaction>, PortError> {
        Ok(ledger::list_transactions(&self.pool, user_id).await?)
    }

    async fn list_orders(&self, user_id: UserId) -> Result<Vec<MarketOrder>, PortError> {
        Ok(market::list_user_orders(&self.pool, user_id).await?)
    }

    async fn list_open_orders(&self, property_id: PropertyId) -> Result<Vec<MarketOrder>, PortError> {
        Ok(market::list_open_orders(&self.pool, property_id, None, Lock::None).await?)
    }

    async fn list_trades(&self, property_id: PropertyId) -> Result<Vec<Trade>, PortError> {
        Ok(market::list_trades(&self.pool, property_id).await?)
    }

    async fn list_dividends(&self, property_id: PropertyId) -> Result<Vec<DividendDistribution>, PortError> {
        Ok(ledger::list_dividends(&self.pool, property_id).await?)
    }
}

/// One database transaction
///
/// Rolled back by `sqlx` when dropped without [`LedgerUnitOfWork::commit`].
pub struct PostgresUnitOfWork {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerUnitOfWork for PostgresUnitOfWork {
    async fn lock_property(&mut self, id: PropertyId) -> Result<Option<Property>, PortError> {
        Ok(property::find_property(&mut *self.tx, id, Lock::ForUpdate).await?)
    }

    async fn insert_property(&mut self, property: &Property) -> Result<(), PortError> {
        Ok(property::insert_property(&mut *self.tx, property).await?)
    }

    async fn update_property(&mut self, property: &Property) -> Result<(), PortError> {
        Ok(property::update_property(&mut *self.tx, property).await?)
    }

    async fn reserve_shares(&mut self, id: PropertyId, shares: i64) -> Result<Option<Property>, PortError> {
        let reserved = property::reserve_shares(&mut *self.tx, id, shares).await?;
        if reserved.is_none() {
            debug!(property_id = %id, shares, "Reserve condition not met");
        }
        Ok(reserved)
    }

    async fn release_shares(&mut self, id: PropertyId, shares: i64) -> Result<Option<Property>, PortError> {
        Ok(property::release_shares(&mut *self.tx, id, shares).await?)
    }

    async fn insert_spv(&mut self, spv: &Spv) -> Result<(), PortError> {
        Ok(property::insert_spv(&mut *self.tx, spv).await?)
    }

    async fn insert_property_document(&mut self, document: &PropertyDocument) -> Result<(), PortError> {
        Ok(property::insert_document(&mut *self.tx, document).await?)
    }

    async fn upsert_due_diligence(&mut self, report: &DueDiligence) -> Result<(), PortError> {
        Ok(property::upsert_due_diligence(&mut *self.tx, report).await?)
    }

    async fn lock_profile(&mut self, user_id: UserId) -> Result<Option<InvestorProfile>, PortError> {
        Ok(investor::find_profile(&mut *self.tx, user_id, Lock::ForUpdate).await?)
    }

    async fn save_profile(&mut self, profile: &InvestorProfile) -> Result<(), PortError> {
        Ok(investor::upsert_profile(&mut *self.tx, profile).await?)
    }

    async fn lock_kyc_document(&mut self, id: KycDocumentId) -> Result<Option<KycDocument>, PortError> {
        Ok(investor::find_kyc_document(&mut *self.tx, id, Lock::ForUpdate).await?)
    }

    async fn user_kyc_documents(&mut self, user_id: UserId) -> Result<Vec<KycDocument>, PortError> {
        Ok(investor::list_kyc_documents(&mut *self.tx, user_id).await?)
    }

    async fn save_kyc_document(&mut self, document: &KycDocument) -> Result<(), PortError> {
        Ok(investor::upsert_kyc_document(&mut *self.tx, document).await?)
    }

    async fn lock_investment(
        &mut self,
        user_id: UserId,
        property_id: PropertyId,
    ) -> Result<Option<Investment>, PortError> {
        Ok(ledger::find_position(&mut *self.tx, user_id, property_id, Lock::ForUpdate).await?)
    }

    async fn lock_investment_by_id(&mut self, id: InvestmentId) -> Result<Option<Investment>, PortError> {
        Ok(ledger::find_investment(&mut *self.tx, id, Lock::ForUpdate).await?)
    }

    async fn lock_property_investments(&mut self, property_id: PropertyId) -> Result<Vec<Investment>, PortError> {
        Ok(ledger::list_property_investments(&mut *self.tx, property_id, Lock::ForUpdate).await?)
    }

    async fn save_investment(&mut self, investment: &Investment) -> Result<(), PortError> {
        Ok(ledger::upsert_investment(&mut *self.tx, investment).await?)
    }

    async fn find_transaction_by_key(
        &mut self,
        user_id: UserId,
        key: &str,
    ) -> Result<Option<Transaction>, PortError> {
        Ok(ledger::find_transaction_by_key(&mut *self.tx, user_id, key).await?)
    }

    async fn lock_transaction(&mut self, id: TransactionId) -> Result<Option<Transaction>, PortError> {
        Ok(ledger::find_transaction(&mut *self.tx, id, Lock::ForUpdate).await?)
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), PortError> {
        Ok(ledger::insert_transaction(&mut *self.tx, transaction).await?)
    }

    async fn update_transaction_status(&mut self, transaction: &Transaction) -> Result<(), PortError> {
        Ok(ledger::update_transaction_status(&mut *self.tx, transaction).await?)
    }

    async fn find_order_by_key(&mut self, user_id: UserId, key: &str) -> Result<Option<MarketOrder>, PortError> {
        Ok(market::find_order_by_key(&mut *self.tx, user_id, key).await?)
    }

    async fn lock_order(&mut self, id: MarketOrderId) -> Result<Option<MarketOrder>, PortError> {
        Ok(market::find_order(&mut *self.tx, id, Lock::ForUpdate).await?)
    }

    async fn lock_open_orders(
        &mut self,
        property_id: PropertyId,
        side: OrderSide,
    ) -> Result<Vec<MarketOrder>, PortError> {
        Ok(market::list_open_orders(&mut *self.tx, property_id, Some(side), Lock::ForUpdate).await?)
    }

    async fn save_order(&mut self, order: &MarketOrder) -> Result<(), PortError> {
        Ok(market::upsert_order(&mut *self.tx, order).await?)
    }

    async fn insert_trade(&mut self, trade: &Trade) -> Result<(), PortError> {
        Ok(market::insert_trade(&mut *self.tx, trade).await?)
    }

    async fn find_dividend_by_key(
        &mut self,
        property_id: PropertyId,
        key: &str,
    ) -> Result<Option<DividendDistribution>, PortError> {
        Ok(ledger::find_dividend_by_key(&mut *self.tx, property_id, key).await?)
    }

    async fn insert_dividend(&mut self, distribution: &DividendDistribution) -> Result<(), PortError> {
        Ok(ledger::insert_dividend(&mut *self.tx, distribution).await?)
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        self.tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }
}
