//! Ledger Store port
//!
//! The ledger keeps all state behind two traits:
//!
//! - [`LedgerPort`]: read queries plus [`LedgerPort::begin`], which opens an
//!   atomic unit of work
//! - [`LedgerUnitOfWork`]: row-locking reads and writes that become visible
//!   only when [`LedgerUnitOfWork::commit`] succeeds; dropping the unit
//!   discards every write
//!
//! Business rules live in the services, which drive a unit of work; adapters
//! only provide storage and isolation:
//!
//! - **PostgreSQL** (`infra_db`): one database transaction per unit,
//!   `SELECT ... FOR UPDATE` row locks and conditional updates
//! - **In-memory** ([`memory::InMemoryLedgerPort`]): one exclusive lock per
//!   unit over a private copy of the state
//!
//! Either adapter reports a lost write race as [`PortError::Conflict`]; the
//! services retry such commands from scratch.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut uow = port.begin().await?;
//! if let Some(property) = uow.reserve_shares(property_id, 10).await? {
//!     uow.insert_transaction(&purchase).await?;
//!     uow.commit().await?;
//! }
//! ```

pub mod memory;

use async_trait::async_trait;

use core_kernel::{
    DomainPort, HealthCheckable, InvestmentId, KycDocumentId, MarketOrderId, PortError,
    PropertyId, SpvId, TransactionId, UserId,
};
use domain_investor::{InvestorProfile, KycDocument};
use domain_property::{DueDiligence, Property, PropertyDocument, PropertyStatus, Spv};

use crate::dividend::DividendDistribution;
use crate::investment::Investment;
use crate::market::{MarketOrder, OrderSide, Trade};
use crate::transaction::Transaction;

/// Storage for the investment ledger
#[async_trait]
pub trait LedgerPort: DomainPort + HealthCheckable {
    /// Opens an atomic unit of work
    async fn begin(&self) -> Result<Box<dyn LedgerUnitOfWork>, PortError>;

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    async fn get_property(&self, id: PropertyId) -> Result<Option<Property>, PortError>;

    async fn list_properties(&self, status: Option<PropertyStatus>) -> Result<Vec<Property>, PortError>;

    async fn list_property_documents(&self, property_id: PropertyId) -> Result<Vec<PropertyDocument>, PortError>;

    async fn get_spv(&self, id: SpvId) -> Result<Option<Spv>, PortError>;

    async fn get_due_diligence(&self, property_id: PropertyId) -> Result<Option<DueDiligence>, PortError>;

    // ------------------------------------------------------------------
    // Investors
    // ------------------------------------------------------------------

    async fn get_profile(&self, user_id: UserId) -> Result<Option<InvestorProfile>, PortError>;

    async fn list_kyc_documents(&self, user_id: UserId) -> Result<Vec<KycDocument>, PortError>;

    // ------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------

    async fn get_investment(&self, id: InvestmentId) -> Result<Option<Investment>, PortError>;

    async fn list_investments(&self, user_id: UserId) -> Result<Vec<Investment>, PortError>;

    async fn list_property_investments(&self, property_id: PropertyId) -> Result<Vec<Investment>, PortError>;

    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, PortError>;

    /// Newest first
    async fn list_transactions(&self, user_id: UserId) -> Result<Vec<Transaction>, PortError>;

    /// Newest first
    async fn list_orders(&self, user_id: UserId) -> Result<Vec<MarketOrder>, PortError>;

    async fn list_open_orders(&self, property_id: PropertyId) -> Result<Vec<MarketOrder>, PortError>;

    /// Newest first
    async fn list_trades(&self, property_id: PropertyId) -> Result<Vec<Trade>, PortError>;

    async fn list_dividends(&self, property_id: PropertyId) -> Result<Vec<DividendDistribution>, PortError>;
}

/// An atomic unit of ledger writes
///
/// `lock_*` reads take the row for the rest of the unit. Nothing is visible
/// to other units until `commit`.
#[async_trait]
pub trait LedgerUnitOfWork: Send {
    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    async fn lock_property(&mut self, id: PropertyId) -> Result<Option<Property>, PortError>;

    async fn insert_property(&mut self, property: &Property) -> Result<(), PortError>;

    /// Persists descriptive fields and status; inventory changes go through
    /// `reserve_shares` / `release_shares`
    async fn update_property(&mut self, property: &Property) -> Result<(), PortError>;

    /// Conditionally takes shares from the primary inventory
    ///
    /// Succeeds only while the property is active with enough shares left;
    /// selling the last share moves it to funded. Returns `None` when the
    /// condition does not hold.
    async fn reserve_shares(&mut self, id: PropertyId, shares: i64) -> Result<Option<Property>, PortError>;

    /// Conditionally returns shares to the primary inventory
    ///
    /// Succeeds only while the property is active or funded and the
    /// inventory stays within the total supply; a funded property becomes
    /// active again. Returns `None` when the condition does not hold.
    async fn release_shares(&mut self, id: PropertyId, shares: i64) -> Result<Option<Property>, PortError>;

    async fn insert_spv(&mut self, spv: &Spv) -> Result<(), PortError>;

    async fn insert_property_document(&mut self, document: &PropertyDocument) -> Result<(), PortError>;

    async fn upsert_due_diligence(&mut self, report: &DueDiligence) -> Result<(), PortError>;

    // ------------------------------------------------------------------
    // Investors
    // ------------------------------------------------------------------

    async fn lock_profile(&mut self, user_id: UserId) -> Result<Option<InvestorProfile>, PortError>;

    /// Inserts or updates a profile
    async fn save_profile(&mut self, profile: &InvestorProfile) -> Result<(), PortError>;

    async fn lock_kyc_document(&mut self, id: KycDocumentId) -> Result<Option<KycDocument>, PortError>;

    async fn user_kyc_documents(&mut self, user_id: UserId) -> Result<Vec<KycDocument>, PortError>;

    /// Inserts or updates a KYC document
    async fn save_kyc_document(&mut self, document: &KycDocument) -> Result<(), PortError>;

    // ------------------------------------------------------------------
    // Positions
    // ------------------------------------------------------------------

    async fn lock_investment(
        &mut self,
        user_id: UserId,
        property_id: PropertyId,
    ) -> Result<Option<Investment>, PortError>;

    async fn lock_investment_by_id(&mut self, id: InvestmentId) -> Result<Option<Investment>, PortError>;

    async fn lock_property_investments(&mut self, property_id: PropertyId) -> Result<Vec<Investment>, PortError>;

    /// Inserts or updates a position; (user, property) is unique
    async fn save_investment(&mut self, investment: &Investment) -> Result<(), PortError>;

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    async fn find_transaction_by_key(
        &mut self,
        user_id: UserId,
        key: &str,
    ) -> Result<Option<Transaction>, PortError>;

    async fn lock_transaction(&mut self, id: TransactionId) -> Result<Option<Transaction>, PortError>;

    /// Appends a transaction; (user, idempotency key) is unique
    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), PortError>;

    /// Persists a status change of a pending transaction
    async fn update_transaction_status(&mut self, transaction: &Transaction) -> Result<(), PortError>;

    // ------------------------------------------------------------------
    // Market
    // ------------------------------------------------------------------

    async fn find_order_by_key(&mut self, user_id: UserId, key: &str) -> Result<Option<MarketOrder>, PortError>;

    async fn lock_order(&mut self, id: MarketOrderId) -> Result<Option<MarketOrder>, PortError>;

    /// Open and partially filled orders on one side of a property's book
    async fn lock_open_orders(
        &mut self,
        property_id: PropertyId,
        side: OrderSide,
    ) -> Result<Vec<MarketOrder>, PortError>;

    /// Inserts or updates an order
    async fn save_order(&mut self, order: &MarketOrder) -> Result<(), PortError>;

    async fn insert_trade(&mut self, trade: &Trade) -> Result<(), PortError>;

    // ------------------------------------------------------------------
    // Dividends
    // ------------------------------------------------------------------

    async fn find_dividend_by_key(
        &mut self,
        property_id: PropertyId,
        key: &str,
    ) -> Result<Option<DividendDistribution>, PortError>;

    async fn insert_dividend(&mut self, distribution: &DividendDistribution) -> Result<(), PortError>;

    /// Publishes every write of this unit atomically
    async fn commit(self: Box<Self>) -> Result<(), PortError>;
}
