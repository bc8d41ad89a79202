//! Investment Ledger Domain
//!
//! This crate records who owns which shares of which property and how cash
//! moved to get there. It sits on top of the property and investor domains
//! and is the only place where their counters change together.
//!
//! # Architecture
//!
//! - **Entities**: Investment (one per user and property), Transaction
//!   (append-only ledger entry), MarketOrder, Trade, DividendDistribution
//! - **Domain Services**: investment orchestrator, wallet, KYC review,
//!   property administration, secondary market, dividends
//! - **Port**: [`LedgerPort`] and its [`LedgerUnitOfWork`]; every command is
//!   one atomic unit
//!
//! # Invariants
//!
//! - `0 <= available_shares <= total_shares` for every property
//! - `sum(shares_owned) + available_shares == total_shares`; secondary trades
//!   move shares between investors only
//! - One idempotency key produces at most one effect per user
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_ledger::{InMemoryLedgerPort, LedgerServices, LedgerSettings, InvestRequest};
//!
//! let services = LedgerServices::new(Arc::new(InMemoryLedgerPort::new()), LedgerSettings::default());
//! let quote = services.investments.quote(property_id, 10).await?;
//! let receipt = services
//!     .investments
//!     .invest(InvestRequest {
//!         user_id,
//!         property_id,
//!         shares: 10,
//!         total_amount: quote.total,
//!         payment_method: PaymentMethod::Wallet,
//!         idempotency_key: IdempotencyKey::new("checkout-42")?,
//!     })
//!     .await?;
//! ```

pub mod error;
pub mod transaction;
pub mod investment;
pub mod fees;
pub mod idempotency;
pub mod dividend;
pub mod market;
pub mod ports;
pub mod retry;
pub mod services;

pub use error::{ErrorKind, LedgerError};
pub use transaction::{PaymentMethod, Transaction, TransactionStatus, TransactionType};
pub use investment::{Investment, InvestmentStatus};
pub use fees::{FeeSchedule, Quote, DEFAULT_PLATFORM_FEE_PERCENT};
pub use idempotency::IdempotencyKey;
pub use dividend::{allocate_dividend, DividendAllocation, DividendDistribution};
pub use market::{BookSnapshot, LevelSummary, MarketOrder, OrderBook, OrderSide, OrderStatus, Trade};
pub use ports::memory::InMemoryLedgerPort;
pub use ports::{LedgerPort, LedgerUnitOfWork};
pub use retry::RetryPolicy;
pub use services::{
    Actor, DividendReceipt, DividendService, InvestRequest, InvestmentReceipt, InvestmentService,
    KycProfileView, KycService, LedgerServices, LedgerSettings, MarketService, NewProperty, NewSpv,
    OrderReceipt, PaymentOutcome, PlaceOrder, Portfolio, PortfolioEntry, PropertyService,
    WalletReceipt, WalletService,
};
