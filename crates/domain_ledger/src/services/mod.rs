//! Ledger services
//!
//! Each service drives [`LedgerUnitOfWork`]s against a shared
//! [`LedgerPort`]. Every mutating command runs inside one unit of work and
//! is wrapped in the configured [`RetryPolicy`], so a command either applies
//! all of its writes or none of them.

pub mod investment;
pub mod wallet;
pub mod kyc;
pub mod property;
pub mod market;
pub mod dividend;

use rust_decimal::Decimal;
use std::sync::Arc;

use core_kernel::{Currency, Money, PropertyId, UserId};
use domain_investor::InvestorProfile;
use domain_property::Property;

use crate::error::LedgerError;
use crate::fees::FeeSchedule;
use crate::ports::{LedgerPort, LedgerUnitOfWork};
use crate::retry::RetryPolicy;

pub use investment::{InvestRequest, InvestmentReceipt, InvestmentService, PaymentOutcome, PortfolioEntry, Portfolio};
pub use wallet::{WalletReceipt, WalletService};
pub use kyc::{KycProfileView, KycService};
pub use property::{NewProperty, NewSpv, PropertyService};
pub use market::{MarketService, OrderReceipt, PlaceOrder};
pub use dividend::{DividendReceipt, DividendService};

/// Platform-wide ledger configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    /// Currency every property and wallet is denominated in
    pub currency: Currency,
    pub fees: FeeSchedule,
    pub retry: RetryPolicy,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            currency: Currency::USD,
            fees: FeeSchedule::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl LedgerSettings {
    /// Wraps a client amount in the platform currency
    pub fn money(&self, amount: Decimal) -> Money {
        Money::new(amount, self.currency)
    }
}

/// Who is issuing a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl Actor {
    pub fn user(user_id: UserId) -> Self {
        Self { user_id, is_admin: false }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self { user_id, is_admin: true }
    }

    pub fn require_admin(&self) -> Result<(), LedgerError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(LedgerError::forbidden("Administrator role required"))
        }
    }
}

/// All ledger services over one port
#[derive(Clone)]
pub struct LedgerServices {
    pub investments: InvestmentService,
    pub wallet: WalletService,
    pub kyc: KycService,
    pub properties: PropertyService,
    pub market: MarketService,
    pub dividends: DividendService,
}

impl LedgerServices {
    pub fn new(port: Arc<dyn LedgerPort>, settings: LedgerSettings) -> Self {
        Self {
            investments: InvestmentService::new(port.clone(), settings),
            wallet: WalletService::new(port.clone(), settings),
            kyc: KycService::new(port.clone(), settings),
            properties: PropertyService::new(port.clone(), settings),
            market: MarketService::new(port.clone(), settings),
            dividends: DividendService::new(port, settings),
        }
    }
}

/// Loads the caller's profile, creating an empty one on first access
///
/// A created profile is only persisted if the unit of work commits.
pub(crate) async fn load_or_create_profile(
    uow: &mut dyn LedgerUnitOfWork,
    user_id: UserId,
    currency: Currency,
) -> Result<InvestorProfile, LedgerError> {
    match uow.lock_profile(user_id).await? {
        Some(profile) => Ok(profile),
        None => Ok(InvestorProfile::new(user_id, currency)),
    }
}

pub(crate) async fn require_property(
    uow: &mut dyn LedgerUnitOfWork,
    property_id: PropertyId,
) -> Result<Property, LedgerError> {
    uow.lock_property(property_id)
        .await?
        .ok_or_else(|| LedgerError::not_found("Property", property_id))
}

pub(crate) fn ensure_currency(expected: Currency, money: &Money) -> Result<(), LedgerError> {
    if money.currency() != expected {
        return Err(LedgerError::validation(format!(
            "Amount must be in {}, got {}",
            expected,
            money.currency()
        )));
    }
    Ok(())
}
