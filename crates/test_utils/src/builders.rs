//! Test Data Builders
//!
//! Builders for domain entities with sensible defaults. Tests set only the
//! fields they care about; names and locations are filled with fake data.

use fake::faker::address::en::CityName;
use fake::faker::company::en::CompanyName;
use fake::Fake;

use core_kernel::{Currency, Money, PropertyId, UserId};
use domain_investor::{InvestorProfile, KycStatus};
use domain_ledger::{Investment, MarketOrder, OrderSide};
use domain_property::{Property, PropertyStatus};
use rust_decimal::Decimal;

use crate::fixtures::MoneyFixtures;

/// Builder for properties in any lifecycle state
pub struct PropertyBuilder {
    name: String,
    location: String,
    total_shares: i64,
    sold_shares: i64,
    share_price: Money,
    status: PropertyStatus,
}

impl Default for PropertyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyBuilder {
    /// An active 100-share property at the standard share price
    pub fn new() -> Self {
        Self {
            name: format!("{} Residences", CompanyName().fake::<String>()),
            location: CityName().fake(),
            total_shares: 100,
            sold_shares: 0,
            share_price: MoneyFixtures::usd_share_price(),
            status: PropertyStatus::Active,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_total_shares(mut self, shares: i64) -> Self {
        self.total_shares = shares;
        self
    }

    /// Marks shares as already sold on the primary market
    pub fn with_sold_shares(mut self, shares: i64) -> Self {
        self.sold_shares = shares;
        self
    }

    pub fn with_share_price(mut self, price: Money) -> Self {
        self.share_price = price;
        self
    }

    pub fn with_status(mut self, status: PropertyStatus) -> Self {
        self.status = status;
        self
    }

    /// Builds the property
    ///
    /// # Panics
    ///
    /// Panics when the configured values are not a valid property.
    pub fn build(self) -> Property {
        let mut property = Property::new(self.name, self.location, self.total_shares, self.share_price)
            .expect("builder produced an invalid property");
        property.available_shares = self.total_shares - self.sold_shares;
        property.status = self.status;
        property
    }
}

/// Builder for investor profiles
pub struct InvestorBuilder {
    user_id: UserId,
    kyc_status: KycStatus,
    wallet: Money,
}

impl Default for InvestorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InvestorBuilder {
    /// A verified investor with the standard wallet balance
    pub fn new() -> Self {
        Self {
            user_id: UserId::new(),
            kyc_status: KycStatus::Verified,
            wallet: MoneyFixtures::usd_wallet(),
        }
    }

    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_kyc_status(mut self, status: KycStatus) -> Self {
        self.kyc_status = status;
        self
    }

    pub fn with_wallet(mut self, balance: Money) -> Self {
        self.wallet = balance;
        self
    }

    pub fn unverified(self) -> Self {
        self.with_kyc_status(KycStatus::NotStarted)
    }

    pub fn build(self) -> InvestorProfile {
        let mut profile = InvestorProfile::new(self.user_id, self.wallet.currency());
        profile.kyc_status = self.kyc_status;
        profile.wallet_balance = self.wallet;
        profile
    }
}

/// Builder for share positions
pub struct InvestmentBuilder {
    user_id: UserId,
    property_id: PropertyId,
    shares: i64,
    price_per_share: Money,
}

impl InvestmentBuilder {
    pub fn new(user_id: UserId, property_id: PropertyId) -> Self {
        Self {
            user_id,
            property_id,
            shares: 10,
            price_per_share: MoneyFixtures::usd_share_price(),
        }
    }

    pub fn with_shares(mut self, shares: i64) -> Self {
        self.shares = shares;
        self
    }

    pub fn with_price_per_share(mut self, price: Money) -> Self {
        self.price_per_share = price;
        self
    }

    /// # Panics
    ///
    /// Panics on a non-positive share count.
    pub fn build(self) -> Investment {
        let currency = self.price_per_share.currency();
        let mut investment = Investment::open(self.user_id, self.property_id, currency);
        let cost = self
            .price_per_share
            .times(self.shares)
            .expect("position cost overflow");
        investment
            .accumulate(self.shares, &cost)
            .expect("builder produced an invalid position");
        investment
    }
}

/// Builder for secondary market orders
pub struct OrderBuilder {
    user_id: UserId,
    property_id: PropertyId,
    side: OrderSide,
    shares: i64,
    price: Decimal,
    currency: Currency,
    idempotency_key: String,
}

impl OrderBuilder {
    pub fn buy(user_id: UserId, property_id: PropertyId) -> Self {
        Self::new(user_id, property_id, OrderSide::Buy)
    }

    pub fn sell(user_id: UserId, property_id: PropertyId) -> Self {
        Self::new(user_id, property_id, OrderSide::Sell)
    }

    fn new(user_id: UserId, property_id: PropertyId, side: OrderSide) -> Self {
        Self {
            user_id,
            property_id,
            side,
            shares: 1,
            price: MoneyFixtures::usd_share_price().amount(),
            currency: Currency::USD,
            idempotency_key: format!("order-{}", uuid::Uuid::new_v4()),
        }
    }

    pub fn with_shares(mut self, shares: i64) -> Self {
        self.shares = shares;
        self
    }

    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = price;
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = key.into();
        self
    }

    /// # Panics
    ///
    /// Panics when the order would be rejected by validation.
    pub fn build(self) -> MarketOrder {
        MarketOrder::new(
            self.user_id,
            self.property_id,
            self.side,
            self.shares,
            Money::new(self.price, self.currency),
            self.idempotency_key,
        )
        .expect("builder produced an invalid order")
    }
}
