//! Pre-built Test Fixtures
//!
//! Ready-to-use values for the ledger's common entities. Fixtures are
//! deterministic so assertions can name exact amounts.

use chrono::NaiveDate;
use core_kernel::{Currency, Money, UserId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Standard share price used across the ledger scenarios
    pub fn usd_share_price() -> Money {
        Money::new(dec!(50000), Currency::USD)
    }

    /// Wallet balance large enough for a 10-share purchase with fees
    pub fn usd_wallet() -> Money {
        Money::new(dec!(1000000), Currency::USD)
    }

    pub fn usd_100() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    pub fn investor_id() -> UserId {
        UserId::from_uuid(Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440002))
    }

    pub fn second_investor_id() -> UserId {
        UserId::from_uuid(Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440003))
    }

    pub fn admin_id() -> UserId {
        UserId::from_uuid(Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440004))
    }
}

/// Fixture for decimal test data
pub struct DecimalFixtures;

impl DecimalFixtures {
    /// Platform fee percentage (2%)
    pub fn platform_fee_percent() -> Decimal {
        dec!(2)
    }

    /// Fee on ten shares at the standard price
    pub fn ten_share_fee() -> Decimal {
        dec!(10000)
    }

    /// Total charged for ten shares at the standard price
    pub fn ten_share_total() -> Decimal {
        dec!(510000)
    }
}

/// Fixture for string test data
pub struct StringFixtures;

impl StringFixtures {
    pub fn property_name() -> &'static str {
        "Harbour View Residences"
    }

    pub fn location() -> &'static str {
        "Dubai Marina, Dubai"
    }

    pub fn passport_reference() -> &'static str {
        "P1234567"
    }

    pub fn document_url() -> &'static str {
        "https://documents.example.com/title-deed.pdf"
    }
}

/// Dates for due diligence reports
pub struct DateFixtures;

impl DateFixtures {
    pub fn valuation_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 15).unwrap_or_default()
    }
}
