//! Platform fees and price quotes
//!
//! Prices are always recomputed here; a client-supplied total is only ever
//! compared against a [`Quote`], never trusted.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{Money, PropertyId, Rate};
use domain_property::Property;
use crate::error::LedgerError;

/// Default platform fee on primary purchases, in percent
pub const DEFAULT_PLATFORM_FEE_PERCENT: Decimal = dec!(2);

/// Fee configuration for primary purchases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub platform_fee: Rate,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::from_percentage(DEFAULT_PLATFORM_FEE_PERCENT)
    }
}

impl FeeSchedule {
    pub fn from_percentage(percent: Decimal) -> Self {
        Self {
            platform_fee: Rate::from_percentage(percent),
        }
    }

    /// Prices `shares` shares of a property
    ///
    /// `gross = shares * share_price`, `fee = round(gross * rate)`,
    /// `total = gross + fee`, all rounded to the property currency.
    pub fn quote(&self, property: &Property, shares: i64) -> Result<Quote, LedgerError> {
        if shares <= 0 {
            return Err(LedgerError::validation(format!(
                "Shares must be positive, got {}",
                shares
            )));
        }
        let gross = property.share_price.times(shares)?.round_to_currency();
        let fee = self.platform_fee.apply(&gross);
        let total = gross.checked_add(&fee)?;

        Ok(Quote {
            property_id: property.id,
            shares,
            share_price: property.share_price,
            gross,
            fee,
            fee_percent: self.platform_fee.as_percentage(),
            total,
        })
    }
}

/// Server-side price of a primary purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub property_id: PropertyId,
    pub shares: i64,
    pub share_price: Money,
    pub gross: Money,
    pub fee: Money,
    pub fee_percent: Decimal,
    pub total: Money,
}

impl Quote {
    /// Fails with `AmountMismatch` unless `provided` equals the quoted total
    pub fn verify_total(&self, provided: &Money) -> Result<(), LedgerError> {
        let provided_rounded = provided.round_to_currency();
        if provided_rounded.currency() != self.total.currency()
            || provided_rounded.amount() != self.total.amount()
            || provided_rounded.amount() != provided.amount()
        {
            return Err(LedgerError::AmountMismatch {
                expected: self.total,
                provided: *provided,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use domain_property::PropertyStatus;

    fn property(price: Decimal) -> Property {
        let mut p = Property::new("Marina", "Dubai", 100, Money::new(price, Currency::USD)).unwrap();
        p.transition_to(PropertyStatus::Active).unwrap();
        p
    }

    #[test]
    fn test_default_two_percent_fee() {
        let quote = FeeSchedule::default().quote(&property(dec!(50000)), 10).unwrap();
        assert_eq!(quote.gross.amount(), dec!(500000));
        assert_eq!(quote.fee.amount(), dec!(10000));
        assert_eq!(quote.total.amount(), dec!(510000));
    }

    #[test]
    fn test_fee_rounds_half_away_from_zero() {
        let quote = FeeSchedule::default().quote(&property(dec!(0.25)), 1).unwrap();
        assert_eq!(quote.fee.amount(), dec!(0.01));
        assert_eq!(quote.total.amount(), dec!(0.26));
    }

    #[test]
    fn test_total_must_match_exactly() {
        let quote = FeeSchedule::default().quote(&property(dec!(50000)), 10).unwrap();
        assert!(quote.verify_total(&Money::new(dec!(510000), Currency::USD)).is_ok());
        assert!(matches!(
            quote.verify_total(&Money::new(dec!(500000), Currency::USD)),
            Err(LedgerError::AmountMismatch { .. })
        ));
        assert!(quote.verify_total(&Money::new(dec!(510000.001), Currency::USD)).is_err());
        assert!(quote.verify_total(&Money::new(dec!(510000), Currency::EUR)).is_err());
    }

    #[test]
    fn test_rejects_non_positive_shares() {
        assert!(FeeSchedule::default().quote(&property(dec!(10)), 0).is_err());
    }
}
