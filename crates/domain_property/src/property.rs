//! Property aggregate and its share inventory
//!
//! A property is offered as a fixed number of shares at a fixed share price.
//! `available_shares` is the only counter the rest of the platform contends
//! on; every mutation goes through [`Property::reserve`] or
//! [`Property::release`] so that `0 <= available_shares <= total_shares` holds
//! after every call, successful or not.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{CoreError, Currency, Money, PropertyId, SpvId};
use crate::error::PropertyError;

/// Funding lifecycle of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    /// Being prepared by an admin, not visible to investors
    Draft,
    /// Open for primary investment
    Active,
    /// Every share has been sold
    Funded,
    /// No longer accepting investment or trading
    Closed,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::Draft => "draft",
            PropertyStatus::Active => "active",
            PropertyStatus::Funded => "funded",
            PropertyStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PropertyStatus::Draft),
            "active" => Ok(PropertyStatus::Active),
            "funded" => Ok(PropertyStatus::Funded),
            "closed" => Ok(PropertyStatus::Closed),
            other => Err(CoreError::unknown_variant("property_status", other)),
        }
    }
}

/// A property offered to fractional investors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// Unique identifier
    pub id: PropertyId,
    /// Marketing name
    pub name: String,
    /// City / address line shown to investors
    pub location: String,
    /// Optional long description
    pub description: Option<String>,
    /// SPV holding title
    pub spv_id: Option<SpvId>,
    /// Fixed share supply
    pub total_shares: i64,
    /// Shares not yet sold on the primary market
    pub available_shares: i64,
    /// Primary-market price of one share
    pub share_price: Money,
    /// Lifecycle status
    pub status: PropertyStatus,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Property {
    /// Creates a draft property with its full supply available
    ///
    /// # Arguments
    ///
    /// * `name` - Display name
    /// * `location` - Location shown to investors
    /// * `total_shares` - Share supply, fixed for the life of the property
    /// * `share_price` - Price of one share
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` for an empty name, a non-positive share count or
    /// a non-positive share price.
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        total_shares: i64,
        share_price: Money,
    ) -> Result<Self, PropertyError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PropertyError::invalid("Property name must not be empty"));
        }
        if total_shares <= 0 {
            return Err(PropertyError::invalid(format!(
                "Total shares must be positive, got {}",
                total_shares
            )));
        }
        if !share_price.is_positive() {
            return Err(PropertyError::invalid(format!(
                "Share price must be positive, got {}",
                share_price
            )));
        }

        let now = Utc::now();
        Ok(Self {
            id: PropertyId::new_v7(),
            name,
            location: location.into(),
            description: None,
            spv_id: None,
            total_shares,
            available_shares: total_shares,
            share_price,
            status: PropertyStatus::Draft,
            created_at: now,
            updated_at: now,
        })
    }

    /// Sets the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Links the SPV holding title
    pub fn with_spv(mut self, spv_id: SpvId) -> Self {
        self.spv_id = Some(spv_id);
        self
    }

    /// Currency the property is priced in
    pub fn currency(&self) -> Currency {
        self.share_price.currency()
    }

    /// Shares already sold on the primary market
    pub fn sold_shares(&self) -> i64 {
        self.total_shares - self.available_shares
    }

    /// Percentage of the supply that has been sold, two decimal places
    pub fn funding_progress(&self) -> Decimal {
        (Decimal::from(self.sold_shares()) * dec!(100) / Decimal::from(self.total_shares)).round_dp(2)
    }

    /// True while the property accepts primary investment
    pub fn is_open_for_investment(&self) -> bool {
        self.status == PropertyStatus::Active
    }

    /// True while existing holders may trade on the secondary market
    pub fn is_tradable(&self) -> bool {
        matches!(self.status, PropertyStatus::Active | PropertyStatus::Funded)
    }

    /// Checks the inventory invariant
    pub fn inventory_is_consistent(&self) -> bool {
        self.total_shares > 0 && self.available_shares >= 0 && self.available_shares <= self.total_shares
    }

    /// Moves the property to a new status
    ///
    /// `funded -> active` is not reachable this way; it only happens when
    /// [`Property::release`] puts shares back on sale.
    pub fn transition_to(&mut self, target: PropertyStatus) -> Result<(), PropertyError> {
        if !self.can_transition_to(target) {
            return Err(PropertyError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        self.status = target;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn can_transition_to(&self, target: PropertyStatus) -> bool {
        use PropertyStatus::*;
        matches!(
            (self.status, target),
            (Draft, Active) | (Draft, Closed) | (Active, Funded) | (Active, Closed) | (Funded, Closed)
        )
    }

    /// Takes shares out of the primary inventory
    ///
    /// A reservation that sells the last share moves the property to
    /// `funded`. On error nothing is changed.
    pub fn reserve(&mut self, shares: i64) -> Result<(), PropertyError> {
        if shares <= 0 {
            return Err(PropertyError::invalid(format!(
                "Shares must be positive, got {}",
                shares
            )));
        }
        if !self.is_open_for_investment() {
            return Err(PropertyError::NotActive(self.status.to_string()));
        }
        if self.available_shares < shares {
            return Err(PropertyError::InsufficientShares {
                requested: shares,
                available: self.available_shares,
            });
        }

        self.available_shares -= shares;
        if self.available_shares == 0 {
            self.status = PropertyStatus::Funded;
            tracing::info!(property_id = %self.id, "Property fully funded");
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Returns shares to the primary inventory, e.g. after a refund
    ///
    /// A funded property with shares back on sale becomes `active` again.
    pub fn release(&mut self, shares: i64) -> Result<(), PropertyError> {
        if shares <= 0 {
            return Err(PropertyError::invalid(format!(
                "Shares must be positive, got {}",
                shares
            )));
        }
        if !self.is_tradable() {
            return Err(PropertyError::NotActive(self.status.to_string()));
        }
        if self.available_shares + shares > self.total_shares {
            return Err(PropertyError::InventoryOverflow {
                releasing: shares,
                total: self.total_shares,
            });
        }

        self.available_shares += shares;
        if self.status == PropertyStatus::Funded {
            self.status = PropertyStatus::Active;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Value of a number of shares at the current share price
    pub fn value_of(&self, shares: i64) -> Money {
        self.share_price
            .times(shares)
            .unwrap_or_else(|_| Money::zero(self.currency()))
            .round_to_currency()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_property(total: i64) -> Property {
        let mut property = Property::new(
            "Marina Heights 12B",
            "Dubai Marina",
            total,
            Money::new(dec!(50000), Currency::USD),
        )
        .unwrap();
        property.transition_to(PropertyStatus::Active).unwrap();
        property
    }

    #[test]
    fn test_new_property_is_draft_with_full_supply() {
        let property = Property::new("Loft", "Berlin", 100, Money::new(dec!(10), Currency::EUR)).unwrap();
        assert_eq!(property.status, PropertyStatus::Draft);
        assert_eq!(property.available_shares, 100);
        assert_eq!(property.sold_shares(), 0);
    }

    #[test]
    fn test_rejects_non_positive_supply_and_price() {
        assert!(Property::new("Loft", "Berlin", 0, Money::new(dec!(10), Currency::EUR)).is_err());
        assert!(Property::new("Loft", "Berlin", 10, Money::zero(Currency::EUR)).is_err());
        assert!(Property::new(" ", "Berlin", 10, Money::new(dec!(1), Currency::EUR)).is_err());
    }

    #[test]
    fn test_reserve_last_share_marks_funded() {
        let mut property = active_property(10);
        property.reserve(10).unwrap();
        assert_eq!(property.available_shares, 0);
        assert_eq!(property.status, PropertyStatus::Funded);
        assert_eq!(property.funding_progress(), dec!(100));
    }

    #[test]
    fn test_reserve_on_draft_fails() {
        let mut property = Property::new("Loft", "Berlin", 10, Money::new(dec!(1), Currency::EUR)).unwrap();
        assert_eq!(property.reserve(1), Err(PropertyError::NotActive("draft".to_string())));
    }

    #[test]
    fn test_release_reopens_funded_property() {
        let mut property = active_property(10);
        property.reserve(10).unwrap();
        property.release(3).unwrap();
        assert_eq!(property.status, PropertyStatus::Active);
        assert_eq!(property.available_shares, 3);
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [PropertyStatus::Draft, PropertyStatus::Active, PropertyStatus::Funded, PropertyStatus::Closed] {
            assert_eq!(status.as_str().parse::<PropertyStatus>().unwrap(), status);
        }
        assert!("sold_out".parse::<PropertyStatus>().is_err());
    }
}
