//! Custom Test Assertions
//!
//! Assertion helpers for ledger types with messages that name the broken
//! invariant.

use core_kernel::Money;
use domain_investor::InvestorProfile;
use domain_ledger::{Investment, Transaction, TransactionType};
use domain_property::Property;
use rust_decimal::Decimal;

/// Asserts that a Money value has the expected amount and currency
pub fn assert_money_eq(actual: &Money, expected: &Money) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );
    assert_eq!(
        actual.amount(),
        expected.amount(),
        "Amount mismatch: actual={}, expected={}",
        actual.amount(),
        expected.amount()
    );
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(
        money.is_zero(),
        "Expected zero money, got {} {}",
        money.currency().symbol(),
        money.amount()
    );
}

/// Asserts that money values sum to a total
///
/// # Panics
///
/// Panics if the sum doesn't equal the total
pub fn assert_money_sum_equals(parts: &[Money], total: &Money) {
    let sum = parts.iter().fold(Money::zero(total.currency()), |acc, m| {
        acc.checked_add(m).expect("Currency mismatch in sum")
    });

    assert_eq!(
        sum.amount(),
        total.amount(),
        "Sum of parts ({}) doesn't equal total ({})",
        sum.amount(),
        total.amount()
    );
}

/// Asserts that a property's available shares stay within its supply
pub fn assert_inventory_consistent(property: &Property) {
    assert!(
        property.inventory_is_consistent(),
        "Inventory out of bounds for {}: available={}, total={}",
        property.id,
        property.available_shares,
        property.total_shares
    );
}

/// Asserts that every share of a property is either unsold or held
///
/// `available + Σ shares_owned == total`
pub fn assert_shares_conserved(property: &Property, positions: &[Investment]) {
    let held: i64 = positions
        .iter()
        .filter(|p| p.property_id == property.id)
        .map(|p| p.shares_owned)
        .sum();
    assert_eq!(
        property.available_shares + held,
        property.total_shares,
        "Shares not conserved for {}: available={}, held={}, total={}",
        property.id,
        property.available_shares,
        held,
        property.total_shares
    );
}

/// Asserts a profile's spendable and escrowed balances
pub fn assert_wallet(profile: &InvestorProfile, available: Decimal, reserved: Decimal) {
    assert_eq!(
        profile.wallet_balance.amount(),
        available,
        "Wallet balance mismatch for {}",
        profile.user_id
    );
    assert_eq!(
        profile.reserved_balance.amount(),
        reserved,
        "Reserved balance mismatch for {}",
        profile.user_id
    );
}

/// Counts transactions of one type
pub fn count_of_type(transactions: &[Transaction], transaction_type: TransactionType) -> usize {
    transactions
        .iter()
        .filter(|t| t.transaction_type == transaction_type)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{InvestmentBuilder, InvestorBuilder, PropertyBuilder};
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_assert_money_sum_equals() {
        let parts = vec![
            Money::new(dec!(33.33), Currency::USD),
            Money::new(dec!(33.33), Currency::USD),
            Money::new(dec!(33.34), Currency::USD),
        ];
        assert_money_sum_equals(&parts, &Money::new(dec!(100.00), Currency::USD));
    }

    #[test]
    #[should_panic(expected = "Currency mismatch")]
    fn test_assert_money_eq_currency_mismatch() {
        assert_money_eq(
            &Money::new(dec!(1), Currency::USD),
            &Money::new(dec!(1), Currency::EUR),
        );
    }

    #[test]
    fn test_assert_shares_conserved() {
        let property = PropertyBuilder::new().with_sold_shares(30).build();
        let positions = vec![
            InvestmentBuilder::new(core_kernel::UserId::new(), property.id).with_shares(10).build(),
            InvestmentBuilder::new(core_kernel::UserId::new(), property.id).with_shares(20).build(),
        ];
        assert_inventory_consistent(&property);
        assert_shares_conserved(&property, &positions);
    }

    #[test]
    #[should_panic(expected = "Shares not conserved")]
    fn test_assert_shares_conserved_detects_leak() {
        let property = PropertyBuilder::new().with_sold_shares(30).build();
        let positions = vec![InvestmentBuilder::new(core_kernel::UserId::new(), property.id)
            .with_shares(10)
            .build()];
        assert_shares_conserved(&property, &positions);
    }

    #[test]
    fn test_assert_wallet() {
        let profile = InvestorBuilder::new().build();
        assert_wallet(&profile, dec!(1000000), Decimal::ZERO);
    }
}
