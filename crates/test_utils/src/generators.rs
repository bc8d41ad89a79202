//! Property-Based Test Generators
//!
//! Proptest strategies producing values that respect domain invariants.

use core_kernel::{Currency, Money};
use proptest::prelude::*;

/// Share prices between 1.00 and 100,000.00 USD
pub fn share_price_strategy() -> impl Strategy<Value = Money> {
    (100i64..10_000_000i64).prop_map(|cents| Money::from_minor(cents, Currency::USD))
}

/// Share counts for a single purchase or order
pub fn share_count_strategy() -> impl Strategy<Value = i64> {
    1i64..=500i64
}

/// Positions for a dividend run: between one and `max` holders with
/// positive share counts
pub fn holdings_strategy(max: usize) -> impl Strategy<Value = Vec<i64>> {
    proptest::collection::vec(1i64..10_000i64, 1..=max)
}

/// Idempotency keys within the accepted length
pub fn idempotency_key_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{1,64}"
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_ledger::IdempotencyKey;

    proptest! {
        #[test]
        fn test_share_prices_are_positive(price in share_price_strategy()) {
            prop_assert!(price.is_positive());
            prop_assert_eq!(price.round_to_currency(), price);
        }

        #[test]
        fn test_generated_keys_are_accepted(key in idempotency_key_strategy()) {
            prop_assert!(IdempotencyKey::new(key).is_ok());
        }

        #[test]
        fn test_share_counts_are_positive(shares in share_count_strategy()) {
            prop_assert!((1..=500).contains(&shares));
        }

        #[test]
        fn test_holdings_are_positive(holdings in holdings_strategy(8)) {
            prop_assert!(!holdings.is_empty());
            prop_assert!(holdings.iter().all(|shares| *shares > 0));
        }
    }
}
