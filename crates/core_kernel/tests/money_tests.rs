//! Unit tests for the Money module
//!
//! Covers creation, arithmetic used by the ledger (share pricing, fees,
//! cost-basis averaging) and the pro-rata allocation used for dividends.

use core_kernel::{Money, Currency, MoneyError, Rate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_new_rounds_to_four_decimal_places() {
        let m = Money::new(dec!(100.123456789), Currency::USD);
        assert_eq!(m.amount(), dec!(100.1235));
    }

    #[test]
    fn test_from_minor_handles_jpy_no_decimals() {
        let m = Money::from_minor(10000, Currency::JPY);
        assert_eq!(m.amount(), dec!(10000));
    }

    #[test]
    fn test_zero_creates_zero_amount() {
        let m = Money::zero(Currency::INR);
        assert!(m.is_zero());
        assert!(!m.is_positive());
        assert!(!m.is_negative());
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_checked_add_same_currency() {
        let a = Money::new(dec!(90000), Currency::INR);
        let b = Money::new(dec!(510000), Currency::INR);
        assert_eq!(a.checked_add(&b).unwrap().amount(), dec!(600000));
    }

    #[test]
    fn test_checked_sub_can_go_negative() {
        let a = Money::new(dec!(10), Currency::USD);
        let b = Money::new(dec!(25), Currency::USD);
        assert!(a.checked_sub(&b).unwrap().is_negative());
    }

    #[test]
    fn test_sub_currency_mismatch() {
        let a = Money::new(dec!(10), Currency::USD);
        let b = Money::new(dec!(10), Currency::EUR);
        assert!(matches!(a.checked_sub(&b), Err(MoneyError::CurrencyMismatch(_, _))));
    }

    #[test]
    fn test_times_and_per_unit_are_inverse_for_exact_prices() {
        let price = Money::new(dec!(50000), Currency::USD);
        let total = price.times(15).unwrap();
        assert_eq!(total.per_unit(15).unwrap(), price);
    }

    #[test]
    fn test_weighted_average_keeps_precision() {
        let invested = Money::new(dec!(765000), Currency::USD);
        let avg = invested.per_unit(15).unwrap();
        assert_eq!(avg.amount(), dec!(51000));

        let odd = Money::new(dec!(100), Currency::USD).per_unit(3).unwrap();
        assert_eq!(odd.amount(), dec!(33.3333));
    }

    #[test]
    fn test_round_to_currency_half_away_from_zero() {
        let m = Money::new(dec!(10.005), Currency::USD);
        assert_eq!(m.round_to_currency().amount(), dec!(10.01));

        let yen = Money::new(dec!(10.5), Currency::JPY);
        assert_eq!(yen.round_to_currency().amount(), dec!(11));
    }
}

mod allocation {
    use super::*;

    #[test]
    fn test_allocate_by_share_counts() {
        let dividend = Money::new(dec!(1000.00), Currency::USD);
        let parts = dividend.allocate_by_weights(&[10, 5, 85]).unwrap();

        assert_eq!(parts[0].amount(), dec!(100.00));
        assert_eq!(parts[1].amount(), dec!(50.00));
        assert_eq!(parts[2].amount(), dec!(850.00));
    }

    #[test]
    fn test_last_weight_absorbs_remainder() {
        let dividend = Money::new(dec!(100.00), Currency::USD);
        let parts = dividend.allocate_by_weights(&[1, 1, 1]).unwrap();

        assert_eq!(parts[0].amount(), dec!(33.33));
        assert_eq!(parts[1].amount(), dec!(33.33));
        assert_eq!(parts[2].amount(), dec!(33.34));
        let total: Decimal = parts.iter().map(|p| p.amount()).sum();
        assert_eq!(total, dec!(100.00));
    }

    #[test]
    fn test_empty_and_zero_weights_rejected() {
        let m = Money::new(dec!(1), Currency::USD);
        assert!(m.allocate_by_weights(&[]).is_err());
        assert!(m.allocate_by_weights(&[0, 0]).is_err());
        assert!(m.allocate_by_weights(&[3, -1]).is_err());
    }

    #[test]
    fn test_overflowing_allocation_is_an_error() {
        let m = Money::new(Decimal::MAX, Currency::USD);
        assert_eq!(m.allocate_by_weights(&[3, 5]), Err(MoneyError::Overflow));
        assert_eq!(
            Money::new(dec!(1), Currency::USD).allocate_by_weights(&[i64::MAX, 1]),
            Err(MoneyError::Overflow)
        );
    }
}

mod rate {
    use super::*;

    #[test]
    fn test_platform_fee_two_percent() {
        let fee = Rate::from_percentage(dec!(2));
        let gross = Money::new(dec!(250000), Currency::USD);
        assert_eq!(fee.apply(&gross).amount(), dec!(5000));
        assert_eq!(fee.as_decimal(), dec!(0.02));
    }

    #[test]
    fn test_fee_rounds_to_cents() {
        let fee = Rate::from_percentage(dec!(2));
        let gross = Money::new(dec!(33.33), Currency::USD);
        assert_eq!(fee.apply(&gross).amount(), dec!(0.67));
    }
}

mod display {
    use super::*;

    #[test]
    fn test_money_display_usd() {
        let m = Money::new(dec!(1234.5), Currency::USD);
        assert_eq!(m.to_string(), "$ 1234.50");
    }

    #[test]
    fn test_money_display_inr() {
        let m = Money::new(dec!(50000), Currency::INR);
        assert_eq!(m.to_string(), "₹ 50000.00");
    }
}

mod serialization {
    use super::*;

    #[test]
    fn test_money_json_roundtrip() {
        let m = Money::new(dec!(510000), Currency::INR);
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"INR\""));
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
