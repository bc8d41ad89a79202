//! Row mapping for the ledger tables
//!
//! Entities come from the shared builders, go through the executor-generic
//! repository functions and must read back unchanged.

use rust_decimal_macros::dec;

use core_kernel::{Currency, Money};
use domain_investor::KycStatus;
use domain_ledger::{OrderSide, OrderStatus};
use domain_property::PropertyStatus;
use infra_db::repositories::{investor, ledger, market, property, Lock};
use test_utils::{
    assert_inventory_consistent, assert_money_eq, assert_money_zero, assert_wallet, db_test,
    get_shared_test_database, IdFixtures, InvestmentBuilder, InvestorBuilder, MoneyFixtures,
    OrderBuilder, PropertyBuilder, StringFixtures,
};

db_test!(test_rows_round_trip, |pool| {
    let listing = PropertyBuilder::new()
        .with_name(StringFixtures::property_name())
        .with_total_shares(250)
        .with_sold_shares(40)
        .with_share_price(Money::new(dec!(1200), Currency::USD))
        .with_status(PropertyStatus::Active)
        .build();
    property::insert_property(&pool, &listing).await.unwrap();

    let stored = property::find_property(&pool, listing.id, Lock::None).await.unwrap().unwrap();
    assert_eq!(stored.name, StringFixtures::property_name());
    assert_eq!(stored.available_shares, 210);
    assert_eq!(stored.status, PropertyStatus::Active);
    assert_money_eq(&stored.share_price, &listing.share_price);
    assert_inventory_consistent(&stored);

    let profile = InvestorBuilder::new()
        .with_user_id(IdFixtures::investor_id())
        .with_wallet(MoneyFixtures::usd_100())
        .build();
    investor::upsert_profile(&pool, &profile).await.unwrap();
    let stored_profile = investor::find_profile(&pool, profile.user_id, Lock::None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_profile.kyc_status, KycStatus::Verified);
    assert_wallet(&stored_profile, dec!(100.00), dec!(0));
    assert_money_zero(&stored_profile.reserved_balance);

    let position = InvestmentBuilder::new(profile.user_id, listing.id)
        .with_shares(40)
        .with_price_per_share(Money::new(dec!(1200), Currency::USD))
        .build();
    ledger::upsert_investment(&pool, &position).await.unwrap();
    let stored_position = ledger::find_position(&pool, profile.user_id, listing.id, Lock::None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_position.id, position.id);
    assert_eq!(stored_position.shares_owned, 40);
    assert_money_eq(&stored_position.total_invested, &Money::new(dec!(48000), Currency::USD));

    let order = OrderBuilder::buy(IdFixtures::second_investor_id(), listing.id)
        .with_shares(3)
        .with_price(dec!(1250.50))
        .with_idempotency_key("bid-1")
        .build();
    market::upsert_order(&pool, &order).await.unwrap();
    let by_key = market::find_order_by_key(&pool, IdFixtures::second_investor_id(), "bid-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_key.id, order.id);
    assert_eq!(by_key.side, OrderSide::Buy);
    assert_eq!(by_key.status, OrderStatus::Open);
    assert_money_eq(&by_key.price_per_share, &Money::new(dec!(1250.50), Currency::USD));
});

db_test!(test_unverified_profile_keeps_status, |pool| {
    let profile = InvestorBuilder::new().unverified().build();
    investor::upsert_profile(&pool, &profile).await.unwrap();

    let stored = investor::find_profile(&pool, profile.user_id, Lock::ForUpdate)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.kyc_status, KycStatus::NotStarted);
    assert_money_eq(&stored.wallet_balance, &MoneyFixtures::usd_wallet());
});

#[tokio::test]
#[ignore = "requires docker"]
async fn test_clear_data_keeps_schema() {
    let db = get_shared_test_database().await;
    let listing = PropertyBuilder::new()
        .with_status(PropertyStatus::Draft)
        .build();
    property::insert_property(db.pool(), &listing).await.unwrap();
    assert!(!property::list_properties(db.pool(), Some(PropertyStatus::Draft))
        .await
        .unwrap()
        .is_empty());

    db.clear_data().await.unwrap();

    assert!(property::list_properties(db.pool(), None).await.unwrap().is_empty());
    property::insert_property(db.pool(), &listing).await.unwrap();
}
