//! Service-level tests for domain_ledger over the in-memory store

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

use core_kernel::{Currency, Money, PropertyId, UserId};
use domain_investor::{KycDocumentType, KycStatus, ReviewDecision};
use domain_property::PropertyStatus;
use domain_ledger::{
    Actor, ErrorKind, IdempotencyKey, InMemoryLedgerPort, InvestRequest, LedgerError, LedgerPort,
    LedgerServices, LedgerSettings, NewProperty, PaymentMethod, PaymentOutcome, RetryPolicy,
    TransactionStatus, TransactionType,
};

fn usd(amount: Decimal) -> Money {
    Money::new(amount, Currency::USD)
}

fn key(value: &str) -> IdempotencyKey {
    IdempotencyKey::new(value).unwrap()
}

struct Harness {
    port: Arc<InMemoryLedgerPort>,
    services: LedgerServices,
    admin: Actor,
}

impl Harness {
    fn new() -> Self {
        let port = Arc::new(InMemoryLedgerPort::new());
        let settings = LedgerSettings {
            retry: RetryPolicy::new(3, Duration::from_millis(1)),
            ..LedgerSettings::default()
        };
        Self {
            services: LedgerServices::new(port.clone(), settings),
            port,
            admin: Actor::admin(UserId::new()),
        }
    }

    async fn active_property(&self, total_shares: i64, share_price: Decimal) -> PropertyId {
        let property = self
            .services
            .properties
            .create_property(
                &self.admin,
                NewProperty {
                    name: "Marina Heights".to_string(),
                    location: "Dubai".to_string(),
                    description: None,
                    total_shares,
                    share_price,
                    spv: None,
                },
            )
            .await
            .unwrap();
        self.services
            .properties
            .update_status(&self.admin, property.id, PropertyStatus::Active)
            .await
            .unwrap();
        property.id
    }

    async fn verified_investor(&self, wallet: Decimal) -> UserId {
        let user = UserId::new();
        let document = self
            .services
            .kyc
            .submit_document(user, KycDocumentType::Passport, "s3://kyc/passport.pdf".to_string())
            .await
            .unwrap();
        self.services
            .kyc
            .review_document(&self.admin, document.id, ReviewDecision::Verify, None)
            .await
            .unwrap();
        if wallet > Decimal::ZERO {
            self.services
                .wallet
                .deposit(user, usd(wallet), key(&format!("seed-{}", user)))
                .await
                .unwrap();
        }
        user
    }

    fn request(&self, user: UserId, property: PropertyId, shares: i64, total: Decimal, k: &str) -> InvestRequest {
        InvestRequest {
            user_id: user,
            property_id: property,
            shares,
            total_amount: usd(total),
            payment_method: PaymentMethod::Wallet,
            idempotency_key: key(k),
        }
    }

    async fn wallet(&self, user: UserId) -> Money {
        self.services.wallet.balance(user).await.unwrap().wallet_balance
    }

    async fn available(&self, property: PropertyId) -> i64 {
        self.port.get_property(property).await.unwrap().unwrap().available_shares
    }
}

// ============= PRIMARY INVESTMENT TESTS =============
mod investment_tests {
    use super::*;

    #[tokio::test]
    async fn test_first_investment_scenario() {
        let h = Harness::new();
        let property = h.active_property(100, dec!(50000)).await;
        let user = h.verified_investor(dec!(600000)).await;

        let quote = h.services.investments.quote(property, 10).await.unwrap();
        assert_eq!(quote.gross, usd(dec!(500000)));
        assert_eq!(quote.fee, usd(dec!(10000)));
        assert_eq!(quote.total, usd(dec!(510000)));

        let receipt = h
            .services
            .investments
            .invest(h.request(user, property, 10, dec!(510000), "buy-1"))
            .await
            .unwrap();

        assert!(!receipt.replayed);
        assert_eq!(receipt.property.available_shares, 90);
        let investment = receipt.investment.unwrap();
        assert_eq!(investment.shares_owned, 10);
        assert_eq!(investment.total_invested, usd(dec!(510000)));
        assert_eq!(receipt.transaction.status, TransactionStatus::Completed);
        assert_eq!(receipt.transaction.fee, usd(dec!(10000)));
        assert_eq!(h.wallet(user).await, usd(dec!(90000)));
        assert_eq!(h.available(property).await, 90);
    }

    #[tokio::test]
    async fn test_second_investment_updates_same_position() {
        let h = Harness::new();
        let property = h.active_property(100, dec!(50000)).await;
        let user = h.verified_investor(dec!(600000)).await;

        h.services
            .investments
            .invest(h.request(user, property, 10, dec!(510000), "buy-1"))
            .await
            .unwrap();
        h.services
            .wallet
            .deposit(user, usd(dec!(200000)), key("top-up"))
            .await
            .unwrap();
        let receipt = h
            .services
            .investments
            .invest(h.request(user, property, 5, dec!(255000), "buy-2"))
            .await
            .unwrap();

        let investment = receipt.investment.unwrap();
        assert_eq!(investment.shares_owned, 15);
        assert_eq!(investment.total_invested, usd(dec!(765000)));
        assert_eq!(investment.average_buy_price, usd(dec!(51000)));
        assert_eq!(h.port.list_investments(user).await.unwrap().len(), 1);
        assert_eq!(h.wallet(user).await, usd(dec!(35000)));
        assert_eq!(h.available(property).await, 85);
    }

    #[tokio::test]
    async fn test_amount_mismatch_rejected() {
        let h = Harness::new();
        let property = h.active_property(100, dec!(50000)).await;
        let user = h.verified_investor(dec!(600000)).await;

        let err = h
            .services
            .investments
            .invest(h.request(user, property, 10, dec!(500000), "buy-1"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AmountMismatch);
        assert_eq!(h.available(property).await, 100);
        assert_eq!(h.wallet(user).await, usd(dec!(600000)));
    }

    #[tokio::test]
    async fn test_unverified_investor_makes_no_writes() {
        let h = Harness::new();
        let property = h.active_property(100, dec!(100)).await;
        let user = UserId::new();
        h.services
            .wallet
            .deposit(user, usd(dec!(10000)), key("dep"))
            .await
            .unwrap();
        let before = h.services.wallet.list_transactions(user).await.unwrap().len();

        let err = h
            .services
            .investments
            .invest(h.request(user, property, 1, dec!(102), "buy-1"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::KycRequired);
        assert_eq!(h.available(property).await, 100);
        assert_eq!(h.services.wallet.list_transactions(user).await.unwrap().len(), before);
        assert!(h.port.list_investments(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_draft_property_not_active() {
        let h = Harness::new();
        let user = h.verified_investor(dec!(10000)).await;
        let draft = h
            .services
            .properties
            .create_property(
                &h.admin,
                NewProperty {
                    name: "Draft".to_string(),
                    location: "Lisbon".to_string(),
                    description: None,
                    total_shares: 10,
                    share_price: dec!(100),
                    spv: None,
                },
            )
            .await
            .unwrap();

        let err = h
            .services
            .investments
            .invest(h.request(user, draft.id, 1, dec!(102), "buy-1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PropertyNotActive);
    }

    #[tokio::test]
    async fn test_oversell_rejected() {
        let h = Harness::new();
        let property = h.active_property(10, dec!(100)).await;
        let user = h.verified_investor(dec!(100000)).await;

        let err = h
            .services
            .investments
            .invest(h.request(user, property, 11, dec!(1122), "buy-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientShares { requested: 11, available: 10 }));
    }

    #[tokio::test]
    async fn test_insufficient_wallet_balance() {
        let h = Harness::new();
        let property = h.active_property(10, dec!(100)).await;
        let user = h.verified_investor(dec!(50)).await;

        let err = h
            .services
            .investments
            .invest(h.request(user, property, 1, dec!(102), "buy-1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientWalletBalance);
        assert_eq!(h.available(property).await, 10);
    }

    #[tokio::test]
    async fn test_last_share_funds_property() {
        let h = Harness::new();
        let property = h.active_property(2, dec!(100)).await;
        let user = h.verified_investor(dec!(1000)).await;

        let receipt = h
            .services
            .investments
            .invest(h.request(user, property, 2, dec!(204), "buy-all"))
            .await
            .unwrap();
        assert_eq!(receipt.property.status, PropertyStatus::Funded);
        assert_eq!(receipt.property.available_shares, 0);
    }

    #[tokio::test]
    async fn test_portfolio_values_positions() {
        let h = Harness::new();
        let property = h.active_property(100, dec!(100)).await;
        let user = h.verified_investor(dec!(10000)).await;
        h.services
            .investments
            .invest(h.request(user, property, 10, dec!(1020), "buy-1"))
            .await
            .unwrap();

        let portfolio = h.services.investments.portfolio(user).await.unwrap();
        assert_eq!(portfolio.entries.len(), 1);
        assert_eq!(portfolio.total_invested, usd(dec!(1020)));
        assert_eq!(portfolio.current_value, usd(dec!(1000)));
        assert_eq!(portfolio.entries[0].property_name, "Marina Heights");
    }
}

// ============= CONCURRENCY TESTS =============
mod concurrency_tests {
    use super::*;

    #[tokio::test]
    async fn test_two_concurrent_requests_cannot_oversell() {
        let h = Harness::new();
        let property = h.active_property(100, dec!(50000)).await;
        let alice = h.verified_investor(dec!(4000000)).await;
        let bob = h.verified_investor(dec!(4000000)).await;

        let a = {
            let services = h.services.clone();
            let request = h.request(alice, property, 60, dec!(3060000), "alice-60");
            tokio::spawn(async move { services.investments.invest(request).await })
        };
        let b = {
            let services = h.services.clone();
            let request = h.request(bob, property, 60, dec!(3060000), "bob-60");
            tokio::spawn(async move { services.investments.invest(request).await })
        };

        let results = vec![a.await.unwrap(), b.await.unwrap()];
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 1);
        let failure = results.into_iter().find_map(|r| r.err()).unwrap();
        assert_eq!(failure.kind(), ErrorKind::InsufficientShares);

        assert_eq!(h.available(property).await, 40);
        let owned: i64 = h
            .port
            .list_property_investments(property)
            .await
            .unwrap()
            .iter()
            .map(|i| i.shares_owned)
            .sum();
        assert_eq!(owned, 60);
    }

    #[tokio::test]
    async fn test_many_small_buyers_exhaust_exactly() {
        let h = Harness::new();
        let property = h.active_property(10, dec!(100)).await;
        let mut handles = Vec::new();
        for i in 0..15 {
            let user = h.verified_investor(dec!(1000)).await;
            let services = h.services.clone();
            let request = h.request(user, property, 1, dec!(102), &format!("buy-{}", i));
            handles.push(tokio::spawn(async move { services.investments.invest(request).await }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }
        assert_eq!(succeeded, 10);
        assert_eq!(h.available(property).await, 0);
    }

    #[tokio::test]
    async fn test_conflict_is_retried() {
        let h = Harness::new();
        let property = h.active_property(10, dec!(100)).await;
        let user = h.verified_investor(dec!(1000)).await;

        h.port.inject_conflicts(2);
        let receipt = h
            .services
            .investments
            .invest(h.request(user, property, 1, dec!(102), "buy-1"))
            .await
            .unwrap();
        assert_eq!(receipt.property.available_shares, 9);
    }

    #[tokio::test]
    async fn test_exhausted_retries_report_conflict_without_effects() {
        let h = Harness::new();
        let property = h.active_property(10, dec!(100)).await;
        let user = h.verified_investor(dec!(1000)).await;

        h.port.inject_conflicts(3);
        let err = h
            .services
            .investments
            .invest(h.request(user, property, 1, dec!(102), "buy-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::ConcurrentConflict { attempts: 3 }));
        assert_eq!(err.kind().code(), "CONCURRENT_CONFLICT");
        assert_eq!(h.available(property).await, 10);
        assert_eq!(h.wallet(user).await, usd(dec!(1000)));
    }
}

// ============= IDEMPOTENCY TESTS =============
mod idempotency_tests {
    use super::*;

    #[tokio::test]
    async fn test_same_key_applies_once() {
        let h = Harness::new();
        let property = h.active_property(100, dec!(100)).await;
        let user = h.verified_investor(dec!(10000)).await;

        let first = h
            .services
            .investments
            .invest(h.request(user, property, 5, dec!(510), "checkout-1"))
            .await
            .unwrap();
        let second = h
            .services
            .investments
            .invest(h.request(user, property, 5, dec!(510), "checkout-1"))
            .await
            .unwrap();

        assert!(second.replayed);
        assert_eq!(first.transaction.id, second.transaction.id);
        assert_eq!(h.available(property).await, 95);
        assert_eq!(h.wallet(user).await, usd(dec!(9490)));
        let purchases = h
            .services
            .wallet
            .list_transactions(user)
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.transaction_type == TransactionType::SharePurchase)
            .count();
        assert_eq!(purchases, 1);
    }

    #[tokio::test]
    async fn test_key_reused_for_different_request() {
        let h = Harness::new();
        let property = h.active_property(100, dec!(100)).await;
        let user = h.verified_investor(dec!(10000)).await;

        h.services
            .investments
            .invest(h.request(user, property, 5, dec!(510), "checkout-1"))
            .await
            .unwrap();
        let err = h
            .services
            .investments
            .invest(h.request(user, property, 6, dec!(612), "checkout-1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IdempotencyKeyReused);
    }

    #[tokio::test]
    async fn test_keys_are_scoped_per_user() {
        let h = Harness::new();
        let property = h.active_property(100, dec!(100)).await;
        let alice = h.verified_investor(dec!(10000)).await;
        let bob = h.verified_investor(dec!(10000)).await;

        for user in [alice, bob] {
            let receipt = h
                .services
                .investments
                .invest(h.request(user, property, 1, dec!(102), "same-key"))
                .await
                .unwrap();
            assert!(!receipt.replayed);
        }
        assert_eq!(h.available(property).await, 98);
    }

    #[tokio::test]
    async fn test_deposit_replay() {
        let h = Harness::new();
        let user = UserId::new();
        let first = h.services.wallet.deposit(user, usd(dec!(50)), key("dep-1")).await.unwrap();
        let again = h.services.wallet.deposit(user, usd(dec!(50)), key("dep-1")).await.unwrap();

        assert!(!first.replayed);
        assert!(again.replayed);
        assert_eq!(first.transaction.id, again.transaction.id);
        assert_eq!(h.wallet(user).await, usd(dec!(50)));
    }
}

// ============= BANK TRANSFER TESTS =============
mod bank_transfer_tests {
    use super::*;

    fn transfer(h: &Harness, user: UserId, property: PropertyId, shares: i64, total: Decimal) -> InvestRequest {
        InvestRequest {
            payment_method: PaymentMethod::BankTransfer,
            ..h.request(user, property, shares, total, "wire-1")
        }
    }

    #[tokio::test]
    async fn test_pending_until_confirmed() {
        let h = Harness::new();
        let property = h.active_property(10, dec!(100)).await;
        let user = h.verified_investor(Decimal::ZERO).await;

        let receipt = h
            .services
            .investments
            .invest(transfer(&h, user, property, 2, dec!(204)))
            .await
            .unwrap();
        assert_eq!(receipt.transaction.status, TransactionStatus::Pending);
        assert!(receipt.investment.is_none());
        assert_eq!(h.available(property).await, 10);

        let confirmed = h
            .services
            .investments
            .confirm_payment(&h.admin, receipt.transaction.id, PaymentOutcome::Succeeded)
            .await
            .unwrap();
        assert_eq!(confirmed.status, TransactionStatus::Completed);
        assert_eq!(h.available(property).await, 8);
        let position = h.port.list_investments(user).await.unwrap();
        assert_eq!(position[0].shares_owned, 2);
        assert_eq!(h.wallet(user).await, usd(Decimal::ZERO));
    }

    #[tokio::test]
    async fn test_failed_payment_leaves_inventory() {
        let h = Harness::new();
        let property = h.active_property(10, dec!(100)).await;
        let user = h.verified_investor(Decimal::ZERO).await;
        let receipt = h
            .services
            .investments
            .invest(transfer(&h, user, property, 2, dec!(204)))
            .await
            .unwrap();

        let failed = h
            .services
            .investments
            .confirm_payment(&h.admin, receipt.transaction.id, PaymentOutcome::Failed)
            .await
            .unwrap();
        assert_eq!(failed.status, TransactionStatus::Failed);
        assert_eq!(h.available(property).await, 10);

        let err = h
            .services
            .investments
            .confirm_payment(&h.admin, receipt.transaction.id, PaymentOutcome::Succeeded)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_confirmation_fails_when_sold_out() {
        let h = Harness::new();
        let property = h.active_property(2, dec!(100)).await;
        let wire_user = h.verified_investor(Decimal::ZERO).await;
        let wallet_user = h.verified_investor(dec!(1000)).await;

        let pending = h
            .services
            .investments
            .invest(transfer(&h, wire_user, property, 2, dec!(204)))
            .await
            .unwrap();
        h.services
            .investments
            .invest(h.request(wallet_user, property, 2, dec!(204), "buy-all"))
            .await
            .unwrap();

        let outcome = h
            .services
            .investments
            .confirm_payment(&h.admin, pending.transaction.id, PaymentOutcome::Succeeded)
            .await
            .unwrap();
        assert_eq!(outcome.status, TransactionStatus::Failed);
        assert_eq!(h.available(property).await, 0);
    }

    #[tokio::test]
    async fn test_confirmation_requires_admin() {
        let h = Harness::new();
        let property = h.active_property(10, dec!(100)).await;
        let user = h.verified_investor(Decimal::ZERO).await;
        let receipt = h
            .services
            .investments
            .invest(transfer(&h, user, property, 1, dec!(102)))
            .await
            .unwrap();

        let err = h
            .services
            .investments
            .confirm_payment(&Actor::user(user), receipt.transaction.id, PaymentOutcome::Succeeded)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
}

// ============= REFUND TESTS =============
mod refund_tests {
    use super::*;

    #[tokio::test]
    async fn test_refund_returns_inventory_and_cost() {
        let h = Harness::new();
        let property = h.active_property(10, dec!(100)).await;
        let user = h.verified_investor(dec!(1020)).await;
        let receipt = h
            .services
            .investments
            .invest(h.request(user, property, 10, dec!(1020), "buy-all"))
            .await
            .unwrap();
        assert_eq!(receipt.property.status, PropertyStatus::Funded);
        let investment_id = receipt.investment.unwrap().id;

        let refund = h
            .services
            .investments
            .refund_investment(&h.admin, investment_id, 4)
            .await
            .unwrap();

        assert_eq!(refund.transaction_type, TransactionType::Refund);
        assert_eq!(refund.amount, usd(dec!(408)));
        assert_eq!(h.wallet(user).await, usd(dec!(408)));
        let property = h.port.get_property(property).await.unwrap().unwrap();
        assert_eq!(property.available_shares, 4);
        assert_eq!(property.status, PropertyStatus::Active);
        let investment = h.port.get_investment(investment_id).await.unwrap().unwrap();
        assert_eq!(investment.shares_owned, 6);
    }

    #[tokio::test]
    async fn test_refund_more_than_owned() {
        let h = Harness::new();
        let property = h.active_property(10, dec!(100)).await;
        let user = h.verified_investor(dec!(1000)).await;
        let receipt = h
            .services
            .investments
            .invest(h.request(user, property, 2, dec!(204), "buy"))
            .await
            .unwrap();

        let err = h
            .services
            .investments
            .refund_investment(&h.admin, receipt.investment.unwrap().id, 3)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientShares);
        assert_eq!(h.available(property).await, 8);
    }
}

// ============= WALLET TESTS =============
mod wallet_tests {
    use super::*;

    #[tokio::test]
    async fn test_withdraw_conditional_on_balance() {
        let h = Harness::new();
        let user = UserId::new();
        h.services.wallet.deposit(user, usd(dec!(100)), key("dep")).await.unwrap();

        let err = h
            .services
            .wallet
            .withdraw(user, usd(dec!(100.01)), key("wd-1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientWalletBalance);

        let withdrawal = h.services.wallet.withdraw(user, usd(dec!(60)), key("wd-2")).await.unwrap();
        assert_eq!(withdrawal.transaction.transaction_type, TransactionType::Withdrawal);
        assert_eq!(h.wallet(user).await, usd(dec!(40)));
    }

    #[tokio::test]
    async fn test_rejects_non_positive_and_fractional_cents() {
        let h = Harness::new();
        let user = UserId::new();
        for amount in [dec!(0), dec!(-5), dec!(1.005)] {
            let err = h
                .services
                .wallet
                .deposit(user, usd(amount), key("dep"))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[tokio::test]
    async fn test_transactions_newest_first() {
        let h = Harness::new();
        let user = UserId::new();
        h.services.wallet.deposit(user, usd(dec!(10)), key("a")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        h.services.wallet.deposit(user, usd(dec!(20)), key("b")).await.unwrap();

        let history = h.services.wallet.list_transactions(user).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].amount, usd(dec!(20)));
    }
}

// ============= KYC TESTS =============
mod kyc_tests {
    use super::*;

    #[tokio::test]
    async fn test_profile_created_on_first_access() {
        let h = Harness::new();
        let user = UserId::new();
        let view = h.services.kyc.get_profile(user).await.unwrap();
        assert_eq!(view.profile.kyc_status, KycStatus::NotStarted);
        assert!(view.documents.is_empty());
        assert!(h.port.get_profile(user).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_submission_then_rejection() {
        let h = Harness::new();
        let user = UserId::new();
        let document = h
            .services
            .kyc
            .submit_document(user, KycDocumentType::NationalId, "s3://kyc/id.png".to_string())
            .await
            .unwrap();
        assert_eq!(
            h.services.kyc.get_profile(user).await.unwrap().profile.kyc_status,
            KycStatus::Pending
        );

        let view = h
            .services
            .kyc
            .review_document(&h.admin, document.id, ReviewDecision::Reject, Some("Blurred".to_string()))
            .await
            .unwrap();
        assert_eq!(view.profile.kyc_status, KycStatus::Rejected);
    }

    #[tokio::test]
    async fn test_review_requires_admin_and_other_reviewer() {
        let h = Harness::new();
        let user = UserId::new();
        let document = h
            .services
            .kyc
            .submit_document(user, KycDocumentType::Passport, "ref".to_string())
            .await
            .unwrap();

        let err = h
            .services
            .kyc
            .review_document(&Actor::user(user), document.id, ReviewDecision::Verify, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = h
            .services
            .kyc
            .review_document(&Actor::admin(user), document.id, ReviewDecision::Verify, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_verified_after_all_documents_accepted() {
        let h = Harness::new();
        let user = UserId::new();
        let passport = h
            .services
            .kyc
            .submit_document(user, KycDocumentType::Passport, "p".to_string())
            .await
            .unwrap();
        let address = h
            .services
            .kyc
            .submit_document(user, KycDocumentType::ProofOfAddress, "a".to_string())
            .await
            .unwrap();

        let view = h
            .services
            .kyc
            .review_document(&h.admin, passport.id, ReviewDecision::Verify, None)
            .await
            .unwrap();
        assert_eq!(view.profile.kyc_status, KycStatus::Pending);

        let view = h
            .services
            .kyc
            .review_document(&h.admin, address.id, ReviewDecision::Verify, None)
            .await
            .unwrap();
        assert_eq!(view.profile.kyc_status, KycStatus::Verified);
    }
}

// ============= PROPERTY ADMINISTRATION TESTS =============
mod property_admin_tests {
    use super::*;
    use chrono::NaiveDate;
    use domain_ledger::NewSpv;
    use domain_property::{DocumentKind, DueDiligence};

    #[tokio::test]
    async fn test_drafts_hidden_from_default_listing() {
        let h = Harness::new();
        let active = h.active_property(10, dec!(100)).await;
        h.services
            .properties
            .create_property(
                &h.admin,
                NewProperty {
                    name: "Hidden".to_string(),
                    location: "Oslo".to_string(),
                    description: None,
                    total_shares: 10,
                    share_price: dec!(10),
                    spv: None,
                },
            )
            .await
            .unwrap();

        let listed = h.services.properties.list_properties(None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, active);

        let drafts = h
            .services
            .properties
            .list_properties(Some(PropertyStatus::Draft))
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
    }

    #[tokio::test]
    async fn test_details_include_spv_documents_and_due_diligence() {
        let h = Harness::new();
        let property = h
            .services
            .properties
            .create_property(
                &h.admin,
                NewProperty {
                    name: "Canal House".to_string(),
                    location: "Amsterdam".to_string(),
                    description: Some("Four units".to_string()),
                    total_shares: 1000,
                    share_price: dec!(250),
                    spv: Some(NewSpv {
                        name: "Canal House BV".to_string(),
                        registration_number: "NL-123".to_string(),
                        jurisdiction: "Netherlands".to_string(),
                    }),
                },
            )
            .await
            .unwrap();
        h.services
            .properties
            .add_document(
                &h.admin,
                property.id,
                DocumentKind::TitleDeed,
                "Deed".to_string(),
                "https://docs/deed.pdf".to_string(),
            )
            .await
            .unwrap();
        h.services
            .properties
            .record_due_diligence(
                &h.admin,
                DueDiligence {
                    property_id: property.id,
                    valuation: usd(dec!(260000)),
                    legal_status: "Clear title".to_string(),
                    reviewed_by: "Appraisal Co".to_string(),
                    completed_on: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                    risk_notes: None,
                },
            )
            .await
            .unwrap();

        let details = h.services.properties.get_details(property.id).await.unwrap();
        assert_eq!(details.documents.len(), 1);
        assert_eq!(details.spv.unwrap().registration_number, "NL-123");
        assert_eq!(details.due_diligence.unwrap().valuation, usd(dec!(260000)));
    }

    #[tokio::test]
    async fn test_duplicate_spv_registration_rejected() {
        let h = Harness::new();
        let listing = |name: &str| NewProperty {
            name: name.to_string(),
            location: "Rotterdam".to_string(),
            description: None,
            total_shares: 100,
            share_price: dec!(50),
            spv: Some(NewSpv {
                name: format!("{} BV", name),
                registration_number: "NL-777".to_string(),
                jurisdiction: "Netherlands".to_string(),
            }),
        };
        h.services
            .properties
            .create_property(&h.admin, listing("Harbour Loft"))
            .await
            .unwrap();

        let err = h
            .services
            .properties
            .create_property(&h.admin, listing("Quay Works"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let drafts = h
            .services
            .properties
            .list_properties(Some(PropertyStatus::Draft))
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].name, "Harbour Loft");
    }

    #[tokio::test]
    async fn test_invalid_status_transition() {
        let h = Harness::new();
        let property = h.active_property(10, dec!(100)).await;
        h.services
            .properties
            .update_status(&h.admin, property, PropertyStatus::Closed)
            .await
            .unwrap();

        let err = h
            .services
            .properties
            .update_status(&h.admin, property, PropertyStatus::Active)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_create_requires_admin() {
        let h = Harness::new();
        let err = h
            .services
            .properties
            .create_property(
                &Actor::user(UserId::new()),
                NewProperty {
                    name: "X".to_string(),
                    location: "Y".to_string(),
                    description: None,
                    total_shares: 1,
                    share_price: dec!(1),
                    spv: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
}

// ============= DIVIDEND TESTS =============
mod dividend_tests {
    use super::*;

    #[tokio::test]
    async fn test_distribution_sums_to_total() {
        let h = Harness::new();
        let property = h.active_property(10, dec!(100)).await;
        let mut holders = Vec::new();
        for _ in 0..3 {
            let user = h.verified_investor(dec!(1000)).await;
            h.services
                .investments
                .invest(h.request(user, property, 1, dec!(102), "buy"))
                .await
                .unwrap();
            holders.push(user);
        }
        let before: Vec<Money> = {
            let mut balances = Vec::new();
            for user in &holders {
                balances.push(h.wallet(*user).await);
            }
            balances
        };

        let receipt = h
            .services
            .dividends
            .distribute(&h.admin, property, usd(dec!(100)), key("q1"))
            .await
            .unwrap();

        let allocated: Decimal = receipt.allocations.iter().map(|a| a.amount.amount()).sum();
        assert_eq!(allocated, dec!(100));
        assert_eq!(receipt.distribution.recipients, 3);

        let mut credited = Decimal::ZERO;
        for (user, before) in holders.iter().zip(before) {
            credited += h.wallet(*user).await.amount() - before.amount();
        }
        assert_eq!(credited, dec!(100));
    }

    #[tokio::test]
    async fn test_distribution_is_idempotent() {
        let h = Harness::new();
        let property = h.active_property(10, dec!(100)).await;
        let user = h.verified_investor(dec!(1000)).await;
        h.services
            .investments
            .invest(h.request(user, property, 2, dec!(204), "buy"))
            .await
            .unwrap();
        let before = h.wallet(user).await;

        let first = h
            .services
            .dividends
            .distribute(&h.admin, property, usd(dec!(50)), key("q1"))
            .await
            .unwrap();
        let again = h
            .services
            .dividends
            .distribute(&h.admin, property, usd(dec!(50)), key("q1"))
            .await
            .unwrap();

        assert!(again.replayed);
        assert_eq!(first.distribution.id, again.distribution.id);
        assert_eq!(h.wallet(user).await.amount() - before.amount(), dec!(50));
    }

    #[tokio::test]
    async fn test_overflowing_total_is_validation_error() {
        let h = Harness::new();
        let property = h.active_property(10, dec!(100)).await;
        let small = h.verified_investor(dec!(1000)).await;
        let large = h.verified_investor(dec!(1000)).await;
        h.services
            .investments
            .invest(h.request(small, property, 3, dec!(306), "buy-small"))
            .await
            .unwrap();
        h.services
            .investments
            .invest(h.request(large, property, 5, dec!(510), "buy-large"))
            .await
            .unwrap();

        let err = h
            .services
            .dividends
            .distribute(&h.admin, property, usd(Decimal::MAX), key("huge"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(h.wallet(small).await, usd(dec!(694)));
        assert_eq!(h.wallet(large).await, usd(dec!(490)));
        assert!(h.services.dividends.list(property).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_holders_is_validation_error() {
        let h = Harness::new();
        let property = h.active_property(10, dec!(100)).await;
        let err = h
            .services
            .dividends
            .distribute(&h.admin, property, usd(dec!(50)), key("q1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
