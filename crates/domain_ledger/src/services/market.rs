//! Secondary market between investors
//!
//! Orders are matched in the unit of work that places them. Buy orders
//! escrow cash at their limit price and sell orders lock listed shares, so
//! every fill can settle immediately: the seller's position shrinks and
//! their wallet is credited, the buyer's escrow is consumed and their
//! position grows. Shares only move between investors; primary inventory is
//! never touched.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

use core_kernel::{Currency, MarketOrderId, PropertyId, UserId};
use domain_investor::InvestorProfile;

use super::{load_or_create_profile, require_property, Actor, LedgerSettings};
use crate::error::LedgerError;
use crate::idempotency::IdempotencyKey;
use crate::investment::Investment;
use crate::market::{BookSnapshot, Fill, MarketOrder, OrderBook, OrderSide, Trade};
use crate::ports::{LedgerPort, LedgerUnitOfWork};
use crate::transaction::{PaymentMethod, Transaction, TransactionType};

/// A limit order request
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub user_id: UserId,
    pub property_id: PropertyId,
    pub side: OrderSide,
    pub shares: i64,
    pub price_per_share: Decimal,
    pub idempotency_key: IdempotencyKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceipt {
    /// The order after matching
    pub order: MarketOrder,
    /// Trades executed while placing the order
    pub trades: Vec<Trade>,
    pub replayed: bool,
}

#[derive(Clone)]
pub struct MarketService {
    port: Arc<dyn LedgerPort>,
    settings: LedgerSettings,
}

impl MarketService {
    pub fn new(port: Arc<dyn LedgerPort>, settings: LedgerSettings) -> Self {
        Self { port, settings }
    }

    /// Places a limit order and matches it against the opposite side
    ///
    /// # Errors
    ///
    /// - `KycRequired` unless the investor is verified
    /// - `PropertyNotActive` unless the property is active or funded
    /// - `InsufficientWalletBalance` when a buy cannot be escrowed
    /// - `InsufficientShares` when a sell exceeds the unlisted position
    #[instrument(
        skip_all,
        fields(
            user_id = %request.user_id,
            property_id = %request.property_id,
            side = request.side.as_str(),
            shares = request.shares,
        )
    )]
    pub async fn place_order(&self, request: PlaceOrder) -> Result<OrderReceipt, LedgerError> {
        let price = self.settings.money(request.price_per_share);
        MarketOrder::new(
            request.user_id,
            request.property_id,
            request.side,
            request.shares,
            price,
            request.idempotency_key.as_str(),
        )?;

        let request = &request;
        let receipt = self
            .settings
            .retry
            .run("place_order", move || self.try_place(request))
            .await?;

        tracing::info!(
            order_id = %receipt.order.id,
            status = %receipt.order.status,
            trades = receipt.trades.len(),
            replayed = receipt.replayed,
            "Order placed"
        );
        Ok(receipt)
    }

    async fn try_place(&self, request: &PlaceOrder) -> Result<OrderReceipt, LedgerError> {
        let mut uow = self.port.begin().await?;

        if let Some(existing) = uow
            .find_order_by_key(request.user_id, request.idempotency_key.as_str())
            .await?
        {
            let same_request = existing.property_id == request.property_id
                && existing.side == request.side
                && existing.shares == request.shares
                && existing.price_per_share.amount() == request.price_per_share;
            if !same_request {
                return Err(LedgerError::IdempotencyKeyReused(request.idempotency_key.to_string()));
            }
            return Ok(OrderReceipt {
                order: existing,
                trades: Vec::new(),
                replayed: true,
            });
        }

        let mut taker = MarketOrder::new(
            request.user_id,
            request.property_id,
            request.side,
            request.shares,
            self.settings.money(request.price_per_share),
            request.idempotency_key.as_str(),
        )?;

        let property = require_property(uow.as_mut(), request.property_id).await?;
        if !property.is_tradable() {
            return Err(LedgerError::PropertyNotActive {
                status: property.status.to_string(),
            });
        }

        let mut ledger = Settlement::default();
        let currency = self.settings.currency;

        ledger
            .profile(uow.as_mut(), request.user_id, currency)
            .await?
            .require_verified()?;
        match taker.side {
            OrderSide::Buy => {
                let escrow = taker.notional(taker.shares)?;
                ledger
                    .profile(uow.as_mut(), request.user_id, currency)
                    .await?
                    .escrow(&escrow)?;
            }
            OrderSide::Sell => {
                let position = ledger.investment(uow.as_mut(), request.user_id, &property.id, currency).await?;
                position.list(taker.shares)?;
            }
        }

        let resting = uow.lock_open_orders(property.id, taker.side.opposite()).await?;
        let mut book = OrderBook::from_orders(property.id, resting);
        let fills = book.match_order(&mut taker)?;

        uow.save_order(&taker).await?;
        let mut trades = Vec::with_capacity(fills.len());
        for fill in fills {
            ledger.settle(uow.as_mut(), &fill, &taker, currency).await?;
            uow.save_order(&fill.maker).await?;
            uow.insert_trade(&fill.trade).await?;
            for transaction in settlement_transactions(&fill.trade) {
                uow.insert_transaction(&transaction).await?;
            }
            trades.push(fill.trade);
        }

        ledger.persist(uow.as_mut()).await?;
        uow.commit().await?;

        Ok(OrderReceipt {
            order: taker,
            trades,
            replayed: false,
        })
    }

    /// Cancels the unfilled remainder of the caller's order
    ///
    /// A buy order's remaining escrow returns to the wallet; a sell order's
    /// remaining shares are unlisted. Fills that already happened stay settled.
    #[instrument(skip_all, fields(user_id = %actor.user_id, order_id = %order_id))]
    pub async fn cancel_order(&self, actor: &Actor, order_id: MarketOrderId) -> Result<MarketOrder, LedgerError> {
        let user_id = actor.user_id;
        let order = self
            .settings
            .retry
            .run("cancel_order", move || self.try_cancel(user_id, order_id))
            .await?;
        tracing::info!(status = %order.status, "Order cancelled");
        Ok(order)
    }

    async fn try_cancel(&self, user_id: UserId, order_id: MarketOrderId) -> Result<MarketOrder, LedgerError> {
        let mut uow = self.port.begin().await?;
        let mut order = uow
            .lock_order(order_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("MarketOrder", order_id))?;
        if order.user_id != user_id {
            return Err(LedgerError::forbidden("Only the owner can cancel an order"));
        }

        let remaining = order.cancel()?;
        match order.side {
            OrderSide::Buy => {
                let mut profile = load_or_create_profile(uow.as_mut(), user_id, self.settings.currency).await?;
                profile.release_escrow(&order.notional(remaining)?)?;
                uow.save_profile(&profile).await?;
            }
            OrderSide::Sell => {
                let mut position = uow
                    .lock_investment(user_id, order.property_id)
                    .await?
                    .ok_or_else(|| LedgerError::InvalidState(format!("Order {} has no backing position", order_id)))?;
                position.unlist(remaining)?;
                uow.save_investment(&position).await?;
            }
        }

        uow.save_order(&order).await?;
        uow.commit().await?;
        Ok(order)
    }

    /// Aggregated depth of a property's book
    pub async fn order_book(&self, property_id: PropertyId) -> Result<BookSnapshot, LedgerError> {
        if self.port.get_property(property_id).await?.is_none() {
            return Err(LedgerError::not_found("Property", property_id));
        }
        let orders = self.port.list_open_orders(property_id).await?;
        Ok(OrderBook::from_orders(property_id, orders).snapshot())
    }

    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<MarketOrder>, LedgerError> {
        Ok(self.port.list_orders(user_id).await?)
    }

    pub async fn list_trades(&self, property_id: PropertyId) -> Result<Vec<Trade>, LedgerError> {
        Ok(self.port.list_trades(property_id).await?)
    }
}

/// Profiles and positions touched while settling one order, written back
/// together at the end of the unit
#[derive(Default)]
struct Settlement {
    profiles: HashMap<UserId, InvestorProfile>,
    investments: HashMap<UserId, Investment>,
}

impl Settlement {
    async fn profile(
        &mut self,
        uow: &mut dyn LedgerUnitOfWork,
        user_id: UserId,
        currency: Currency,
    ) -> Result<&mut InvestorProfile, LedgerError> {
        if !self.profiles.contains_key(&user_id) {
            let profile = load_or_create_profile(uow, user_id, currency).await?;
            self.profiles.insert(user_id, profile);
        }
        self.profiles
            .get_mut(&user_id)
            .ok_or_else(|| LedgerError::InvalidState(format!("Profile {} not loaded", user_id)))
    }

    async fn investment(
        &mut self,
        uow: &mut dyn LedgerUnitOfWork,
        user_id: UserId,
        property_id: &PropertyId,
        currency: Currency,
    ) -> Result<&mut Investment, LedgerError> {
        if !self.investments.contains_key(&user_id) {
            let investment = uow
                .lock_investment(user_id, *property_id)
                .await?
                .unwrap_or_else(|| Investment::open(user_id, *property_id, currency));
            self.investments.insert(user_id, investment);
        }
        self.investments
            .get_mut(&user_id)
            .ok_or_else(|| LedgerError::InvalidState(format!("Position of {} not loaded", user_id)))
    }

    /// Moves cash and shares for one fill
    ///
    /// The buyer escrowed at their own limit; when the taker buys below it the
    /// difference goes back to their wallet.
    async fn settle(
        &mut self,
        uow: &mut dyn LedgerUnitOfWork,
        fill: &Fill,
        taker: &MarketOrder,
        currency: Currency,
    ) -> Result<(), LedgerError> {
        let trade = &fill.trade;
        let escrowed = match taker.side {
            OrderSide::Buy => taker.notional(trade.shares)?,
            OrderSide::Sell => trade.total,
        };
        let improvement = escrowed.checked_sub(&trade.total)?;

        let buyer = self.profile(uow, trade.buyer_id, currency).await?;
        buyer.consume_escrow(&trade.total)?;
        buyer.release_escrow(&improvement)?;

        let seller = self.profile(uow, trade.seller_id, currency).await?;
        seller.credit(&trade.total)?;

        self.investment(uow, trade.seller_id, &trade.property_id, currency)
            .await?
            .settle_listed(trade.shares)?;
        self.investment(uow, trade.buyer_id, &trade.property_id, currency)
            .await?
            .accumulate(trade.shares, &trade.total)?;

        tracing::debug!(
            trade_id = %trade.id,
            shares = trade.shares,
            price = %trade.price_per_share,
            "Trade settled"
        );
        Ok(())
    }

    async fn persist(self, uow: &mut dyn LedgerUnitOfWork) -> Result<(), LedgerError> {
        for profile in self.profiles.values() {
            uow.save_profile(profile).await?;
        }
        for investment in self.investments.values() {
            uow.save_investment(investment).await?;
        }
        Ok(())
    }
}

/// One completed ledger entry per side of a trade
fn settlement_transactions(trade: &Trade) -> [Transaction; 2] {
    let purchase = Transaction::for_shares(
        trade.buyer_id,
        TransactionType::SharePurchase,
        trade.property_id,
        trade.shares,
        trade.total,
    )
    .with_payment_method(PaymentMethod::Wallet)
    .with_reference(trade.id);
    let sale = Transaction::for_shares(
        trade.seller_id,
        TransactionType::ShareSale,
        trade.property_id,
        trade.shares,
        trade.total,
    )
    .with_reference(trade.id);
    [purchase, sale]
}
