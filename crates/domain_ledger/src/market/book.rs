//! Price-time priority order book
//!
//! The book is rebuilt from the open orders of one property for every
//! command, so it only ever lives inside a single atomic unit. Bids are keyed
//! by reversed price so the best bid iterates first; asks ascend. Within a
//! level, orders queue by arrival time.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, VecDeque};

use core_kernel::{Money, PropertyId, TradeId};
use crate::error::LedgerError;
use crate::market::order::{MarketOrder, OrderSide};
use crate::market::trade::Trade;

type PriceLevel = VecDeque<MarketOrder>;

/// Result of crossing an incoming order with one resting order
#[derive(Debug, Clone)]
pub struct Fill {
    pub trade: Trade,
    /// Resting order after the fill
    pub maker: MarketOrder,
}

/// Aggregated view of one price level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSummary {
    pub price_per_share: Money,
    pub shares: i64,
    pub orders: usize,
}

/// Depth snapshot of a property's book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub property_id: PropertyId,
    pub bids: Vec<LevelSummary>,
    pub asks: Vec<LevelSummary>,
}

#[derive(Debug, Clone)]
pub struct OrderBook {
    property_id: PropertyId,
    bids: BTreeMap<Reverse<Decimal>, PriceLevel>,
    asks: BTreeMap<Decimal, PriceLevel>,
}

impl OrderBook {
    pub fn new(property_id: PropertyId) -> Self {
        Self {
            property_id,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
        }
    }

    /// Builds a book from resting orders; inactive orders are ignored
    pub fn from_orders(property_id: PropertyId, orders: impl IntoIterator<Item = MarketOrder>) -> Self {
        let mut resting: Vec<MarketOrder> = orders
            .into_iter()
            .filter(|o| o.property_id == property_id && o.is_active() && o.remaining() > 0)
            .collect();
        resting.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let mut book = Self::new(property_id);
        for order in resting {
            book.rest(order);
        }
        book
    }

    /// Queues an order at the back of its price level
    pub fn rest(&mut self, order: MarketOrder) {
        let price = order.price_per_share.amount();
        match order.side {
            OrderSide::Buy => self.bids.entry(Reverse(price)).or_default().push_back(order),
            OrderSide::Sell => self.asks.entry(price).or_default().push_back(order),
        }
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next().map(|Reverse(p)| *p)
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    /// Crosses `taker` with the opposite side while prices overlap
    ///
    /// Each fill executes at the resting order's price. Resting orders owned
    /// by the taker are skipped and keep their place in the queue. `taker`
    /// is updated in place; it is not added to the book.
    pub fn match_order(&mut self, taker: &mut MarketOrder) -> Result<Vec<Fill>, LedgerError> {
        let mut fills = Vec::new();
        let limit = taker.price_per_share.amount();

        match taker.side {
            OrderSide::Buy => {
                let prices: Vec<Decimal> = self.asks.keys().copied().take_while(|p| *p <= limit).collect();
                for price in prices {
                    if taker.remaining() == 0 {
                        break;
                    }
                    if let Some(level) = self.asks.get_mut(&price) {
                        fill_level(level, taker, &mut fills)?;
                        if level.is_empty() {
                            self.asks.remove(&price);
                        }
                    }
                }
            }
            OrderSide::Sell => {
                let prices: Vec<Decimal> = self
                    .bids
                    .keys()
                    .map(|Reverse(p)| *p)
                    .take_while(|p| *p >= limit)
                    .collect();
                for price in prices {
                    if taker.remaining() == 0 {
                        break;
                    }
                    if let Some(level) = self.bids.get_mut(&Reverse(price)) {
                        fill_level(level, taker, &mut fills)?;
                        if level.is_empty() {
                            self.bids.remove(&Reverse(price));
                        }
                    }
                }
            }
        }

        Ok(fills)
    }

    /// Aggregated depth, best prices first
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            property_id: self.property_id,
            bids: self.bids.values().filter_map(summarize).collect(),
            asks: self.asks.values().filter_map(summarize).collect(),
        }
    }
}

fn fill_level(level: &mut PriceLevel, taker: &mut MarketOrder, fills: &mut Vec<Fill>) -> Result<(), LedgerError> {
    let mut index = 0;
    while index < level.len() && taker.remaining() > 0 {
        if level[index].user_id == taker.user_id {
            index += 1;
            continue;
        }

        let maker = &mut level[index];
        let shares = taker.remaining().min(maker.remaining());
        maker.fill(shares)?;
        taker.fill(shares)?;

        let (buy, sell) = match taker.side {
            OrderSide::Buy => (&*taker, &*maker),
            OrderSide::Sell => (&*maker, &*taker),
        };
        let trade = Trade {
            id: TradeId::new_v7(),
            property_id: maker.property_id,
            buy_order_id: buy.id,
            sell_order_id: sell.id,
            buyer_id: buy.user_id,
            seller_id: sell.user_id,
            shares,
            price_per_share: maker.price_per_share,
            total: maker.notional(shares)?,
            executed_at: Utc::now(),
        };
        fills.push(Fill {
            trade,
            maker: maker.clone(),
        });

        if maker.remaining() == 0 {
            level.remove(index);
        } else {
            index += 1;
        }
    }
    Ok(())
}

fn summarize(level: &PriceLevel) -> Option<LevelSummary> {
    let first = level.front()?;
    Some(LevelSummary {
        price_per_share: first.price_per_share,
        shares: level.iter().map(|o| o.remaining()).sum(),
        orders: level.len(),
    })
}
