//! Secondary market: limit orders between investors
//!
//! Orders are matched with price-time priority at the resting order's price.
//! Buy orders escrow cash and sell orders lock shares when placed, so a match
//! can always settle.

pub mod order;
pub mod book;
pub mod trade;

pub use order::{MarketOrder, OrderSide, OrderStatus};
pub use book::{BookSnapshot, Fill, LevelSummary, OrderBook};
pub use trade::Trade;
