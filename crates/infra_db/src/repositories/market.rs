//! Secondary market orders and trades

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use core_kernel::{MarketOrderId, Money, PropertyId, TradeId, UserId};
use domain_ledger::{MarketOrder, OrderSide, Trade};

use super::{parse_column, parse_currency, Lock};
use crate::error::DatabaseError;

const ORDER_COLUMNS: &str = "id, user_id, property_id, side, shares, filled_shares, price_per_share, currency, \
     status, idempotency_key, created_at, updated_at";

const TRADE_COLUMNS: &str = "id, property_id, buy_order_id, sell_order_id, buyer_id, seller_id, shares, \
     price_per_share, total, currency, executed_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub property_id: Uuid,
    pub side: String,
    pub shares: i64,
    pub filled_shares: i64,
    pub price_per_share: Decimal,
    pub currency: String,
    pub status: String,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for MarketOrder {
    type Error = DatabaseError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(MarketOrder {
            id: MarketOrderId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            property_id: PropertyId::from_uuid(row.property_id),
            side: parse_column("side", &row.side)?,
            shares: row.shares,
            filled_shares: row.filled_shares,
            price_per_share: Money::new(row.price_per_share, parse_currency(&row.currency)?),
            status: parse_column("status", &row.status)?,
            idempotency_key: row.idempotency_key,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TradeRow {
    pub id: Uuid,
    pub property_id: Uuid,
    pub buy_order_id: Uuid,
    pub sell_order_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub shares: i64,
    pub price_per_share: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub executed_at: DateTime<Utc>,
}

impl TryFrom<TradeRow> for Trade {
    type Error = DatabaseError;

    fn try_from(row: TradeRow) -> Result<Self, Self::Error> {
        let currency = parse_currency(&row.currency)?;
        Ok(Trade {
            id: TradeId::from_uuid(row.id),
            property_id: PropertyId::from_uuid(row.property_id),
            buy_order_id: MarketOrderId::from_uuid(row.buy_order_id),
            sell_order_id: MarketOrderId::from_uuid(row.sell_order_id),
            buyer_id: UserId::from_uuid(row.buyer_id),
            seller_id: UserId::from_uuid(row.seller_id),
            shares: row.shares,
            price_per_share: Money::new(row.price_per_share, currency),
            total: Money::new(row.total, currency),
            executed_at: row.executed_at,
        })
    }
}

pub async fn find_order<'e, E: PgExecutor<'e>>(
    executor: E,
    id: MarketOrderId,
    lock: Lock,
) -> Result<Option<MarketOrder>, DatabaseError> {
    let sql = format!("SELECT {} FROM market_orders WHERE id = $1{}", ORDER_COLUMNS, lock.clause());
    sqlx::query_as::<_, OrderRow>(&sql)
        .bind(*id.as_uuid())
        .fetch_optional(executor)
        .await?
        .map(MarketOrder::try_from)
        .transpose()
}

pub async fn find_order_by_key<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: UserId,
    key: &str,
) -> Result<Option<MarketOrder>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM market_orders WHERE user_id = $1 AND idempotency_key = $2",
        ORDER_COLUMNS
    );
    sqlx::query_as::<_, OrderRow>(&sql)
        .bind(*user_id.as_uuid())
        .bind(key)
        .fetch_optional(executor)
        .await?
        .map(MarketOrder::try_from)
        .transpose()
}

pub async fn list_user_orders<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: UserId,
) -> Result<Vec<MarketOrder>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM market_orders WHERE user_id = $1 ORDER BY created_at DESC",
        ORDER_COLUMNS
    );
    sqlx::query_as::<_, OrderRow>(&sql)
        .bind(*user_id.as_uuid())
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(MarketOrder::try_from)
        .collect()
}

/// Resting orders of a property, one side or both, in arrival order
pub async fn list_open_orders<'e, E: PgExecutor<'e>>(
    executor: E,
    property_id: PropertyId,
    side: Option<OrderSide>,
    lock: Lock,
) -> Result<Vec<MarketOrder>, DatabaseError> {
    let sql = format!(
        r#"
        SELECT {} FROM market_orders
        WHERE property_id = $1
          AND ($2::TEXT IS NULL OR side = $2)
          AND status IN ('open', 'partially_filled')
        ORDER BY created_at, id{}
        "#,
        ORDER_COLUMNS,
        lock.clause()
    );
    sqlx::query_as::<_, OrderRow>(&sql)
        .bind(*property_id.as_uuid())
        .bind(side.map(|s| s.as_str()))
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(MarketOrder::try_from)
        .collect()
}

pub async fn upsert_order<'e, E: PgExecutor<'e>>(executor: E, order: &MarketOrder) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO market_orders (id, user_id, property_id, side, shares, filled_shares, price_per_share,
                                   currency, status, idempotency_key, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (id) DO UPDATE
        SET filled_shares = EXCLUDED.filled_shares,
            status = EXCLUDED.status,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(*order.id.as_uuid())
    .bind(*order.user_id.as_uuid())
    .bind(*order.property_id.as_uuid())
    .bind(order.side.as_str())
    .bind(order.shares)
    .bind(order.filled_shares)
    .bind(order.price_per_share.amount())
    .bind(order.price_per_share.currency().code())
    .bind(order.status.as_str())
    .bind(&order.idempotency_key)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn insert_trade<'e, E: PgExecutor<'e>>(executor: E, trade: &Trade) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO trades (id, property_id, buy_order_id, sell_order_id, buyer_id, seller_id, shares,
                            price_per_share, total, currency, executed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(*trade.id.as_uuid())
    .bind(*trade.property_id.as_uuid())
    .bind(*trade.buy_order_id.as_uuid())
    .bind(*trade.sell_order_id.as_uuid())
    .bind(*trade.buyer_id.as_uuid())
    .bind(*trade.seller_id.as_uuid())
    .bind(trade.shares)
    .bind(trade.price_per_share.amount())
    .bind(trade.total.amount())
    .bind(trade.total.currency().code())
    .bind(trade.executed_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn list_trades<'e, E: PgExecutor<'e>>(
    executor: E,
    property_id: PropertyId,
) -> Result<Vec<Trade>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM trades WHERE property_id = $1 ORDER BY executed_at DESC",
        TRADE_COLUMNS
    );
    sqlx::query_as::<_, TradeRow>(&sql)
        .bind(*property_id.as_uuid())
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(Trade::try_from)
        .collect()
}
