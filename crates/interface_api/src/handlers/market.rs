//! Secondary market handlers

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use uuid::Uuid;

use core_kernel::{MarketOrderId, PropertyId};
use domain_ledger::{Actor, BookSnapshot, MarketOrder, OrderReceipt, PlaceOrder, Trade};

use crate::dto::market::*;
use crate::handlers::{idempotency_key, validated};
use crate::{error::ApiError, AppState};

/// Places a limit order and matches it against the book
pub async fn place_order(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderReceipt>), ApiError> {
    let request = validated(request)?;
    let key = idempotency_key(&headers, request.idempotency_key)?;

    let receipt = state
        .services
        .market
        .place_order(PlaceOrder {
            user_id: actor.user_id,
            property_id: PropertyId::from_uuid(request.property_id),
            side: request.side,
            shares: request.shares,
            price_per_share: request.price_per_share,
            idempotency_key: key,
        })
        .await?;

    let status = if receipt.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(receipt)))
}

/// Cancels the remainder of an open order
pub async fn cancel_order(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<MarketOrder>, ApiError> {
    let order = state
        .services
        .market
        .cancel_order(&actor, MarketOrderId::from_uuid(id))
        .await?;
    Ok(Json(order))
}

/// The caller's orders
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<MarketOrder>>, ApiError> {
    let orders = state.services.market.list_orders(actor.user_id).await?;
    Ok(Json(orders))
}

/// Aggregated bids and asks for a property
pub async fn order_book(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookSnapshot>, ApiError> {
    let book = state
        .services
        .market
        .order_book(PropertyId::from_uuid(id))
        .await?;
    Ok(Json(book))
}

/// Executed trades for a property
pub async fn list_trades(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Trade>>, ApiError> {
    let trades = state
        .services
        .market
        .list_trades(PropertyId::from_uuid(id))
        .await?;
    Ok(Json(trades))
}
