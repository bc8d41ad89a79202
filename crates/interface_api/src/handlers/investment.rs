//! Investment handlers

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use uuid::Uuid;

use core_kernel::{InvestmentId, PropertyId, TransactionId};
use domain_ledger::{
    Actor, InvestRequest, InvestmentReceipt, PaymentMethod, Portfolio, Quote, Transaction,
};

use crate::dto::investment::*;
use crate::dto::parse_enum;
use crate::handlers::{idempotency_key, validated};
use crate::{error::ApiError, AppState};

/// Prices a purchase without changing anything
pub async fn quote(
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<Quote>, ApiError> {
    let query = validated(query)?;
    let quote = state
        .services
        .investments
        .quote(PropertyId::from_uuid(query.property_id), query.shares)
        .await?;
    Ok(Json(quote))
}

/// Buys shares on the primary market
///
/// Returns 201 for a new purchase and 200 when the idempotency key replays
/// an earlier one.
pub async fn invest(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Json(request): Json<InvestRequestBody>,
) -> Result<(StatusCode, Json<InvestmentReceipt>), ApiError> {
    let request = validated(request)?;
    let idempotency_key = idempotency_key(&headers, request.idempotency_key)?;
    let payment_method = parse_enum::<PaymentMethod>("payment_method", &request.payment_method)?;

    let receipt = state
        .services
        .investments
        .invest(InvestRequest {
            user_id: actor.user_id,
            property_id: PropertyId::from_uuid(request.property_id),
            shares: request.shares,
            total_amount: state.settings.money(request.total_amount),
            payment_method,
            idempotency_key,
        })
        .await?;

    let status = if receipt.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(receipt)))
}

/// The caller's holdings valued at current share prices
pub async fn portfolio(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Portfolio>, ApiError> {
    let portfolio = state.services.investments.portfolio(actor.user_id).await?;
    Ok(Json(portfolio))
}

/// Settles or fails a pending bank-transfer purchase
pub async fn confirm_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<Json<Transaction>, ApiError> {
    let transaction = state
        .services
        .investments
        .confirm_payment(&actor, TransactionId::from_uuid(id), request.outcome)
        .await?;
    Ok(Json(transaction))
}

/// Returns shares to the primary inventory and refunds their cost
pub async fn refund_investment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<RefundRequest>,
) -> Result<Json<Transaction>, ApiError> {
    let request = validated(request)?;
    let transaction = state
        .services
        .investments
        .refund_investment(&actor, InvestmentId::from_uuid(id), request.shares)
        .await?;
    Ok(Json(transaction))
}
