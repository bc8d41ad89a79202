//! Dividend handlers

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use uuid::Uuid;

use core_kernel::PropertyId;
use domain_ledger::{Actor, DividendDistribution, DividendReceipt};

use crate::dto::dividend::*;
use crate::handlers::idempotency_key;
use crate::{error::ApiError, AppState};

/// Splits a cash amount across the property's holders
pub async fn distribute(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<DistributeRequest>,
) -> Result<(StatusCode, Json<DividendReceipt>), ApiError> {
    let key = idempotency_key(&headers, request.idempotency_key)?;
    let receipt = state
        .services
        .dividends
        .distribute(&actor, PropertyId::from_uuid(id), state.settings.money(request.amount), key)
        .await?;

    let status = if receipt.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(receipt)))
}

/// Past distributions for a property
pub async fn list_dividends(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<DividendDistribution>>, ApiError> {
    let distributions = state
        .services
        .dividends
        .list(PropertyId::from_uuid(id))
        .await?;
    Ok(Json(distributions))
}
