//! Wallet handlers

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Extension, Json,
};

use domain_ledger::{Actor, WalletReceipt};

use crate::dto::wallet::*;
use crate::handlers::idempotency_key;
use crate::{error::ApiError, AppState};

/// Credits the caller's wallet
pub async fn deposit(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Json(request): Json<WalletRequest>,
) -> Result<(StatusCode, Json<WalletReceipt>), ApiError> {
    let key = idempotency_key(&headers, request.idempotency_key)?;
    let receipt = state
        .services
        .wallet
        .deposit(actor.user_id, state.settings.money(request.amount), key)
        .await?;
    Ok((entry_status(&receipt), Json(receipt)))
}

/// Debits the caller's wallet
pub async fn withdraw(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Json(request): Json<WalletRequest>,
) -> Result<(StatusCode, Json<WalletReceipt>), ApiError> {
    let key = idempotency_key(&headers, request.idempotency_key)?;
    let receipt = state
        .services
        .wallet
        .withdraw(actor.user_id, state.settings.money(request.amount), key)
        .await?;
    Ok((entry_status(&receipt), Json(receipt)))
}

fn entry_status(receipt: &WalletReceipt) -> StatusCode {
    if receipt.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    }
}

/// The caller's balances and ledger history, newest first
pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<TransactionListResponse>, ApiError> {
    let profile = state.services.wallet.balance(actor.user_id).await?;
    let transactions = state.services.wallet.list_transactions(actor.user_id).await?;

    Ok(Json(TransactionListResponse {
        balance: profile.wallet_balance,
        reserved: profile.reserved_balance,
        transactions,
    }))
}
