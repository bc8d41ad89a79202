//! Wallet DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::Money;
use domain_ledger::Transaction;

/// Deposit or withdrawal
#[derive(Debug, Deserialize)]
pub struct WalletRequest {
    pub amount: Decimal,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    /// Spendable balance
    pub balance: Money,
    /// Cash escrowed by open buy orders
    pub reserved: Money,
    pub transactions: Vec<Transaction>,
}
