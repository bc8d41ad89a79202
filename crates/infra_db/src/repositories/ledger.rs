//! Positions, the transaction journal and dividend distributions

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use core_kernel::{DividendId, InvestmentId, Money, PropertyId, TransactionId, UserId};
use domain_ledger::{DividendDistribution, Investment, Transaction};

use super::{parse_column, parse_currency, Lock};
use crate::error::DatabaseError;

const INVESTMENT_COLUMNS: &str = "id, user_id, property_id, shares_owned, shares_listed, total_invested, \
     average_buy_price, currency, status, created_at, updated_at";

const TRANSACTION_COLUMNS: &str = "id, user_id, transaction_type, amount, fee, currency, status, payment_method, \
     property_id, shares, idempotency_key, reference, created_at, completed_at";

const DIVIDEND_COLUMNS: &str = "id, property_id, total_amount, per_share_amount, currency, recipients, \
     idempotency_key, distributed_by, created_at";

// ----------------------------------------------------------------------
// Investments
// ----------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvestmentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub property_id: Uuid,
    pub shares_owned: i64,
    pub shares_listed: i64,
    pub total_invested: Decimal,
    pub average_buy_price: Decimal,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<InvestmentRow> for Investment {
    type Error = DatabaseError;

    fn try_from(row: InvestmentRow) -> Result<Self, Self::Error> {
        let currency = parse_currency(&row.currency)?;
        Ok(Investment {
            id: InvestmentId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            property_id: PropertyId::from_uuid(row.property_id),
            shares_owned: row.shares_owned,
            shares_listed: row.shares_listed,
            total_invested: Money::new(row.total_invested, currency),
            average_buy_price: Money::new(row.average_buy_price, currency),
            status: parse_column("status", &row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub async fn find_investment<'e, E: PgExecutor<'e>>(
    executor: E,
    id: InvestmentId,
    lock: Lock,
) -> Result<Option<Investment>, DatabaseError> {
    let sql = format!("SELECT {} FROM investments WHERE id = $1{}", INVESTMENT_COLUMNS, lock.clause());
    sqlx::query_as::<_, InvestmentRow>(&sql)
        .bind(*id.as_uuid())
        .fetch_optional(executor)
        .await?
        .map(Investment::try_from)
        .transpose()
}

pub async fn find_position<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: UserId,
    property_id: PropertyId,
    lock: Lock,
) -> Result<Option<Investment>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM investments WHERE user_id = $1 AND property_id = $2{}",
        INVESTMENT_COLUMNS,
        lock.clause()
    );
    sqlx::query_as::<_, InvestmentRow>(&sql)
        .bind(*user_id.as_uuid())
        .bind(*property_id.as_uuid())
        .fetch_optional(executor)
        .await?
        .map(Investment::try_from)
        .transpose()
}

pub async fn list_user_investments<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: UserId,
) -> Result<Vec<Investment>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM investments WHERE user_id = $1 ORDER BY created_at DESC",
        INVESTMENT_COLUMNS
    );
    sqlx::query_as::<_, InvestmentRow>(&sql)
        .bind(*user_id.as_uuid())
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(Investment::try_from)
        .collect()
}

/// Positions in one property ordered by holder, optionally locked
pub async fn list_property_investments<'e, E: PgExecutor<'e>>(
    executor: E,
    property_id: PropertyId,
    lock: Lock,
) -> Result<Vec<Investment>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM investments WHERE property_id = $1 ORDER BY user_id{}",
        INVESTMENT_COLUMNS,
        lock.clause()
    );
    sqlx::query_as::<_, InvestmentRow>(&sql)
        .bind(*property_id.as_uuid())
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(Investment::try_from)
        .collect()
}

/// Inserts or updates a position
///
/// A second position for the same user and property violates
/// `investments_user_property_key` and surfaces as a duplicate entry.
pub async fn upsert_investment<'e, E: PgExecutor<'e>>(
    executor: E,
    investment: &Investment,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO investments (id, user_id, property_id, shares_owned, shares_listed, total_invested,
                                 average_buy_price, currency, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (id) DO UPDATE
        SET shares_owned = EXCLUDED.shares_owned,
            shares_listed = EXCLUDED.shares_listed,
            total_invested = EXCLUDED.total_invested,
            average_buy_price = EXCLUDED.average_buy_price,
            status = EXCLUDED.status,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(*investment.id.as_uuid())
    .bind(*investment.user_id.as_uuid())
    .bind(*investment.property_id.as_uuid())
    .bind(investment.shares_owned)
    .bind(investment.shares_listed)
    .bind(investment.total_invested.amount())
    .bind(investment.average_buy_price.amount())
    .bind(investment.total_invested.currency().code())
    .bind(investment.status.as_str())
    .bind(investment.created_at)
    .bind(investment.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

// ----------------------------------------------------------------------
// Transactions
// ----------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub transaction_type: String,
    pub amount: Decimal,
    pub fee: Decimal,
    pub currency: String,
    pub status: String,
    pub payment_method: Option<String>,
    pub property_id: Option<Uuid>,
    pub shares: Option<i64>,
    pub idempotency_key: Option<String>,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DatabaseError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let currency = parse_currency(&row.currency)?;
        let payment_method = row
            .payment_method
            .as_deref()
            .map(|value| parse_column("payment_method", value))
            .transpose()?;

        Ok(Transaction {
            id: TransactionId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            transaction_type: parse_column("transaction_type", &row.transaction_type)?,
            amount: Money::new(row.amount, currency),
            fee: Money::new(row.fee, currency),
            status: parse_column("status", &row.status)?,
            payment_method,
            property_id: row.property_id.map(PropertyId::from_uuid),
            shares: row.shares,
            idempotency_key: row.idempotency_key,
            reference: row.reference,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

pub async fn find_transaction<'e, E: PgExecutor<'e>>(
    executor: E,
    id: TransactionId,
    lock: Lock,
) -> Result<Option<Transaction>, DatabaseError> {
    let sql = format!("SELECT {} FROM transactions WHERE id = $1{}", TRANSACTION_COLUMNS, lock.clause());
    sqlx::query_as::<_, TransactionRow>(&sql)
        .bind(*id.as_uuid())
        .fetch_optional(executor)
        .await?
        .map(Transaction::try_from)
        .transpose()
}

pub async fn find_transaction_by_key<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: UserId,
    key: &str,
) -> Result<Option<Transaction>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM transactions WHERE user_id = $1 AND idempotency_key = $2",
        TRANSACTION_COLUMNS
    );
    sqlx::query_as::<_, TransactionRow>(&sql)
        .bind(*user_id.as_uuid())
        .bind(key)
        .fetch_optional(executor)
        .await?
        .map(Transaction::try_from)
        .transpose()
}

pub async fn list_transactions<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: UserId,
) -> Result<Vec<Transaction>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM transactions WHERE user_id = $1 ORDER BY created_at DESC",
        TRANSACTION_COLUMNS
    );
    sqlx::query_as::<_, TransactionRow>(&sql)
        .bind(*user_id.as_uuid())
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(Transaction::try_from)
        .collect()
}

pub async fn insert_transaction<'e, E: PgExecutor<'e>>(
    executor: E,
    transaction: &Transaction,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO transactions (id, user_id, transaction_type, amount, fee, currency, status, payment_method,
                                  property_id, shares, idempotency_key, reference, created_at, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(*transaction.id.as_uuid())
    .bind(*transaction.user_id.as_uuid())
    .bind(transaction.transaction_type.as_str())
    .bind(transaction.amount.amount())
    .bind(transaction.fee.amount())
    .bind(transaction.amount.currency().code())
    .bind(transaction.status.as_str())
    .bind(transaction.payment_method.map(|m| m.as_str()))
    .bind(transaction.property_id.map(Uuid::from))
    .bind(transaction.shares)
    .bind(&transaction.idempotency_key)
    .bind(&transaction.reference)
    .bind(transaction.created_at)
    .bind(transaction.completed_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Persists the status of a pending transaction
pub async fn update_transaction_status<'e, E: PgExecutor<'e>>(
    executor: E,
    transaction: &Transaction,
) -> Result<(), DatabaseError> {
    let result = sqlx::query("UPDATE transactions SET status = $2, completed_at = $3 WHERE id = $1")
        .bind(*transaction.id.as_uuid())
        .bind(transaction.status.as_str())
        .bind(transaction.completed_at)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Transaction", transaction.id));
    }
    Ok(())
}

// ----------------------------------------------------------------------
// Dividends
// ----------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DividendRow {
    pub id: Uuid,
    pub property_id: Uuid,
    pub total_amount: Decimal,
    pub per_share_amount: Decimal,
    pub currency: String,
    pub recipients: i64,
    pub idempotency_key: String,
    pub distributed_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DividendRow> for DividendDistribution {
    type Error = DatabaseError;

    fn try_from(row: DividendRow) -> Result<Self, Self::Error> {
        let currency = parse_currency(&row.currency)?;
        Ok(DividendDistribution {
            id: DividendId::from_uuid(row.id),
            property_id: PropertyId::from_uuid(row.property_id),
            total_amount: Money::new(row.total_amount, currency),
            per_share_amount: Money::new(row.per_share_amount, currency),
            recipients: row.recipients,
            idempotency_key: row.idempotency_key,
            distributed_by: UserId::from_uuid(row.distributed_by),
            created_at: row.created_at,
        })
    }
}

pub async fn find_dividend_by_key<'e, E: PgExecutor<'e>>(
    executor: E,
    property_id: PropertyId,
    key: &str,
) -> Result<Option<DividendDistribution>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM dividend_distributions WHERE property_id = $1 AND idempotency_key = $2",
        DIVIDEND_COLUMNS
    );
    sqlx::query_as::<_, DividendRow>(&sql)
        .bind(*property_id.as_uuid())
        .bind(key)
        .fetch_optional(executor)
        .await?
        .map(DividendDistribution::try_from)
        .transpose()
}

pub async fn list_dividends<'e, E: PgExecutor<'e>>(
    executor: E,
    property_id: PropertyId,
) -> Result<Vec<DividendDistribution>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM dividend_distributions WHERE property_id = $1 ORDER BY created_at DESC",
        DIVIDEND_COLUMNS
    );
    sqlx::query_as::<_, DividendRow>(&sql)
        .bind(*property_id.as_uuid())
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(DividendDistribution::try_from)
        .collect()
}

pub async fn insert_dividend<'e, E: PgExecutor<'e>>(
    executor: E,
    distribution: &DividendDistribution,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO dividend_distributions (id, property_id, total_amount, per_share_amount, currency,
                                            recipients, idempotency_key, distributed_by, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(*distribution.id.as_uuid())
    .bind(*distribution.property_id.as_uuid())
    .bind(distribution.total_amount.amount())
    .bind(distribution.per_share_amount.amount())
    .bind(distribution.total_amount.currency().code())
    .bind(distribution.recipients)
    .bind(&distribution.idempotency_key)
    .bind(*distribution.distributed_by.as_uuid())
    .bind(distribution.created_at)
    .execute(executor)
    .await?;
    Ok(())
}
