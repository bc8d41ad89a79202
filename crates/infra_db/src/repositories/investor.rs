//! Investor profiles and KYC documents

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use core_kernel::{KycDocumentId, Money, UserId};
use domain_investor::{InvestorProfile, KycDocument};

use super::{parse_column, parse_currency, Lock};
use crate::error::DatabaseError;

const PROFILE_COLUMNS: &str =
    "user_id, kyc_status, wallet_balance, reserved_balance, currency, created_at, updated_at";

const KYC_COLUMNS: &str =
    "id, user_id, document_type, reference, status, reviewed_by, review_note, submitted_at, reviewed_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRow {
    pub user_id: Uuid,
    pub kyc_status: String,
    pub wallet_balance: Decimal,
    pub reserved_balance: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for InvestorProfile {
    type Error = DatabaseError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let currency = parse_currency(&row.currency)?;
        Ok(InvestorProfile {
            user_id: UserId::from_uuid(row.user_id),
            kyc_status: parse_column("kyc_status", &row.kyc_status)?,
            wallet_balance: Money::new(row.wallet_balance, currency),
            reserved_balance: Money::new(row.reserved_balance, currency),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KycDocumentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_type: String,
    pub reference: String,
    pub status: String,
    pub reviewed_by: Option<Uuid>,
    pub review_note: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl TryFrom<KycDocumentRow> for KycDocument {
    type Error = DatabaseError;

    fn try_from(row: KycDocumentRow) -> Result<Self, Self::Error> {
        Ok(KycDocument {
            id: KycDocumentId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            document_type: parse_column("document_type", &row.document_type)?,
            reference: row.reference,
            status: parse_column("status", &row.status)?,
            reviewed_by: row.reviewed_by.map(UserId::from_uuid),
            review_note: row.review_note,
            submitted_at: row.submitted_at,
            reviewed_at: row.reviewed_at,
        })
    }
}

pub async fn find_profile<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: UserId,
    lock: Lock,
) -> Result<Option<InvestorProfile>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM investor_profiles WHERE user_id = $1{}",
        PROFILE_COLUMNS,
        lock.clause()
    );
    sqlx::query_as::<_, ProfileRow>(&sql)
        .bind(*user_id.as_uuid())
        .fetch_optional(executor)
        .await?
        .map(InvestorProfile::try_from)
        .transpose()
}

pub async fn upsert_profile<'e, E: PgExecutor<'e>>(
    executor: E,
    profile: &InvestorProfile,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO investor_profiles (user_id, kyc_status, wallet_balance, reserved_balance, currency,
                                       created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (user_id) DO UPDATE
        SET kyc_status = EXCLUDED.kyc_status,
            wallet_balance = EXCLUDED.wallet_balance,
            reserved_balance = EXCLUDED.reserved_balance,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(*profile.user_id.as_uuid())
    .bind(profile.kyc_status.as_str())
    .bind(profile.wallet_balance.amount())
    .bind(profile.reserved_balance.amount())
    .bind(profile.currency().code())
    .bind(profile.created_at)
    .bind(profile.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_kyc_document<'e, E: PgExecutor<'e>>(
    executor: E,
    id: KycDocumentId,
    lock: Lock,
) -> Result<Option<KycDocument>, DatabaseError> {
    let sql = format!("SELECT {} FROM kyc_documents WHERE id = $1{}", KYC_COLUMNS, lock.clause());
    sqlx::query_as::<_, KycDocumentRow>(&sql)
        .bind(*id.as_uuid())
        .fetch_optional(executor)
        .await?
        .map(KycDocument::try_from)
        .transpose()
}

/// Oldest first
pub async fn list_kyc_documents<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: UserId,
) -> Result<Vec<KycDocument>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM kyc_documents WHERE user_id = $1 ORDER BY submitted_at",
        KYC_COLUMNS
    );
    sqlx::query_as::<_, KycDocumentRow>(&sql)
        .bind(*user_id.as_uuid())
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(KycDocument::try_from)
        .collect()
}

pub async fn upsert_kyc_document<'e, E: PgExecutor<'e>>(
    executor: E,
    document: &KycDocument,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO kyc_documents (id, user_id, document_type, reference, status, reviewed_by, review_note,
                                   submitted_at, reviewed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO UPDATE
        SET status = EXCLUDED.status,
            reviewed_by = EXCLUDED.reviewed_by,
            review_note = EXCLUDED.review_note,
            reviewed_at = EXCLUDED.reviewed_at
        "#,
    )
    .bind(*document.id.as_uuid())
    .bind(*document.user_id.as_uuid())
    .bind(document.document_type.as_str())
    .bind(&document.reference)
    .bind(document.status.as_str())
    .bind(document.reviewed_by.map(Uuid::from))
    .bind(&document.review_note)
    .bind(document.submitted_at)
    .bind(document.reviewed_at)
    .execute(executor)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_investor::{DocumentStatus, KycStatus};

    #[test]
    fn test_profile_row_shares_currency() {
        let now = Utc::now();
        let profile = InvestorProfile::try_from(ProfileRow {
            user_id: Uuid::new_v4(),
            kyc_status: "verified".to_string(),
            wallet_balance: Decimal::new(150000, 2),
            reserved_balance: Decimal::new(25000, 2),
            currency: "EUR".to_string(),
            created_at: now,
            updated_at: now,
        })
        .unwrap();

        assert_eq!(profile.kyc_status, KycStatus::Verified);
        assert_eq!(profile.wallet_balance.currency(), profile.reserved_balance.currency());
        assert_eq!(profile.reserved_balance.amount(), Decimal::new(25000, 2));
    }

    #[test]
    fn test_kyc_row_conversion() {
        let document = KycDocument::try_from(KycDocumentRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            document_type: "passport".to_string(),
            reference: "P1234567".to_string(),
            status: "pending".to_string(),
            reviewed_by: None,
            review_note: None,
            submitted_at: Utc::now(),
            reviewed_at: None,
        })
        .unwrap();

        assert_eq!(document.status, DocumentStatus::Pending);
        assert!(document.reviewed_by.is_none());
    }
}
