//! Properties, SPVs, property documents and due diligence

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use core_kernel::{Money, PropertyId, SpvId};
use domain_property::{DueDiligence, Property, PropertyDocument, PropertyStatus, Spv};

use super::{parse_column, parse_currency, Lock};
use crate::error::DatabaseError;

const PROPERTY_COLUMNS: &str = "id, name, location, description, spv_id, total_shares, available_shares, \
     share_price, currency, status, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PropertyRow {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub description: Option<String>,
    pub spv_id: Option<Uuid>,
    pub total_shares: i64,
    pub available_shares: i64,
    pub share_price: Decimal,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PropertyRow> for Property {
    type Error = DatabaseError;

    fn try_from(row: PropertyRow) -> Result<Self, Self::Error> {
        Ok(Property {
            id: PropertyId::from_uuid(row.id),
            name: row.name,
            location: row.location,
            description: row.description,
            spv_id: row.spv_id.map(SpvId::from_uuid),
            total_shares: row.total_shares,
            available_shares: row.available_shares,
            share_price: Money::new(row.share_price, parse_currency(&row.currency)?),
            status: parse_column("status", &row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SpvRow {
    pub id: Uuid,
    pub name: String,
    pub registration_number: String,
    pub jurisdiction: String,
    pub created_at: DateTime<Utc>,
}

impl From<SpvRow> for Spv {
    fn from(row: SpvRow) -> Self {
        Spv {
            id: SpvId::from_uuid(row.id),
            name: row.name,
            registration_number: row.registration_number,
            jurisdiction: row.jurisdiction,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PropertyDocumentRow {
    pub id: Uuid,
    pub property_id: Uuid,
    pub kind: String,
    pub name: String,
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

impl TryFrom<PropertyDocumentRow> for PropertyDocument {
    type Error = DatabaseError;

    fn try_from(row: PropertyDocumentRow) -> Result<Self, Self::Error> {
        Ok(PropertyDocument {
            id: row.id.into(),
            property_id: PropertyId::from_uuid(row.property_id),
            kind: parse_column("kind", &row.kind)?,
            name: row.name,
            url: row.url,
            uploaded_at: row.uploaded_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DueDiligenceRow {
    pub property_id: Uuid,
    pub valuation: Decimal,
    pub currency: String,
    pub legal_status: String,
    pub reviewed_by: String,
    pub completed_on: NaiveDate,
    pub risk_notes: Option<String>,
}

impl TryFrom<DueDiligenceRow> for DueDiligence {
    type Error = DatabaseError;

    fn try_from(row: DueDiligenceRow) -> Result<Self, Self::Error> {
        Ok(DueDiligence {
            property_id: PropertyId::from_uuid(row.property_id),
            valuation: Money::new(row.valuation, parse_currency(&row.currency)?),
            legal_status: row.legal_status,
            reviewed_by: row.reviewed_by,
            completed_on: row.completed_on,
            risk_notes: row.risk_notes,
        })
    }
}

pub async fn find_property<'e, E: PgExecutor<'e>>(
    executor: E,
    id: PropertyId,
    lock: Lock,
) -> Result<Option<Property>, DatabaseError> {
    let sql = format!("SELECT {} FROM properties WHERE id = $1{}", PROPERTY_COLUMNS, lock.clause());
    sqlx::query_as::<_, PropertyRow>(&sql)
        .bind(*id.as_uuid())
        .fetch_optional(executor)
        .await?
        .map(Property::try_from)
        .transpose()
}

pub async fn list_properties<'e, E: PgExecutor<'e>>(
    executor: E,
    status: Option<PropertyStatus>,
) -> Result<Vec<Property>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM properties WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY created_at DESC",
        PROPERTY_COLUMNS
    );
    sqlx::query_as::<_, PropertyRow>(&sql)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(Property::try_from)
        .collect()
}

pub async fn insert_property<'e, E: PgExecutor<'e>>(executor: E, property: &Property) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO properties (id, name, location, description, spv_id, total_shares, available_shares,
                                share_price, currency, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(*property.id.as_uuid())
    .bind(&property.name)
    .bind(&property.location)
    .bind(&property.description)
    .bind(property.spv_id.map(Uuid::from))
    .bind(property.total_shares)
    .bind(property.available_shares)
    .bind(property.share_price.amount())
    .bind(property.share_price.currency().code())
    .bind(property.status.as_str())
    .bind(property.created_at)
    .bind(property.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Updates descriptive fields and status; inventory columns are untouched
pub async fn update_property<'e, E: PgExecutor<'e>>(executor: E, property: &Property) -> Result<(), DatabaseError> {
    let result = sqlx::query(
        r#"
        UPDATE properties
        SET name = $2, location = $3, description = $4, spv_id = $5, share_price = $6,
            status = $7, updated_at = $8
        WHERE id = $1
        "#,
    )
    .bind(*property.id.as_uuid())
    .bind(&property.name)
    .bind(&property.location)
    .bind(&property.description)
    .bind(property.spv_id.map(Uuid::from))
    .bind(property.share_price.amount())
    .bind(property.status.as_str())
    .bind(property.updated_at)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Property", property.id));
    }
    Ok(())
}

/// Takes shares while the property is active and has enough left
pub async fn reserve_shares<'e, E: PgExecutor<'e>>(
    executor: E,
    id: PropertyId,
    shares: i64,
) -> Result<Option<Property>, DatabaseError> {
    let sql = format!(
        r#"
        UPDATE properties
        SET available_shares = available_shares - $2,
            status = CASE WHEN available_shares - $2 = 0 THEN 'funded' ELSE status END,
            updated_at = NOW()
        WHERE id = $1 AND status = 'active' AND available_shares >= $2
        RETURNING {}
        "#,
        PROPERTY_COLUMNS
    );
    sqlx::query_as::<_, PropertyRow>(&sql)
        .bind(*id.as_uuid())
        .bind(shares)
        .fetch_optional(executor)
        .await?
        .map(Property::try_from)
        .transpose()
}

/// Returns shares while the property is active or funded and stays within
/// its total supply
pub async fn release_shares<'e, E: PgExecutor<'e>>(
    executor: E,
    id: PropertyId,
    shares: i64,
) -> Result<Option<Property>, DatabaseError> {
    let sql = format!(
        r#"
        UPDATE properties
        SET available_shares = available_shares + $2,
            status = CASE WHEN status = 'funded' THEN 'active' ELSE status END,
            updated_at = NOW()
        WHERE id = $1 AND status IN ('active', 'funded') AND available_shares + $2 <= total_shares
        RETURNING {}
        "#,
        PROPERTY_COLUMNS
    );
    sqlx::query_as::<_, PropertyRow>(&sql)
        .bind(*id.as_uuid())
        .bind(shares)
        .fetch_optional(executor)
        .await?
        .map(Property::try_from)
        .transpose()
}

pub async fn insert_spv<'e, E: PgExecutor<'e>>(executor: E, spv: &Spv) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO spvs (id, name, registration_number, jurisdiction, created_at) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(*spv.id.as_uuid())
    .bind(&spv.name)
    .bind(&spv.registration_number)
    .bind(&spv.jurisdiction)
    .bind(spv.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_spv<'e, E: PgExecutor<'e>>(executor: E, id: SpvId) -> Result<Option<Spv>, DatabaseError> {
    let row = sqlx::query_as::<_, SpvRow>(
        "SELECT id, name, registration_number, jurisdiction, created_at FROM spvs WHERE id = $1",
    )
    .bind(*id.as_uuid())
    .fetch_optional(executor)
    .await?;
    Ok(row.map(Spv::from))
}

pub async fn insert_document<'e, E: PgExecutor<'e>>(
    executor: E,
    document: &PropertyDocument,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO property_documents (id, property_id, kind, name, url, uploaded_at) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(*document.id.as_uuid())
    .bind(*document.property_id.as_uuid())
    .bind(document.kind.as_str())
    .bind(&document.name)
    .bind(&document.url)
    .bind(document.uploaded_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn list_documents<'e, E: PgExecutor<'e>>(
    executor: E,
    property_id: PropertyId,
) -> Result<Vec<PropertyDocument>, DatabaseError> {
    sqlx::query_as::<_, PropertyDocumentRow>(
        r#"
        SELECT id, property_id, kind, name, url, uploaded_at
        FROM property_documents
        WHERE property_id = $1
        ORDER BY uploaded_at
        "#,
    )
    .bind(*property_id.as_uuid())
    .fetch_all(executor)
    .await?
    .into_iter()
    .map(PropertyDocument::try_from)
    .collect()
}

pub async fn upsert_due_diligence<'e, E: PgExecutor<'e>>(
    executor: E,
    report: &DueDiligence,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO due_diligence (property_id, valuation, currency, legal_status, reviewed_by, completed_on, risk_notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (property_id) DO UPDATE
        SET valuation = EXCLUDED.valuation,
            currency = EXCLUDED.currency,
            legal_status = EXCLUDED.legal_status,
            reviewed_by = EXCLUDED.reviewed_by,
            completed_on = EXCLUDED.completed_on,
            risk_notes = EXCLUDED.risk_notes
        "#,
    )
    .bind(*report.property_id.as_uuid())
    .bind(report.valuation.amount())
    .bind(report.valuation.currency().code())
    .bind(&report.legal_status)
    .bind(&report.reviewed_by)
    .bind(report.completed_on)
    .bind(&report.risk_notes)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_due_diligence<'e, E: PgExecutor<'e>>(
    executor: E,
    property_id: PropertyId,
) -> Result<Option<DueDiligence>, DatabaseError> {
    sqlx::query_as::<_, DueDiligenceRow>(
        r#"
        SELECT property_id, valuation, currency, legal_status, reviewed_by, completed_on, risk_notes
        FROM due_diligence
        WHERE property_id = $1
        "#,
    )
    .bind(*property_id.as_uuid())
    .fetch_optional(executor)
    .await?
    .map(DueDiligence::try_from)
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> PropertyRow {
        let now = Utc::now();
        PropertyRow {
            id: Uuid::new_v4(),
            name: "Harbour View".to_string(),
            location: "Sydney".to_string(),
            description: None,
            spv_id: None,
            total_shares: 100,
            available_shares: 40,
            share_price: Decimal::new(50000, 0),
            currency: "USD".to_string(),
            status: status.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_property_row_conversion() {
        let property = Property::try_from(row("active")).unwrap();
        assert_eq!(property.status, PropertyStatus::Active);
        assert_eq!(property.sold_shares(), 60);
        assert_eq!(property.share_price.currency().code(), "USD");
    }

    #[test]
    fn test_unknown_status_fails() {
        let err = Property::try_from(row("frozen")).unwrap_err();
        assert!(matches!(err, DatabaseError::SerializationError(_)));
    }
}
