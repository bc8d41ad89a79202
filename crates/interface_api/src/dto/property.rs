//! Property DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::Money;
use domain_property::{DueDiligence, Property, PropertyDetails, PropertyDocument, Spv};

#[derive(Debug, Deserialize)]
pub struct ListPropertiesQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePropertyRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub location: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub total_shares: i64,
    pub share_price: Decimal,
    #[validate(nested)]
    pub spv: Option<CreateSpvRequest>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSpvRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub registration_number: String,
    #[validate(length(min = 1, max = 100))]
    pub jurisdiction: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddDocumentRequest {
    pub kind: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(url)]
    pub url: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DueDiligenceRequest {
    pub valuation: Decimal,
    #[validate(length(min = 1, max = 500))]
    pub legal_status: String,
    #[validate(length(min = 1, max = 200))]
    pub reviewed_by: String,
    pub completed_on: NaiveDate,
    #[validate(length(max = 5000))]
    pub risk_notes: Option<String>,
}

/// A property as shown to investors
#[derive(Debug, Serialize)]
pub struct PropertyResponse {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub description: Option<String>,
    pub status: String,
    pub total_shares: i64,
    pub available_shares: i64,
    pub sold_shares: i64,
    /// Percent of the supply sold
    pub funding_progress: Decimal,
    pub share_price: Money,
    pub spv_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Property> for PropertyResponse {
    fn from(property: Property) -> Self {
        Self {
            id: property.id.into(),
            sold_shares: property.sold_shares(),
            funding_progress: property.funding_progress(),
            status: property.status.as_str().to_string(),
            spv_id: property.spv_id.map(Into::into),
            name: property.name,
            location: property.location,
            description: property.description,
            total_shares: property.total_shares,
            available_shares: property.available_shares,
            share_price: property.share_price,
            created_at: property.created_at,
            updated_at: property.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PropertyDetailsResponse {
    #[serde(flatten)]
    pub property: PropertyResponse,
    pub documents: Vec<PropertyDocument>,
    pub spv: Option<Spv>,
    pub due_diligence: Option<DueDiligence>,
}

impl From<PropertyDetails> for PropertyDetailsResponse {
    fn from(details: PropertyDetails) -> Self {
        Self {
            property: details.property.into(),
            documents: details.documents,
            spv: details.spv,
            due_diligence: details.due_diligence,
        }
    }
}
