//! Property documents and due diligence
//!
//! Read-only material shown alongside a property: legal documents uploaded
//! by admins and the due diligence summary.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{CoreError, Money, PropertyDocumentId, PropertyId};
use crate::error::PropertyError;
use crate::property::Property;
use crate::spv::Spv;

/// Kind of property document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    TitleDeed,
    Valuation,
    LegalOpinion,
    TenancyAgreement,
    FinancialProjection,
    Other,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::TitleDeed => "title_deed",
            DocumentKind::Valuation => "valuation",
            DocumentKind::LegalOpinion => "legal_opinion",
            DocumentKind::TenancyAgreement => "tenancy_agreement",
            DocumentKind::FinancialProjection => "financial_projection",
            DocumentKind::Other => "other",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title_deed" => Ok(DocumentKind::TitleDeed),
            "valuation" => Ok(DocumentKind::Valuation),
            "legal_opinion" => Ok(DocumentKind::LegalOpinion),
            "tenancy_agreement" => Ok(DocumentKind::TenancyAgreement),
            "financial_projection" => Ok(DocumentKind::FinancialProjection),
            "other" => Ok(DocumentKind::Other),
            other => Err(CoreError::unknown_variant("document_kind", other)),
        }
    }
}

/// A document attached to a property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDocument {
    pub id: PropertyDocumentId,
    pub property_id: PropertyId,
    pub kind: DocumentKind,
    pub name: String,
    /// Storage location of the file
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

impl PropertyDocument {
    pub fn new(
        property_id: PropertyId,
        kind: DocumentKind,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<Self, PropertyError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(PropertyError::invalid("Document url is required"));
        }

        Ok(Self {
            id: PropertyDocumentId::new_v7(),
            property_id,
            kind,
            name: name.into(),
            url,
            uploaded_at: Utc::now(),
        })
    }
}

/// Due diligence summary for a property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueDiligence {
    pub property_id: PropertyId,
    /// Independent valuation of the whole property
    pub valuation: Money,
    /// Outcome of the title / legal review
    pub legal_status: String,
    /// Firm or person that performed the review
    pub reviewed_by: String,
    pub completed_on: NaiveDate,
    pub risk_notes: Option<String>,
}

/// Everything the property page shows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDetails {
    pub property: Property,
    pub documents: Vec<PropertyDocument>,
    pub spv: Option<Spv>,
    pub due_diligence: Option<DueDiligence>,
}
