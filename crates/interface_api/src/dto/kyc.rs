//! KYC DTOs

use serde::Deserialize;
use validator::Validate;

use domain_investor::ReviewDecision;

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitDocumentRequest {
    pub document_type: String,
    /// Storage reference of the uploaded file
    #[validate(length(min = 1, max = 500))]
    pub reference: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewDocumentRequest {
    pub decision: ReviewDecision,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}
