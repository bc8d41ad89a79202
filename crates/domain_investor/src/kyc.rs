//! KYC (Know Your Customer) documents and status aggregation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use core_kernel::{CoreError, KycDocumentId, UserId};
use crate::error::InvestorError;

/// Maximum length of a document reference (storage key, file name, ...)
pub const MAX_REFERENCE_LEN: usize = 512;

/// Verification state of an investor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    NotStarted,
    Pending,
    Verified,
    Rejected,
}

impl KycStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::NotStarted => "not_started",
            KycStatus::Pending => "pending",
            KycStatus::Verified => "verified",
            KycStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for KycStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KycStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(KycStatus::NotStarted),
            "pending" => Ok(KycStatus::Pending),
            "verified" => Ok(KycStatus::Verified),
            "rejected" => Ok(KycStatus::Rejected),
            other => Err(CoreError::unknown_variant("kyc_status", other)),
        }
    }
}

/// Document type for KYC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycDocumentType {
    Passport,
    NationalId,
    DriversLicense,
    ProofOfAddress,
    BankStatement,
    Other,
}

impl KycDocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KycDocumentType::Passport => "passport",
            KycDocumentType::NationalId => "national_id",
            KycDocumentType::DriversLicense => "drivers_license",
            KycDocumentType::ProofOfAddress => "proof_of_address",
            KycDocumentType::BankStatement => "bank_statement",
            KycDocumentType::Other => "other",
        }
    }
}

impl FromStr for KycDocumentType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passport" => Ok(KycDocumentType::Passport),
            "national_id" => Ok(KycDocumentType::NationalId),
            "drivers_license" => Ok(KycDocumentType::DriversLicense),
            "proof_of_address" => Ok(KycDocumentType::ProofOfAddress),
            "bank_statement" => Ok(KycDocumentType::BankStatement),
            "other" => Ok(KycDocumentType::Other),
            other => Err(CoreError::unknown_variant("kyc_document_type", other)),
        }
    }
}

/// Review state of a single document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Verified,
    Rejected,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Verified => "verified",
            DocumentStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DocumentStatus::Pending),
            "verified" => Ok(DocumentStatus::Verified),
            "rejected" => Ok(DocumentStatus::Rejected),
            other => Err(CoreError::unknown_variant("document_status", other)),
        }
    }
}

/// A reviewer's decision on a pending document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Verify,
    Reject,
}

impl From<ReviewDecision> for DocumentStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Verify => DocumentStatus::Verified,
            ReviewDecision::Reject => DocumentStatus::Rejected,
        }
    }
}

/// A KYC document uploaded by an investor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycDocument {
    pub id: KycDocumentId,
    pub user_id: UserId,
    pub document_type: KycDocumentType,
    /// Opaque storage reference for the uploaded file
    pub reference: String,
    pub status: DocumentStatus,
    pub reviewed_by: Option<UserId>,
    pub review_note: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl KycDocument {
    /// Creates a pending document
    pub fn new(
        user_id: UserId,
        document_type: KycDocumentType,
        reference: impl Into<String>,
    ) -> Result<Self, InvestorError> {
        let reference = reference.into();
        if reference.trim().is_empty() {
            return Err(InvestorError::invalid("Document reference must not be empty"));
        }
        if reference.len() > MAX_REFERENCE_LEN {
            return Err(InvestorError::invalid(format!(
                "Document reference exceeds {} characters",
                MAX_REFERENCE_LEN
            )));
        }

        Ok(Self {
            id: KycDocumentId::new_v7(),
            user_id,
            document_type,
            reference,
            status: DocumentStatus::Pending,
            reviewed_by: None,
            review_note: None,
            submitted_at: Utc::now(),
            reviewed_at: None,
        })
    }

    /// Records a reviewer's decision
    ///
    /// Only pending documents can be reviewed, and never by their owner.
    pub fn review(
        &mut self,
        reviewer: UserId,
        decision: ReviewDecision,
        note: Option<String>,
    ) -> Result<(), InvestorError> {
        if reviewer == self.user_id {
            return Err(InvestorError::SelfReview);
        }
        if self.status != DocumentStatus::Pending {
            return Err(InvestorError::AlreadyReviewed(self.id.to_string()));
        }

        self.status = decision.into();
        self.reviewed_by = Some(reviewer);
        self.review_note = note;
        self.reviewed_at = Some(Utc::now());
        Ok(())
    }
}

/// Derives an investor's KYC status from their documents
///
/// Only the most recent document of each type counts, so a rejected passport
/// followed by a newer accepted one no longer blocks verification.
pub fn aggregate_kyc_status(documents: &[KycDocument]) -> KycStatus {
    let mut latest: HashMap<KycDocumentType, &KycDocument> = HashMap::new();
    for document in documents {
        latest
            .entry(document.document_type)
            .and_modify(|current| {
                if document.submitted_at >= current.submitted_at {
                    *current = document;
                }
            })
            .or_insert(document);
    }

    if latest.is_empty() {
        return KycStatus::NotStarted;
    }
    if latest.values().any(|d| d.status == DocumentStatus::Rejected) {
        return KycStatus::Rejected;
    }
    if latest.values().any(|d| d.status == DocumentStatus::Pending) {
        return KycStatus::Pending;
    }
    KycStatus::Verified
}

/// Status the profile takes after a review decision
///
/// A rejection always rejects the profile; an acceptance verifies it only
/// once nothing else is outstanding.
pub fn status_after_review(decision: ReviewDecision, documents: &[KycDocument]) -> KycStatus {
    match decision {
        ReviewDecision::Reject => KycStatus::Rejected,
        ReviewDecision::Verify => match aggregate_kyc_status(documents) {
            KycStatus::Verified => KycStatus::Verified,
            _ => KycStatus::Pending,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn document(user: UserId, kind: KycDocumentType) -> KycDocument {
        KycDocument::new(user, kind, "s3://kyc/doc.pdf").unwrap()
    }

    #[test]
    fn test_owner_cannot_review_own_document() {
        let user = UserId::new();
        let mut doc = document(user, KycDocumentType::Passport);
        assert_eq!(doc.review(user, ReviewDecision::Verify, None), Err(InvestorError::SelfReview));
        assert_eq!(doc.status, DocumentStatus::Pending);
    }

    #[test]
    fn test_document_reviewed_once() {
        let mut doc = document(UserId::new(), KycDocumentType::Passport);
        let admin = UserId::new();
        doc.review(admin, ReviewDecision::Reject, Some("blurry".into())).unwrap();
        assert!(matches!(
            doc.review(admin, ReviewDecision::Verify, None),
            Err(InvestorError::AlreadyReviewed(_))
        ));
        assert_eq!(doc.review_note.as_deref(), Some("blurry"));
    }

    #[test]
    fn test_empty_reference_rejected() {
        assert!(KycDocument::new(UserId::new(), KycDocumentType::Other, "  ").is_err());
    }

    #[test]
    fn test_aggregate_empty_is_not_started() {
        assert_eq!(aggregate_kyc_status(&[]), KycStatus::NotStarted);
    }

    #[test]
    fn test_newer_document_supersedes_rejection() {
        let user = UserId::new();
        let admin = UserId::new();

        let mut old = document(user, KycDocumentType::Passport);
        old.review(admin, ReviewDecision::Reject, None).unwrap();
        old.submitted_at = old.submitted_at - Duration::days(1);

        let mut new = document(user, KycDocumentType::Passport);
        new.review(admin, ReviewDecision::Verify, None).unwrap();

        assert_eq!(aggregate_kyc_status(&[old, new]), KycStatus::Verified);
    }

    #[test]
    fn test_verify_with_outstanding_document_stays_pending() {
        let user = UserId::new();
        let mut passport = document(user, KycDocumentType::Passport);
        passport.review(UserId::new(), ReviewDecision::Verify, None).unwrap();
        let address = document(user, KycDocumentType::ProofOfAddress);

        assert_eq!(
            status_after_review(ReviewDecision::Verify, &[passport, address]),
            KycStatus::Pending
        );
    }
}
