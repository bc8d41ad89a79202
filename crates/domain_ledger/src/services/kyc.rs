//! KYC workflow: document submission and review

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use core_kernel::{KycDocumentId, UserId};
use domain_investor::{status_after_review, InvestorProfile, KycDocument, KycDocumentType, ReviewDecision};

use super::{load_or_create_profile, Actor, LedgerSettings};
use crate::error::LedgerError;
use crate::ports::LedgerPort;

/// A profile together with the documents behind its KYC status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KycProfileView {
    pub profile: InvestorProfile,
    pub documents: Vec<KycDocument>,
}

#[derive(Clone)]
pub struct KycService {
    port: Arc<dyn LedgerPort>,
    settings: LedgerSettings,
}

impl KycService {
    pub fn new(port: Arc<dyn LedgerPort>, settings: LedgerSettings) -> Self {
        Self { port, settings }
    }

    /// Returns the caller's profile, creating it on first access
    pub async fn get_profile(&self, user_id: UserId) -> Result<KycProfileView, LedgerError> {
        let profile = match self.port.get_profile(user_id).await? {
            Some(profile) => profile,
            None => {
                self.settings
                    .retry
                    .run("create_profile", move || self.create_profile(user_id))
                    .await?
            }
        };
        let documents = self.port.list_kyc_documents(user_id).await?;
        Ok(KycProfileView { profile, documents })
    }

    async fn create_profile(&self, user_id: UserId) -> Result<InvestorProfile, LedgerError> {
        let mut uow = self.port.begin().await?;
        if let Some(existing) = uow.lock_profile(user_id).await? {
            return Ok(existing);
        }
        let profile = InvestorProfile::new(user_id, self.settings.currency);
        uow.save_profile(&profile).await?;
        uow.commit().await?;
        tracing::debug!(%user_id, "Created investor profile");
        Ok(profile)
    }

    /// Uploads a document for review; the profile becomes pending
    #[instrument(skip_all, fields(user_id = %user_id, document_type = document_type.as_str()))]
    pub async fn submit_document(
        &self,
        user_id: UserId,
        document_type: KycDocumentType,
        reference: String,
    ) -> Result<KycDocument, LedgerError> {
        let document = KycDocument::new(user_id, document_type, reference)?;
        let document = &document;
        self.settings
            .retry
            .run("submit_kyc_document", move || async move {
                let mut uow = self.port.begin().await?;
                let mut profile = load_or_create_profile(uow.as_mut(), user_id, self.settings.currency).await?;
                profile.mark_documents_submitted();
                uow.save_profile(&profile).await?;
                uow.save_kyc_document(document).await?;
                uow.commit().await?;
                Ok::<_, LedgerError>(())
            })
            .await?;

        tracing::info!(document_id = %document.id, document_type = document.document_type.as_str(), "KYC document submitted");
        Ok(document.clone())
    }

    /// Records an administrator's decision and re-derives the owner's status
    ///
    /// The document update and the profile status change commit together.
    #[instrument(skip_all, fields(reviewer_id = %actor.user_id, document_id = %document_id, decision = ?decision))]
    pub async fn review_document(
        &self,
        actor: &Actor,
        document_id: KycDocumentId,
        decision: ReviewDecision,
        note: Option<String>,
    ) -> Result<KycProfileView, LedgerError> {
        actor.require_admin()?;
        let reviewer = actor.user_id;
        let note = &note;

        let view = self
            .settings
            .retry
            .run("review_kyc_document", move || async move {
                let mut uow = self.port.begin().await?;
                let mut document = uow
                    .lock_kyc_document(document_id)
                    .await?
                    .ok_or_else(|| LedgerError::not_found("KycDocument", document_id))?;
                document.review(reviewer, decision, note.clone())?;
                uow.save_kyc_document(&document).await?;

                let documents = uow.user_kyc_documents(document.user_id).await?;
                let mut profile =
                    load_or_create_profile(uow.as_mut(), document.user_id, self.settings.currency).await?;
                profile.set_kyc_status(status_after_review(decision, &documents));
                uow.save_profile(&profile).await?;
                uow.commit().await?;

                Ok::<_, LedgerError>(KycProfileView { profile, documents })
            })
            .await?;

        tracing::info!(
            %document_id,
            user_id = %view.profile.user_id,
            kyc_status = %view.profile.kyc_status,
            "KYC document reviewed"
        );
        Ok(view)
    }
}
