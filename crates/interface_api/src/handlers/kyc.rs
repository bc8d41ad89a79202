//! KYC handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use core_kernel::KycDocumentId;
use domain_investor::{KycDocument, KycDocumentType};
use domain_ledger::{Actor, KycProfileView};

use crate::dto::kyc::*;
use crate::dto::parse_enum;
use crate::handlers::validated;
use crate::{error::ApiError, AppState};

/// The caller's verification status and documents
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<KycProfileView>, ApiError> {
    let view = state.services.kyc.get_profile(actor.user_id).await?;
    Ok(Json(view))
}

/// Uploads a document for review
pub async fn submit_document(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<SubmitDocumentRequest>,
) -> Result<(StatusCode, Json<KycDocument>), ApiError> {
    let request = validated(request)?;
    let document_type = parse_enum::<KycDocumentType>("document_type", &request.document_type)?;

    let document = state
        .services
        .kyc
        .submit_document(actor.user_id, document_type, request.reference)
        .await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// Verifies or rejects a pending document
pub async fn review_document(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReviewDocumentRequest>,
) -> Result<Json<KycProfileView>, ApiError> {
    let request = validated(request)?;
    let view = state
        .services
        .kyc
        .review_document(&actor, KycDocumentId::from_uuid(id), request.decision, request.note)
        .await?;
    Ok(Json(view))
}
