//! Property handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use core_kernel::PropertyId;
use domain_ledger::{Actor, NewProperty, NewSpv};
use domain_property::{DueDiligence, PropertyDocument, PropertyStatus};

use crate::dto::parse_enum;
use crate::dto::property::*;
use crate::handlers::validated;
use crate::{error::ApiError, AppState};

/// Lists properties, optionally filtered by status
pub async fn list_properties(
    State(state): State<AppState>,
    Query(query): Query<ListPropertiesQuery>,
) -> Result<Json<Vec<PropertyResponse>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(|s| parse_enum::<PropertyStatus>("status", s))
        .transpose()?;

    let properties = state.services.properties.list_properties(status).await?;
    Ok(Json(properties.into_iter().map(PropertyResponse::from).collect()))
}

/// Gets a property with its documents, SPV and due diligence
pub async fn get_property(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PropertyDetailsResponse>, ApiError> {
    let details = state
        .services
        .properties
        .get_details(PropertyId::from_uuid(id))
        .await?;
    Ok(Json(details.into()))
}

/// Creates a draft property
pub async fn create_property(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreatePropertyRequest>,
) -> Result<(StatusCode, Json<PropertyResponse>), ApiError> {
    let request = validated(request)?;

    let property = state
        .services
        .properties
        .create_property(
            &actor,
            NewProperty {
                name: request.name,
                location: request.location,
                description: request.description,
                total_shares: request.total_shares,
                share_price: request.share_price,
                spv: request.spv.map(|spv| NewSpv {
                    name: spv.name,
                    registration_number: spv.registration_number,
                    jurisdiction: spv.jurisdiction,
                }),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(property.into())))
}

/// Moves a property through its lifecycle
pub async fn update_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<PropertyResponse>, ApiError> {
    let status = parse_enum::<PropertyStatus>("status", &request.status)?;
    let property = state
        .services
        .properties
        .update_status(&actor, PropertyId::from_uuid(id), status)
        .await?;
    Ok(Json(property.into()))
}

/// Attaches an offering document
pub async fn add_document(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddDocumentRequest>,
) -> Result<(StatusCode, Json<PropertyDocument>), ApiError> {
    let request = validated(request)?;
    let kind = parse_enum("kind", &request.kind)?;

    let document = state
        .services
        .properties
        .add_document(&actor, PropertyId::from_uuid(id), kind, request.name, request.url)
        .await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// Records or replaces the due-diligence report
pub async fn record_due_diligence(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<DueDiligenceRequest>,
) -> Result<Json<DueDiligence>, ApiError> {
    let request = validated(request)?;

    let report = state
        .services
        .properties
        .record_due_diligence(
            &actor,
            DueDiligence {
                property_id: PropertyId::from_uuid(id),
                valuation: state.settings.money(request.valuation),
                legal_status: request.legal_status,
                reviewed_by: request.reviewed_by,
                completed_on: request.completed_on,
                risk_notes: request.risk_notes,
            },
        )
        .await?;
    Ok(Json(report))
}
