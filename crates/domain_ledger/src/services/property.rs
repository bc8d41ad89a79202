//! Property catalogue and administration

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::instrument;

use core_kernel::PropertyId;
use domain_property::{
    DocumentKind, DueDiligence, Property, PropertyDetails, PropertyDocument, PropertyStatus, Spv,
};

use super::{require_property, Actor, LedgerSettings};
use crate::error::LedgerError;
use crate::ports::LedgerPort;

/// Legal entity to create alongside a property
#[derive(Debug, Clone)]
pub struct NewSpv {
    pub name: String,
    pub registration_number: String,
    pub jurisdiction: String,
}

/// Input for listing a new property
#[derive(Debug, Clone)]
pub struct NewProperty {
    pub name: String,
    pub location: String,
    pub description: Option<String>,
    pub total_shares: i64,
    pub share_price: Decimal,
    pub spv: Option<NewSpv>,
}

#[derive(Clone)]
pub struct PropertyService {
    port: Arc<dyn LedgerPort>,
    settings: LedgerSettings,
}

impl PropertyService {
    pub fn new(port: Arc<dyn LedgerPort>, settings: LedgerSettings) -> Self {
        Self { port, settings }
    }

    pub async fn get_property(&self, id: PropertyId) -> Result<Property, LedgerError> {
        self.port
            .get_property(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Property", id))
    }

    /// Lists properties; drafts are only returned when asked for explicitly
    pub async fn list_properties(&self, status: Option<PropertyStatus>) -> Result<Vec<Property>, LedgerError> {
        let properties = self.port.list_properties(status).await?;
        Ok(match status {
            Some(_) => properties,
            None => properties
                .into_iter()
                .filter(|p| p.status != PropertyStatus::Draft)
                .collect(),
        })
    }

    /// Property with its documents, SPV and due-diligence summary
    pub async fn get_details(&self, id: PropertyId) -> Result<PropertyDetails, LedgerError> {
        let property = self.get_property(id).await?;
        let documents = self.port.list_property_documents(id).await?;
        let spv = match property.spv_id {
            Some(spv_id) => self.port.get_spv(spv_id).await?,
            None => None,
        };
        let due_diligence = self.port.get_due_diligence(id).await?;

        Ok(PropertyDetails {
            property,
            documents,
            spv,
            due_diligence,
        })
    }

    /// Lists a new property in `draft` with its whole supply available
    #[instrument(skip_all, fields(admin_id = %actor.user_id, name = %request.name))]
    pub async fn create_property(&self, actor: &Actor, request: NewProperty) -> Result<Property, LedgerError> {
        actor.require_admin()?;

        let spv = request
            .spv
            .as_ref()
            .map(|s| Spv::new(&s.name, &s.registration_number, &s.jurisdiction))
            .transpose()?;
        let mut property = Property::new(
            &request.name,
            &request.location,
            request.total_shares,
            self.settings.money(request.share_price),
        )?;
        if let Some(description) = &request.description {
            property = property.with_description(description);
        }
        if let Some(spv) = &spv {
            property = property.with_spv(spv.id);
        }

        let (property, spv) = (&property, &spv);
        self.settings
            .retry
            .run("create_property", move || async move {
                let mut uow = self.port.begin().await?;
                if let Some(spv) = spv {
                    uow.insert_spv(spv).await?;
                }
                uow.insert_property(property).await?;
                uow.commit().await?;
                Ok::<_, LedgerError>(())
            })
            .await?;

        tracing::info!(property_id = %property.id, total_shares = property.total_shares, "Property created");
        Ok(property.clone())
    }

    /// Moves a property through its lifecycle
    #[instrument(skip_all, fields(admin_id = %actor.user_id, property_id = %id, status = %status))]
    pub async fn update_status(
        &self,
        actor: &Actor,
        id: PropertyId,
        status: PropertyStatus,
    ) -> Result<Property, LedgerError> {
        actor.require_admin()?;
        let property = self
            .settings
            .retry
            .run("update_property_status", move || async move {
                let mut uow = self.port.begin().await?;
                let mut property = require_property(uow.as_mut(), id).await?;
                property.transition_to(status)?;
                uow.update_property(&property).await?;
                uow.commit().await?;
                Ok::<_, LedgerError>(property)
            })
            .await?;

        tracing::info!("Property status updated");
        Ok(property)
    }

    #[instrument(skip_all, fields(admin_id = %actor.user_id, property_id = %id))]
    pub async fn add_document(
        &self,
        actor: &Actor,
        id: PropertyId,
        kind: DocumentKind,
        name: String,
        url: String,
    ) -> Result<PropertyDocument, LedgerError> {
        actor.require_admin()?;
        let document = PropertyDocument::new(id, kind, name, url)?;
        let document = &document;
        self.settings
            .retry
            .run("add_property_document", move || async move {
                let mut uow = self.port.begin().await?;
                require_property(uow.as_mut(), id).await?;
                uow.insert_property_document(document).await?;
                uow.commit().await?;
                Ok::<_, LedgerError>(())
            })
            .await?;
        Ok(document.clone())
    }

    /// Records or replaces the due-diligence summary of a property
    #[instrument(skip_all, fields(admin_id = %actor.user_id, property_id = %report.property_id))]
    pub async fn record_due_diligence(&self, actor: &Actor, report: DueDiligence) -> Result<DueDiligence, LedgerError> {
        actor.require_admin()?;
        if report.completed_on > Utc::now().date_naive() {
            return Err(LedgerError::validation("Due diligence cannot complete in the future"));
        }
        if !report.valuation.is_positive() {
            return Err(LedgerError::validation("Valuation must be positive"));
        }

        let report_ref = &report;
        self.settings
            .retry
            .run("record_due_diligence", move || async move {
                let mut uow = self.port.begin().await?;
                require_property(uow.as_mut(), report_ref.property_id).await?;
                uow.upsert_due_diligence(report_ref).await?;
                uow.commit().await?;
                Ok::<_, LedgerError>(())
            })
            .await?;
        Ok(report)
    }
}
