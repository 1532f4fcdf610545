use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use bytes::Bytes;
use chrono::Utc;
use tracing::{error, info, instrument, warn};

use crate::dto::quotation_dto::PreviewFormat;
use crate::model::quotation::{Quotation, QuotationFilter, QuotationUpdate};
use crate::model::quote_status::QuoteStatus;
use crate::repository::quotation_repo::QuotationRepository;
use crate::service::lifecycle;
use crate::util::error::ServiceError;
use crate::util::google_docs::{DocumentError, DocumentExporter, QuotationDocument};
use crate::util::price_table::PriceTable;

/// Prefix of caller-supplied business identifiers; anything else is a storage id.
pub const BUSINESS_ID_PREFIX: &str = "Q-";

const NOT_FOUND: &str = "Quotation not found";

#[async_trait]
pub trait QuotationService: Send + Sync {
    async fn list_quotations(
        &self,
        filter: &QuotationFilter,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Quotation>, u64), ServiceError>;
    async fn get_quotation(&self, id: &str) -> Result<Quotation, ServiceError>;
    async fn create_quotation(&self, quotation: Quotation) -> Result<Quotation, ServiceError>;
    async fn update_quotation(&self, id: &str, update: QuotationUpdate) -> Result<Quotation, ServiceError>;
    async fn delete_quotation(&self, id: &str) -> Result<(), ServiceError>;
    async fn change_status(&self, id: &str, status: &str) -> Result<Quotation, ServiceError>;
    async fn preview(&self, id: &str, format: PreviewFormat) -> Result<String, ServiceError>;
    async fn generate_pdf(&self, quotation: &Quotation) -> Result<Bytes, ServiceError>;
}

pub struct QuotationServiceImpl {
    pub quotation_repo: Arc<dyn QuotationRepository>,
    /// `None` when document generation is not configured.
    pub exporter: Option<Arc<dyn DocumentExporter>>,
}

impl QuotationServiceImpl {
    pub fn new(quotation_repo: Arc<dyn QuotationRepository>, exporter: Option<Arc<dyn DocumentExporter>>) -> Self {
        QuotationServiceImpl { quotation_repo, exporter }
    }

    /// Looks a quotation up by business identifier (`Q-...`) or storage id.
    async fn find(&self, id: &str) -> Result<Quotation, ServiceError> {
        let found = if id.starts_with(BUSINESS_ID_PREFIX) {
            self.quotation_repo.find_by_quote_id(id).await?
        } else {
            let object_id = parse_object_id(id)?;
            self.quotation_repo.find_by_id(object_id).await?
        };
        found.ok_or_else(|| ServiceError::NotFound(NOT_FOUND.to_string()))
    }

    /// A guarded write matched nothing: the record is gone or its status moved.
    async fn lost_race(&self, id: ObjectId) -> ServiceError {
        match self.quotation_repo.find_by_id(id).await {
            Ok(None) => ServiceError::NotFound(NOT_FOUND.to_string()),
            Ok(Some(current)) => {
                warn!(%id, status = %current.status, "Quotation status changed concurrently");
                ServiceError::Conflict(format!(
                    "Quotation status changed to {} while the request was processed",
                    current.status
                ))
            }
            Err(e) => e.into(),
        }
    }
}

fn parse_object_id(id: &str) -> Result<ObjectId, ServiceError> {
    ObjectId::parse_str(id).map_err(|_| ServiceError::InvalidInput("Invalid quotation id".to_string()))
}

fn storage_id(quotation: &Quotation) -> Result<ObjectId, ServiceError> {
    quotation
        .id
        .ok_or_else(|| ServiceError::Internal("stored quotation has no _id".to_string()))
}

#[async_trait]
impl QuotationService for QuotationServiceImpl {
    #[instrument(skip(self))]
    async fn list_quotations(
        &self,
        filter: &QuotationFilter,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Quotation>, u64), ServiceError> {
        let quotations = self.quotation_repo.list(filter, page, limit).await?;
        let total = self.quotation_repo.count(filter).await?;
        Ok((quotations, total))
    }

    #[instrument(skip(self))]
    async fn get_quotation(&self, id: &str) -> Result<Quotation, ServiceError> {
        self.find(id).await
    }

    #[instrument(skip(self, quotation), fields(quote_number = %quotation.quote_number))]
    async fn create_quotation(&self, mut quotation: Quotation) -> Result<Quotation, ServiceError> {
        quotation.status = QuoteStatus::Draft;
        let created = self.quotation_repo.create(quotation).await.map_err(|e| {
            error!("Failed to create quotation: {}", e);
            ServiceError::from(e)
        })?;
        info!("Quotation created");
        Ok(created)
    }

    #[instrument(skip(self, update))]
    async fn update_quotation(&self, id: &str, update: QuotationUpdate) -> Result<Quotation, ServiceError> {
        let current = self.find(id).await?;
        lifecycle::ensure_updatable(current.status)?;

        let object_id = storage_id(&current)?;
        match self.quotation_repo.update(object_id, current.status, &update).await? {
            Some(updated) => {
                info!("Quotation updated");
                Ok(updated)
            }
            None => Err(self.lost_race(object_id).await),
        }
    }

    #[instrument(skip(self))]
    async fn delete_quotation(&self, id: &str) -> Result<(), ServiceError> {
        let current = self.find(id).await?;
        lifecycle::ensure_deletable(current.status)?;

        let object_id = storage_id(&current)?;
        if self.quotation_repo.delete(object_id, current.status).await? {
            info!("Quotation deleted");
            Ok(())
        } else {
            Err(self.lost_race(object_id).await)
        }
    }

    #[instrument(skip(self))]
    async fn change_status(&self, id: &str, status: &str) -> Result<Quotation, ServiceError> {
        let requested: QuoteStatus = status.parse()?;
        let current = self.find(id).await?;
        lifecycle::ensure_transition(current.status, requested)?;

        let object_id = storage_id(&current)?;
        match self.quotation_repo.update_status(object_id, current.status, requested).await? {
            Some(updated) => {
                info!(from = %current.status, to = %requested, "Quotation status changed");
                Ok(updated)
            }
            None => Err(self.lost_race(object_id).await),
        }
    }

    #[instrument(skip(self))]
    async fn preview(&self, id: &str, format: PreviewFormat) -> Result<String, ServiceError> {
        let quotation = self.find(id).await?;
        let table = PriceTable::from_parts(&quotation.parts);
        Ok(match format {
            PreviewFormat::Text => table.to_text(),
            PreviewFormat::Html => table.to_html(),
        })
    }

    #[instrument(skip(self, quotation), fields(quote_id = %quotation.quote_id))]
    async fn generate_pdf(&self, quotation: &Quotation) -> Result<Bytes, ServiceError> {
        let exporter = self.exporter.as_ref().ok_or(DocumentError::NotConfigured)?;

        let date = Utc::now().format("%Y-%m-%d").to_string();
        let document = QuotationDocument::from_quotation(quotation, &date);
        Ok(exporter.export_pdf(&document).await?)
    }
}
