use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use chrono::{SecondsFormat, Utc};
use futures::stream::TryStreamExt;
use mongodb::options::{
    ClientOptions, Credential, FindOneAndUpdateOptions, FindOptions, IndexOptions, ResolverConfig,
    ReturnDocument,
};
use mongodb::{Client, Collection, IndexModel};
use tracing::{error, info, instrument};

use crate::config::mongo_conf::MongoConfig;
use crate::model::quotation::{Quotation, QuotationFilter, QuotationUpdate};
use crate::model::quote_status::QuoteStatus;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};

/// Document store for quotations.
///
/// Mutating methods take the status the caller observed and only apply when the
/// stored record still has it; `None`/`false` means no record matched.
#[async_trait]
pub trait QuotationRepository: Send + Sync {
    async fn create(&self, quotation: Quotation) -> RepositoryResult<Quotation>;
    async fn find_by_id(&self, id: ObjectId) -> RepositoryResult<Option<Quotation>>;
    async fn find_by_quote_id(&self, quote_id: &str) -> RepositoryResult<Option<Quotation>>;
    async fn list(&self, filter: &QuotationFilter, page: u32, limit: u32) -> RepositoryResult<Vec<Quotation>>;
    async fn count(&self, filter: &QuotationFilter) -> RepositoryResult<u64>;
    async fn update(
        &self,
        id: ObjectId,
        expected: QuoteStatus,
        update: &QuotationUpdate,
    ) -> RepositoryResult<Option<Quotation>>;
    async fn update_status(
        &self,
        id: ObjectId,
        expected: QuoteStatus,
        status: QuoteStatus,
    ) -> RepositoryResult<Option<Quotation>>;
    async fn delete(&self, id: ObjectId, expected: QuoteStatus) -> RepositoryResult<bool>;
}

/// RFC 3339 UTC timestamp with millisecond precision, so stored values sort lexically.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub struct MongoQuotationRepository {
    collection: Collection<Quotation>,
}

impl MongoQuotationRepository {
    /// Connects, resolves the collection and makes sure its indexes exist.
    pub async fn new(config: &MongoConfig) -> Result<Self, RepositoryError> {
        let mut client_options =
            ClientOptions::parse_with_resolver_config(&config.uri, ResolverConfig::cloudflare()).await?;
        client_options.app_name = Some("QuoteBuilderBackend".to_string());
        client_options.max_pool_size = Some(config.pool_size);
        client_options.connect_timeout = Some(std::time::Duration::from_secs(config.connection_timeout_secs));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            client_options.credential = Some(
                Credential::builder()
                    .username(username.clone())
                    .password(password.clone())
                    .build(),
            );
        }

        let client = Client::with_options(client_options)?;
        let collection = client
            .database(&config.database)
            .collection::<Quotation>(&config.quotation_collection);

        let repository = MongoQuotationRepository { collection };
        repository.ensure_indexes().await?;
        Ok(repository)
    }

    #[instrument(skip(self))]
    async fn ensure_indexes(&self) -> RepositoryResult<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "quoteNumber": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
            IndexModel::builder().keys(doc! { "status": 1 }).build(),
            IndexModel::builder().keys(doc! { "id": 1 }).build(),
        ];
        self.collection.create_indexes(indexes, None).await.map_err(|e| {
            error!("Failed to create quotation indexes: {}", e);
            RepositoryError::from(e)
        })?;
        info!("Quotation indexes ensured");
        Ok(())
    }

    fn after_update() -> FindOneAndUpdateOptions {
        FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build()
    }
}

#[async_trait]
impl QuotationRepository for MongoQuotationRepository {
    #[instrument(skip(self, quotation), fields(quote_number = %quotation.quote_number))]
    async fn create(&self, mut quotation: Quotation) -> RepositoryResult<Quotation> {
        let now = timestamp_now();
        quotation.id = Some(ObjectId::new());
        quotation.created_at = Some(now.clone());
        quotation.updated_at = Some(now);

        self.collection.insert_one(&quotation, None).await.map_err(|e| {
            error!("Failed to create quotation: {}", e);
            RepositoryError::from(e)
        })?;
        info!("Quotation created");
        Ok(quotation)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn find_by_id(&self, id: ObjectId) -> RepositoryResult<Option<Quotation>> {
        self.collection
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(RepositoryError::from)
    }

    #[instrument(skip(self))]
    async fn find_by_quote_id(&self, quote_id: &str) -> RepositoryResult<Option<Quotation>> {
        self.collection
            .find_one(doc! { "id": quote_id }, None)
            .await
            .map_err(RepositoryError::from)
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &QuotationFilter, page: u32, limit: u32) -> RepositoryResult<Vec<Quotation>> {
        let skip = u64::from(page.saturating_sub(1)) * u64::from(limit);
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .skip(skip)
            .limit(i64::from(limit))
            .build();

        let cursor = self.collection.find(filter.to_document(), options).await.map_err(|e| {
            error!("Failed to list quotations: {}", e);
            RepositoryError::from(e)
        })?;
        let quotations: Vec<Quotation> = cursor.try_collect().await.map_err(|e| {
            error!("Failed to read quotation cursor: {}", e);
            RepositoryError::from(e)
        })?;
        info!("Fetched {} quotations", quotations.len());
        Ok(quotations)
    }

    #[instrument(skip(self))]
    async fn count(&self, filter: &QuotationFilter) -> RepositoryResult<u64> {
        self.collection
            .count_documents(filter.to_document(), None)
            .await
            .map_err(RepositoryError::from)
    }

    #[instrument(skip(self, update), fields(id = %id, expected = %expected))]
    async fn update(
        &self,
        id: ObjectId,
        expected: QuoteStatus,
        update: &QuotationUpdate,
    ) -> RepositoryResult<Option<Quotation>> {
        let set = update.to_set_document(&timestamp_now())?;
        let updated = self
            .collection
            .find_one_and_update(
                doc! { "_id": id, "status": expected.as_str() },
                doc! { "$set": set },
                Self::after_update(),
            )
            .await
            .map_err(|e| {
                error!("Failed to update quotation: {}", e);
                RepositoryError::from(e)
            })?;
        if updated.is_some() {
            info!("Quotation updated");
        }
        Ok(updated)
    }

    #[instrument(skip(self), fields(id = %id, from = %expected, to = %status))]
    async fn update_status(
        &self,
        id: ObjectId,
        expected: QuoteStatus,
        status: QuoteStatus,
    ) -> RepositoryResult<Option<Quotation>> {
        let updated = self
            .collection
            .find_one_and_update(
                doc! { "_id": id, "status": expected.as_str() },
                doc! { "$set": { "status": status.as_str(), "updatedAt": timestamp_now() } },
                Self::after_update(),
            )
            .await
            .map_err(|e| {
                error!("Failed to update quotation status: {}", e);
                RepositoryError::from(e)
            })?;
        if updated.is_some() {
            info!("Quotation status updated");
        }
        Ok(updated)
    }

    #[instrument(skip(self), fields(id = %id, expected = %expected))]
    async fn delete(&self, id: ObjectId, expected: QuoteStatus) -> RepositoryResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id, "status": expected.as_str() }, None)
            .await
            .map_err(|e| {
                error!("Failed to delete quotation: {}", e);
                RepositoryError::from(e)
            })?;
        Ok(result.deleted_count > 0)
    }
}
