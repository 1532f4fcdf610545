#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use bson::oid::ObjectId;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use quote_builder_backend::app::app::{App, AppDependencies};
use quote_builder_backend::config::{AppConfig, CurrencyConfig, JwtConfig};
use quote_builder_backend::model::quotation::{Quotation, QuotationFilter, QuotationUpdate};
use quote_builder_backend::model::quote_status::QuoteStatus;
use quote_builder_backend::repository::quotation_repo::{timestamp_now, QuotationRepository};
use quote_builder_backend::repository::repository_error::{RepositoryError, RepositoryResult};
use quote_builder_backend::service::currency_service::{ConversionRateCache, SystemClock};
use quote_builder_backend::service::quotation_service::QuotationServiceImpl;
use quote_builder_backend::util::exchange_rate::{RateFetchError, RateFetcher};
use quote_builder_backend::util::google_docs::{DocumentError, DocumentExporter, QuotationDocument};
use quote_builder_backend::util::jwt::{JwtTokenUtils, JwtTokenUtilsImpl};

/// A concurrent write that lands between the service's read and its own write.
#[derive(Debug, Clone, Copy)]
pub enum ConcurrentWrite {
    ChangeStatus(QuoteStatus),
    Remove,
}

/// Quotation store backed by a vector, newest last.
#[derive(Default)]
pub struct InMemoryQuotationRepository {
    quotations: Mutex<Vec<Quotation>>,
    concurrent_write: Mutex<Option<ConcurrentWrite>>,
}

impl InMemoryQuotationRepository {
    /// Applies `write` to the target record just before the next guarded write.
    pub fn before_next_write(&self, write: ConcurrentWrite) {
        *self.concurrent_write.lock().unwrap() = Some(write);
    }

    fn apply_concurrent_write(&self, quotations: &mut Vec<Quotation>, id: ObjectId) {
        match self.concurrent_write.lock().unwrap().take() {
            Some(ConcurrentWrite::ChangeStatus(status)) => {
                if let Some(stored) = quotations.iter_mut().find(|q| q.id == Some(id)) {
                    stored.status = status;
                }
            }
            Some(ConcurrentWrite::Remove) => quotations.retain(|q| q.id != Some(id)),
            None => {}
        }
    }

    pub fn snapshot(&self) -> Vec<Quotation> {
        self.quotations.lock().unwrap().clone()
    }

    /// Puts a record in place as-is, bypassing the service rules.
    pub fn insert_raw(&self, mut quotation: Quotation) -> Quotation {
        quotation.id.get_or_insert_with(ObjectId::new);
        self.quotations.lock().unwrap().push(quotation.clone());
        quotation
    }

    fn matches(filter: &QuotationFilter, quotation: &Quotation) -> bool {
        let status_ok = filter.status.map_or(true, |status| quotation.status == status);
        // Substring match stands in for the case-insensitive regex.
        let name_ok = filter.client_name.as_ref().map_or(true, |pattern| {
            quotation.client_name.to_lowercase().contains(&pattern.to_lowercase())
        });
        status_ok && name_ok
    }
}

#[async_trait]
impl QuotationRepository for InMemoryQuotationRepository {
    async fn create(&self, mut quotation: Quotation) -> RepositoryResult<Quotation> {
        let mut quotations = self.quotations.lock().unwrap();
        if quotations.iter().any(|q| q.quote_number == quotation.quote_number) {
            return Err(RepositoryError::DuplicateKey("quoteNumber".to_string()));
        }
        let now = timestamp_now();
        quotation.id = Some(ObjectId::new());
        quotation.created_at = Some(now.clone());
        quotation.updated_at = Some(now);
        quotations.push(quotation.clone());
        Ok(quotation)
    }

    async fn find_by_id(&self, id: ObjectId) -> RepositoryResult<Option<Quotation>> {
        Ok(self.quotations.lock().unwrap().iter().find(|q| q.id == Some(id)).cloned())
    }

    async fn find_by_quote_id(&self, quote_id: &str) -> RepositoryResult<Option<Quotation>> {
        Ok(self.quotations.lock().unwrap().iter().find(|q| q.quote_id == quote_id).cloned())
    }

    async fn list(&self, filter: &QuotationFilter, page: u32, limit: u32) -> RepositoryResult<Vec<Quotation>> {
        let skip = (page.saturating_sub(1) * limit) as usize;
        Ok(self
            .quotations
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|q| Self::matches(filter, q))
            .skip(skip)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &QuotationFilter) -> RepositoryResult<u64> {
        Ok(self.quotations.lock().unwrap().iter().filter(|q| Self::matches(filter, q)).count() as u64)
    }

    async fn update(
        &self,
        id: ObjectId,
        expected: QuoteStatus,
        update: &QuotationUpdate,
    ) -> RepositoryResult<Option<Quotation>> {
        let mut quotations = self.quotations.lock().unwrap();
        self.apply_concurrent_write(&mut quotations, id);
        let Some(stored) = quotations.iter_mut().find(|q| q.id == Some(id) && q.status == expected) else {
            return Ok(None);
        };
        update.apply_to(stored);
        stored.updated_at = Some(timestamp_now());
        Ok(Some(stored.clone()))
    }

    async fn update_status(
        &self,
        id: ObjectId,
        expected: QuoteStatus,
        status: QuoteStatus,
    ) -> RepositoryResult<Option<Quotation>> {
        let mut quotations = self.quotations.lock().unwrap();
        self.apply_concurrent_write(&mut quotations, id);
        let Some(stored) = quotations.iter_mut().find(|q| q.id == Some(id) && q.status == expected) else {
            return Ok(None);
        };
        stored.status = status;
        stored.updated_at = Some(timestamp_now());
        Ok(Some(stored.clone()))
    }

    async fn delete(&self, id: ObjectId, expected: QuoteStatus) -> RepositoryResult<bool> {
        let mut quotations = self.quotations.lock().unwrap();
        self.apply_concurrent_write(&mut quotations, id);
        let before = quotations.len();
        quotations.retain(|q| !(q.id == Some(id) && q.status == expected));
        Ok(quotations.len() < before)
    }
}

pub const STUB_PDF: &[u8] = b"%PDF-1.4 stub";

/// Records the last document and answers with [`STUB_PDF`].
#[derive(Default)]
pub struct StubExporter {
    pub last_document: Mutex<Option<QuotationDocument>>,
}

#[async_trait]
impl DocumentExporter for StubExporter {
    async fn export_pdf(&self, document: &QuotationDocument) -> Result<bytes::Bytes, DocumentError> {
        *self.last_document.lock().unwrap() = Some(document.clone());
        Ok(bytes::Bytes::from_static(STUB_PDF))
    }
}

pub struct FixedFetcher(pub f64);

#[async_trait]
impl RateFetcher for FixedFetcher {
    async fn fetch_rate(&self, _base: &str, _target: &str) -> Result<f64, RateFetchError> {
        Ok(self.0)
    }
}

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<InMemoryQuotationRepository>,
    pub exporter: Arc<StubExporter>,
    pub rate_cache: Arc<ConversionRateCache>,
}

pub fn test_app() -> TestApp {
    build_test_app(true)
}

pub fn test_app_without_exporter() -> TestApp {
    build_test_app(false)
}

fn build_test_app(with_exporter: bool) -> TestApp {
    let repo = Arc::new(InMemoryQuotationRepository::default());
    let exporter = Arc::new(StubExporter::default());
    let document_exporter = if with_exporter {
        Some(exporter.clone() as Arc<dyn DocumentExporter>)
    } else {
        None
    };

    let rate_cache = Arc::new(ConversionRateCache::new(
        &CurrencyConfig::default(),
        Arc::new(FixedFetcher(84.25)),
        Arc::new(SystemClock),
    ));

    let deps = AppDependencies {
        quotation_service: Arc::new(QuotationServiceImpl::new(repo.clone(), document_exporter)),
        rate_cache: rate_cache.clone(),
        jwt_utils: Arc::new(JwtTokenUtilsImpl::new(JwtConfig::default())),
    };
    let router = App::build_router(&AppConfig::default(), deps).expect("router");
    TestApp { router, repo, exporter, rate_cache }
}

pub fn token() -> String {
    JwtTokenUtilsImpl::new(JwtConfig::default())
        .generate_access_token("integration-tests")
        .expect("token")
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("JSON body")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).expect("UTF-8 body")
    }
}

pub async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>, token: Option<&str>) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    TestResponse { status, headers, body }
}

pub fn quotation_body(quote_id: &str, quote_number: &str, client_name: &str) -> Value {
    serde_json::json!({
        "id": quote_id,
        "clientName": client_name,
        "quoteNumber": quote_number,
        "currency": "USD",
        "validUntil": "2026-12-31",
        "parts": [
            {
                "partName": "Hex Bolt",
                "moq": 500,
                "priceQuantities": [
                    { "quantity": 10, "price": 1.25 },
                    { "quantity": 50, "price": 1.1 }
                ]
            },
            {
                "partName": "Flange",
                "moq": 20,
                "priceQuantities": [
                    { "quantity": 50, "price": 1234.5 },
                    { "quantity": 100, "price": 1000 }
                ]
            }
        ]
    })
}
