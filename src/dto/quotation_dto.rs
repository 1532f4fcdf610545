use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::model::quotation::{Currency, Part, PriceTier, Quotation, QuotationFilter, QuotationUpdate};
use crate::model::quote_status::QuoteStatus;
use crate::util::error::ServiceError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

fn rule_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

fn not_blank(value: &str, message: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(rule_error("blank", message));
    }
    Ok(())
}

fn not_blank_id(value: &String) -> Result<(), ValidationError> {
    not_blank(value, "Quote ID cannot be empty")
}

fn not_blank_client_name(value: &String) -> Result<(), ValidationError> {
    not_blank(value, "Client name cannot be empty")
}

fn not_blank_quote_number(value: &String) -> Result<(), ValidationError> {
    not_blank(value, "Quote Number cannot be empty")
}

fn not_blank_part_name(value: &String) -> Result<(), ValidationError> {
    not_blank(value, "Part name cannot be empty")
}

fn not_blank_valid_until(value: &String) -> Result<(), ValidationError> {
    not_blank(value, "Valid until cannot be empty")
}

fn supported_currency(value: &String) -> Result<(), ValidationError> {
    Currency::from_str(value)
        .map(|_| ())
        .map_err(|_| rule_error("currency", "Currency must be either INR or USD"))
}

fn known_status(value: &String) -> Result<(), ValidationError> {
    QuoteStatus::from_str(value)
        .map(|_| ())
        .map_err(|_| rule_error("status", "Status must be one of DRAFT, SENT, APPROVED, REJECTED, EXPIRED"))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PriceTierRequest {
    #[validate(range(exclusive_min = 0.0, message = "Quantity must be a positive number"))]
    pub quantity: f64,
    #[validate(range(exclusive_min = 0.0, message = "Price must be a positive number"))]
    pub price: f64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PartRequest {
    #[validate(custom(function = "not_blank_part_name"))]
    pub part_name: String,
    #[validate(range(min = 1i64, max = 4294967295i64, message = "MOQ must be a positive integer"))]
    pub moq: i64,
    #[serde(default)]
    #[validate(nested)]
    pub price_quantities: Vec<PriceTierRequest>,
}

impl PartRequest {
    fn into_part(self, index: usize) -> Result<Part, ServiceError> {
        let moq = u32::try_from(self.moq).map_err(|_| {
            ServiceError::Validation(vec![format!("parts[{}].moq: MOQ must be a positive integer", index)])
        })?;
        Ok(Part {
            part_name: self.part_name.trim().to_string(),
            moq,
            price_quantities: self
                .price_quantities
                .into_iter()
                .map(|tier| PriceTier { quantity: tier.quantity, price: tier.price })
                .collect(),
        })
    }
}

fn into_parts(parts: Vec<PartRequest>) -> Result<Vec<Part>, ServiceError> {
    parts.into_iter().enumerate().map(|(index, part)| part.into_part(index)).collect()
}

/// Body of `POST /api/quotations` and `POST /api/quotations/pdf`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuotationRequest {
    #[validate(custom(function = "not_blank_id"))]
    pub id: String,
    #[validate(custom(function = "not_blank_client_name"))]
    pub client_name: String,
    #[validate(custom(function = "not_blank_quote_number"))]
    pub quote_number: String,
    #[validate(custom(function = "supported_currency"))]
    pub currency: String,
    #[validate(custom(function = "not_blank_valid_until"))]
    pub valid_until: String,
    /// Accepted when valid; a created quotation always starts as DRAFT.
    #[validate(custom(function = "known_status"))]
    pub status: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub parts: Vec<PartRequest>,
}

impl CreateQuotationRequest {
    /// Validates and builds the quotation to persist, always in DRAFT.
    pub fn into_quotation(self) -> Result<Quotation, ServiceError> {
        let mut quotation = self.into_document()?;
        quotation.status = QuoteStatus::Draft;
        Ok(quotation)
    }

    /// Validates and builds an unsaved quotation, keeping the supplied status.
    pub fn into_document(self) -> Result<Quotation, ServiceError> {
        self.validate().map_err(|e| ServiceError::Validation(validation_messages(&e)))?;

        let currency = Currency::from_str(&self.currency).map_err(|e| ServiceError::Validation(vec![e]))?;
        let status = match self.status.as_deref() {
            Some(raw) => QuoteStatus::from_str(raw)?,
            None => QuoteStatus::Draft,
        };
        Ok(Quotation {
            id: None,
            quote_id: self.id.trim().to_string(),
            client_name: self.client_name.trim().to_string(),
            quote_number: self.quote_number.trim().to_string(),
            currency,
            valid_until: self.valid_until,
            status,
            parts: into_parts(self.parts)?,
            created_at: None,
            updated_at: None,
        })
    }
}

/// Body of `PUT /api/quotations/{id}`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuotationRequest {
    #[validate(custom(function = "not_blank_id"))]
    pub id: Option<String>,
    #[validate(custom(function = "not_blank_client_name"))]
    pub client_name: Option<String>,
    /// Immutable; discarded by [`UpdateQuotationRequest::into_update`].
    pub quote_number: Option<String>,
    #[validate(custom(function = "supported_currency"))]
    pub currency: Option<String>,
    #[validate(custom(function = "not_blank_valid_until"))]
    pub valid_until: Option<String>,
    /// Only changes through the status route; discarded here.
    pub status: Option<String>,
    #[validate(nested)]
    pub parts: Option<Vec<PartRequest>>,
}

impl UpdateQuotationRequest {
    /// Validates the present fields and drops `quoteNumber` and `status`.
    pub fn into_update(self) -> Result<QuotationUpdate, ServiceError> {
        self.validate().map_err(|e| ServiceError::Validation(validation_messages(&e)))?;

        if self.quote_number.is_some() || self.status.is_some() {
            debug!("Ignoring quoteNumber/status in update payload");
        }

        let currency = self
            .currency
            .as_deref()
            .map(Currency::from_str)
            .transpose()
            .map_err(|e| ServiceError::Validation(vec![e]))?;
        Ok(QuotationUpdate {
            quote_id: self.id.map(|id| id.trim().to_string()),
            client_name: self.client_name.map(|name| name.trim().to_string()),
            currency,
            valid_until: self.valid_until,
            parts: self.parts.map(into_parts).transpose()?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChangeRequest {
    pub status: String,
}

/// Query string of `GET /api/quotations`.
///
/// `page` and `limit` are parsed leniently: anything that is not a positive
/// integer falls back to the default, and `limit` is capped at [`MAX_LIMIT`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub client_name: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> u32 {
        positive(self.page.as_deref()).unwrap_or(DEFAULT_PAGE)
    }

    pub fn limit(&self) -> u32 {
        positive(self.limit.as_deref()).unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
    }

    pub fn filter(&self) -> Result<QuotationFilter, ServiceError> {
        let status = match self.status.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => Some(QuoteStatus::from_str(raw)?),
            None => None,
        };
        let client_name = self.client_name.clone().filter(|name| !name.is_empty());
        Ok(QuotationFilter { status, client_name })
    }
}

fn positive(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|value| value.trim().parse::<u32>().ok()).filter(|value| *value > 0)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u64,
}

impl Pagination {
    pub fn new(total: u64, page: u32, limit: u32) -> Self {
        Pagination { total, page, limit, pages: total.div_ceil(u64::from(limit.max(1))) }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// API shape of a stored quotation, with the storage id as a hex string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuotationResponse {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub storage_id: Option<String>,
    pub id: String,
    pub client_name: String,
    pub quote_number: String,
    pub currency: Currency,
    pub valid_until: String,
    pub status: QuoteStatus,
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl From<Quotation> for QuotationResponse {
    fn from(quotation: Quotation) -> Self {
        QuotationResponse {
            storage_id: quotation.id.map(|id| id.to_hex()),
            id: quotation.quote_id,
            client_name: quotation.client_name,
            quote_number: quotation.quote_number,
            currency: quotation.currency,
            valid_until: quotation.valid_until,
            status: quotation.status,
            parts: quotation.parts,
            created_at: quotation.created_at,
            updated_at: quotation.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PreviewFormat {
    #[default]
    Text,
    Html,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreviewQuery {
    #[serde(default)]
    pub format: PreviewFormat,
}

/// Flattens validator output into `path: message` lines, sorted by path.
///
/// Paths use the JSON field names, e.g. `parts[0].priceQuantities[0].price`.
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages = Vec::new();
    collect_messages("", errors, &mut messages);
    messages.sort();
    messages
}

fn collect_messages(prefix: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let field = json_field_name(field);
        let path = if prefix.is_empty() { field } else { format!("{}.{}", prefix, field) };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    out.push(format!("{}: {}", path, message));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_messages(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_messages(&format!("{}[{}]", path, index), nested, out);
                }
            }
        }
    }
}

/// `price_quantities` -> `priceQuantities`; camelCase input is returned unchanged.
fn json_field_name(field: &str) -> String {
    let mut name = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            name.extend(c.to_uppercase());
            upper = false;
        } else {
            name.push(c);
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_body() -> serde_json::Value {
        json!({
            "id": "  Q-1001 ",
            "clientName": "Acme",
            "quoteNumber": "QN-1",
            "currency": "USD",
            "validUntil": "2026-12-31",
            "status": "APPROVED",
            "parts": [{
                "partName": "Bolt",
                "moq": 10,
                "priceQuantities": [{ "quantity": 10, "price": 1.25 }]
            }]
        })
    }

    #[test]
    fn test_create_forces_draft_and_trims() {
        let request: CreateQuotationRequest = serde_json::from_value(create_body()).unwrap();
        let quotation = request.into_quotation().unwrap();
        assert_eq!(quotation.status, QuoteStatus::Draft);
        assert_eq!(quotation.quote_id, "Q-1001");
        assert_eq!(quotation.parts[0].price_quantities[0].price, 1.25);
    }

    #[test]
    fn test_create_lists_every_violation() {
        let mut body = create_body();
        body["clientName"] = json!("   ");
        body["currency"] = json!("EUR");
        body["parts"][0]["moq"] = json!(0);
        body["parts"][0]["priceQuantities"][0]["price"] = json!(-1);
        let request: CreateQuotationRequest = serde_json::from_value(body).unwrap();

        match request.into_quotation() {
            Err(ServiceError::Validation(messages)) => {
                assert_eq!(
                    messages,
                    vec![
                        "clientName: Client name cannot be empty",
                        "currency: Currency must be either INR or USD",
                        "parts[0].moq: MOQ must be a positive integer",
                        "parts[0].priceQuantities[0].price: Price must be a positive number",
                    ]
                );
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_moq_beyond_u32_rejected() {
        let mut body = create_body();
        body["parts"][0]["moq"] = json!(5_000_000_000_i64);
        let request: CreateQuotationRequest = serde_json::from_value(body).unwrap();
        match request.into_quotation() {
            Err(ServiceError::Validation(messages)) => {
                assert_eq!(messages, vec!["parts[0].moq: MOQ must be a positive integer"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        let request: UpdateQuotationRequest = serde_json::from_value(json!({
            "parts": [{ "partName": "Bolt", "moq": 4_294_967_296_i64, "priceQuantities": [] }]
        }))
        .unwrap();
        assert!(matches!(request.into_update(), Err(ServiceError::Validation(_))));

        let mut body = create_body();
        body["parts"][0]["moq"] = json!(u32::MAX);
        let request: CreateQuotationRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.into_quotation().unwrap().parts[0].moq, u32::MAX);
    }

    #[test]
    fn test_moq_conversion_is_checked() {
        let part = PartRequest { part_name: "Bolt".to_string(), moq: i64::MAX, price_quantities: vec![] };
        match into_parts(vec![part]) {
            Err(ServiceError::Validation(messages)) => {
                assert_eq!(messages, vec!["parts[0].moq: MOQ must be a positive integer"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_json_field_names() {
        assert_eq!(json_field_name("price_quantities"), "priceQuantities");
        assert_eq!(json_field_name("clientName"), "clientName");
        assert_eq!(json_field_name("moq"), "moq");
    }

    #[test]
    fn test_document_keeps_supplied_status() {
        let request: CreateQuotationRequest = serde_json::from_value(create_body()).unwrap();
        assert_eq!(request.into_document().unwrap().status, QuoteStatus::Approved);
    }

    #[test]
    fn test_create_rejects_unknown_status() {
        let mut body = create_body();
        body["status"] = json!("ARCHIVED");
        let request: CreateQuotationRequest = serde_json::from_value(body).unwrap();
        assert!(matches!(request.into_quotation(), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn test_update_drops_quote_number_and_status() {
        let request: UpdateQuotationRequest = serde_json::from_value(json!({
            "clientName": " Globex ",
            "quoteNumber": "QN-CHANGED",
            "status": "APPROVED"
        }))
        .unwrap();
        let update = request.into_update().unwrap();
        assert_eq!(update.client_name.as_deref(), Some("Globex"));
        let set = update.to_set_document("2026-01-01T00:00:00.000Z").unwrap();
        assert!(!set.contains_key("quoteNumber"));
        assert!(!set.contains_key("status"));
    }

    #[test]
    fn test_update_validates_present_fields() {
        let request: UpdateQuotationRequest = serde_json::from_value(json!({ "currency": "GBP" })).unwrap();
        assert!(matches!(request.into_update(), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn test_list_query_defaults_and_limits() {
        let query = ListQuery::default();
        assert_eq!((query.page(), query.limit()), (1, 10));

        let query = ListQuery {
            page: Some("abc".to_string()),
            limit: Some("500".to_string()),
            ..ListQuery::default()
        };
        assert_eq!((query.page(), query.limit()), (1, 100));

        let query = ListQuery { page: Some("0".to_string()), ..ListQuery::default() };
        assert_eq!(query.page(), 1);
    }

    #[test]
    fn test_list_query_status_filter() {
        let query = ListQuery { status: Some("SENT".to_string()), ..ListQuery::default() };
        assert_eq!(query.filter().unwrap().status, Some(QuoteStatus::Sent));

        let query = ListQuery { status: Some("sent".to_string()), ..ListQuery::default() };
        assert!(matches!(query.filter(), Err(ServiceError::Lifecycle(_))));
    }

    #[test]
    fn test_pagination_pages_round_up() {
        assert_eq!(Pagination::new(21, 1, 10).pages, 3);
        assert_eq!(Pagination::new(0, 1, 10).pages, 0);
    }
}
