use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use crate::dto::quotation_dto::{
    CreateQuotationRequest, ListQuery, PaginatedResponse, Pagination, PreviewFormat, PreviewQuery,
    QuotationResponse, StatusChangeRequest, UpdateQuotationRequest,
};
use crate::service::quotation_service::QuotationService;
use crate::util::error::{HandlerError, HandlerErrorKind};
use crate::util::google_docs::pdf_file_name;

pub type QuotationServiceState = Arc<dyn QuotationService>;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, HandlerError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        debug!("Rejected request body: {}", rejection);
        HandlerError::new(HandlerErrorKind::BadRequest, "Invalid request body").with_details(rejection.body_text())
    })
}

fn query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, HandlerError> {
    query.map(|Query(value)| value).map_err(|rejection| {
        HandlerError::new(HandlerErrorKind::BadRequest, "Invalid query string").with_details(rejection.body_text())
    })
}

pub async fn list_quotations_handler(
    State(service): State<QuotationServiceState>,
    params: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<QuotationResponse>>, HandlerError> {
    let params = query(params)?;
    let filter = params.filter()?;
    let (page, limit) = (params.page(), params.limit());

    let (quotations, total) = service.list_quotations(&filter, page, limit).await?;
    Ok(Json(PaginatedResponse {
        data: quotations.into_iter().map(QuotationResponse::from).collect(),
        pagination: Pagination::new(total, page, limit),
    }))
}

pub async fn get_quotation_handler(
    State(service): State<QuotationServiceState>,
    Path(id): Path<String>,
) -> Result<Json<QuotationResponse>, HandlerError> {
    let quotation = service.get_quotation(&id).await?;
    Ok(Json(quotation.into()))
}

pub async fn create_quotation_handler(
    State(service): State<QuotationServiceState>,
    payload: Result<Json<CreateQuotationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<QuotationResponse>), HandlerError> {
    let quotation = body(payload)?.into_quotation()?;
    let created = service.create_quotation(quotation).await?;
    info!(quote_number = %created.quote_number, "Quotation created via API");
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn update_quotation_handler(
    State(service): State<QuotationServiceState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateQuotationRequest>, JsonRejection>,
) -> Result<Json<QuotationResponse>, HandlerError> {
    let update = body(payload)?.into_update()?;
    let updated = service.update_quotation(&id, update).await?;
    Ok(Json(updated.into()))
}

pub async fn delete_quotation_handler(
    State(service): State<QuotationServiceState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, HandlerError> {
    service.delete_quotation(&id).await?;
    Ok(Json(json!({ "message": "Quotation deleted successfully" })))
}

pub async fn change_status_handler(
    State(service): State<QuotationServiceState>,
    Path(id): Path<String>,
    payload: Result<Json<StatusChangeRequest>, JsonRejection>,
) -> Result<Json<QuotationResponse>, HandlerError> {
    let request = body(payload)?;
    let updated = service.change_status(&id, &request.status).await?;
    Ok(Json(updated.into()))
}

pub async fn preview_quotation_handler(
    State(service): State<QuotationServiceState>,
    Path(id): Path<String>,
    params: Result<Query<PreviewQuery>, QueryRejection>,
) -> Result<Response, HandlerError> {
    let format = query(params)?.format;
    let rendered = service.preview(&id, format).await?;
    let content_type = match format {
        PreviewFormat::Text => "text/plain; charset=utf-8",
        PreviewFormat::Html => "text/html; charset=utf-8",
    };
    Ok(([(header::CONTENT_TYPE, content_type)], rendered).into_response())
}

fn attachment_header(file_name: &str) -> Result<HeaderValue, HandlerError> {
    let disposition = format!("attachment; filename=\"{}\"", file_name.replace('"', "'"));
    HeaderValue::from_str(&disposition).map_err(|e| {
        HandlerError::new(HandlerErrorKind::BadRequest, "Quotation id or client name cannot be used as a file name")
            .with_details(e.to_string())
    })
}

/// Renders an unsaved quotation payload to PDF and returns it as an attachment.
pub async fn generate_pdf_handler(
    State(service): State<QuotationServiceState>,
    payload: Result<Json<CreateQuotationRequest>, JsonRejection>,
) -> Result<Response, HandlerError> {
    let quotation = body(payload)?.into_document()?;
    let disposition = attachment_header(&pdf_file_name(&quotation.quote_id, &quotation.client_name))?;
    let pdf = service.generate_pdf(&quotation).await?;

    let mut response = pdf.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}
