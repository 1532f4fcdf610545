use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::repository::repository_error::RepositoryError;
use crate::service::lifecycle::LifecycleError;
use crate::util::google_docs::DocumentError;

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum HandlerErrorKind {
    NotFound,
    Validation,
    Internal,
    Unauthorized,
    Conflict,
    BadRequest,
    ServiceUnavailable,
    BadGateway,
}

impl std::fmt::Display for HandlerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HandlerErrorKind::NotFound => "NotFound",
            HandlerErrorKind::Validation => "Validation",
            HandlerErrorKind::Internal => "Internal",
            HandlerErrorKind::Unauthorized => "Unauthorized",
            HandlerErrorKind::Conflict => "Conflict",
            HandlerErrorKind::BadRequest => "BadRequest",
            HandlerErrorKind::ServiceUnavailable => "ServiceUnavailable",
            HandlerErrorKind::BadGateway => "BadGateway",
        };
        write!(f, "{}", s)
    }
}

impl HandlerErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            HandlerErrorKind::NotFound => StatusCode::NOT_FOUND,
            HandlerErrorKind::Validation | HandlerErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            HandlerErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            HandlerErrorKind::Conflict => StatusCode::CONFLICT,
            HandlerErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            HandlerErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            HandlerErrorKind::BadGateway => StatusCode::BAD_GATEWAY,
        }
    }
}

/// JSON error body returned by every handler: `{ error, message, details }`.
#[derive(Debug, Serialize)]
pub struct HandlerError {
    pub error: HandlerErrorKind,
    pub message: String,
    pub details: Option<String>,
}

impl HandlerError {
    pub fn new(error: HandlerErrorKind, message: impl Into<String>) -> Self {
        HandlerError { error, message: message.into(), details: None }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for HandlerError {}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        (self.error.status_code(), axum::Json(self)).into_response()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidInput(String),
    /// Payload rule violations, one entry per offending field.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("Internal Error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateKey(field) => {
                ServiceError::Conflict(format!("Duplicate value for {}. Please use another value.", field))
            }
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<ServiceError> for HandlerError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => HandlerError::new(HandlerErrorKind::NotFound, msg),
            ServiceError::InvalidInput(msg) => HandlerError::new(HandlerErrorKind::BadRequest, msg),
            ServiceError::Validation(fields) => {
                HandlerError::new(HandlerErrorKind::Validation, "Validation failed").with_details(fields.join("; "))
            }
            ServiceError::Lifecycle(err) => HandlerError::new(HandlerErrorKind::BadRequest, err.to_string()),
            ServiceError::Conflict(msg) => HandlerError::new(HandlerErrorKind::Conflict, msg),
            ServiceError::Document(DocumentError::NotConfigured) => HandlerError::new(
                HandlerErrorKind::ServiceUnavailable,
                DocumentError::NotConfigured.to_string(),
            ),
            ServiceError::Document(err) => {
                error!("Document export failed: {}", err);
                HandlerError::new(HandlerErrorKind::BadGateway, "Failed to generate PDF").with_details(err.to_string())
            }
            ServiceError::Internal(msg) => {
                error!("Internal error: {}", msg);
                HandlerError::new(HandlerErrorKind::Internal, "Internal server error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::quote_status::QuoteStatus;

    #[test]
    fn test_duplicate_key_maps_to_conflict() {
        let err: HandlerError = ServiceError::from(RepositoryError::DuplicateKey("quoteNumber".to_string())).into();
        assert_eq!(err.error, HandlerErrorKind::Conflict);
        assert_eq!(err.message, "Duplicate value for quoteNumber. Please use another value.");
    }

    #[test]
    fn test_other_repository_errors_are_internal() {
        for err in [
            RepositoryError::DatabaseError("write concern".to_string()),
            RepositoryError::ConnectionError("server selection timeout".to_string()),
            RepositoryError::SerializationError("bad document".to_string()),
        ] {
            let handler: HandlerError = ServiceError::from(err).into();
            assert_eq!(handler.error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_lifecycle_error_keeps_message() {
        let err: HandlerError = ServiceError::from(LifecycleError::InvalidTransition {
            from: QuoteStatus::Approved,
            to: QuoteStatus::Draft,
        })
        .into();
        assert_eq!(err.error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Cannot change status from APPROVED to DRAFT");
    }

    #[test]
    fn test_document_errors_map_to_gateway_statuses() {
        let unavailable: HandlerError = ServiceError::from(DocumentError::NotConfigured).into();
        assert_eq!(unavailable.error.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let upstream: HandlerError = ServiceError::from(DocumentError::Upstream {
            step: "export",
            status: 500,
            body: "boom".to_string(),
        })
        .into();
        assert_eq!(upstream.error.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_internal_message_is_not_leaked() {
        let err: HandlerError = ServiceError::Internal("connection reset".to_string()).into();
        assert_eq!(err.message, "Internal server error");
        assert!(err.details.is_none());
    }
}
