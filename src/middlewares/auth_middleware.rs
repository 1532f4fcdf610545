use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::util::error::{HandlerError, HandlerErrorKind};
use crate::util::jwt::JwtTokenUtils;

pub struct AuthState {
    pub jwt_utils: Arc<dyn JwtTokenUtils>,
}

/// Requires a valid `Authorization: Bearer <jwt>` and stores its claims in the
/// request extensions.
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, HandlerError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| state.jwt_utils.extract_token_from_header(header).ok())
        .ok_or_else(|| HandlerError::new(HandlerErrorKind::Unauthorized, "Authentication required"))?;

    let claims = state.jwt_utils.validate_access_token(&token).map_err(|e| {
        debug!("Rejected bearer token: {}", e);
        HandlerError::new(HandlerErrorKind::Unauthorized, "Invalid token")
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
