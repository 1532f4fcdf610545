use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

use crate::handler::currency_handler::conversion_rate_handler;
use crate::handler::quotation_handler::{
    change_status_handler, create_quotation_handler, delete_quotation_handler, generate_pdf_handler,
    get_quotation_handler, list_quotations_handler, preview_quotation_handler, update_quotation_handler,
    QuotationServiceState,
};
use crate::middlewares::auth_middleware::{require_auth, AuthState};
use crate::service::currency_service::ConversionRateCache;

/// Every quotation route, nested under `/api/quotations` and guarded by bearer auth.
pub fn quotation_router(
    service: QuotationServiceState,
    rate_cache: Arc<ConversionRateCache>,
    auth_state: Arc<AuthState>,
) -> Router {
    let quotations = Router::new()
        .route("/", get(list_quotations_handler).post(create_quotation_handler))
        .route("/pdf", post(generate_pdf_handler))
        .route(
            "/{id}",
            get(get_quotation_handler)
                .put(update_quotation_handler)
                .delete(delete_quotation_handler),
        )
        .route("/{id}/status", patch(change_status_handler))
        .route("/{id}/preview", get(preview_quotation_handler))
        .with_state(service);

    let currency = Router::new()
        .route("/convrate", get(conversion_rate_handler))
        .with_state(rate_cache);

    let protected = quotations
        .merge(currency)
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth));

    Router::new().nest("/api/quotations", protected)
}
