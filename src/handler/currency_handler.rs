use axum::{extract::State, Json};
use std::sync::Arc;

use crate::service::currency_service::{ConversionRateCache, RateSnapshot};

pub async fn conversion_rate_handler(State(cache): State<Arc<ConversionRateCache>>) -> Json<RateSnapshot> {
    Json(cache.current().await)
}
