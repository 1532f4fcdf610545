use axum::{routing::get, Router};
use std::sync::Arc;

use crate::handler::health_handler::{health_handler, welcome_handler, HealthState};

pub fn health_router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/", get(welcome_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}
