use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::util::uptime::format_uptime;

pub struct HealthState {
    pub started_at: Instant,
    pub support_email: String,
    pub api_version: String,
}

impl HealthState {
    pub fn new(config: &AppConfig) -> Self {
        HealthState {
            started_at: Instant::now(),
            support_email: config.support_email.clone(),
            api_version: config.api_version.clone(),
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub async fn welcome_handler(State(state): State<Arc<HealthState>>) -> Json<Value> {
    Json(json!({
        "message": "Welcome to the Quote Builder API",
        "date": now(),
        "supportEmail": state.support_email,
        "API Version": state.api_version,
    }))
}

pub async fn health_handler(State(state): State<Arc<HealthState>>) -> Json<Value> {
    Json(json!({
        "status": 200,
        "message": "Server is healthy",
        "uptime": format_uptime(state.started_at.elapsed().as_secs()),
        "date": now(),
        "supportEmail": state.support_email,
        "API Version": state.api_version,
    }))
}
