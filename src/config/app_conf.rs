use std::env;
use tracing::{debug, warn};

use crate::config::ConfigError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Contact address advertised by `/` and `/health`
    pub support_email: String,
    pub api_version: String,
    /// Allowed CORS origin, `*` for any
    pub cors_origin: String,
}

impl AppConfig {
    /// Load server configuration from environment variables
    ///
    /// - APP_HOST (defaults to 127.0.0.1)
    /// - APP_PORT (defaults to 3000)
    /// - SUPPORT_EMAIL (defaults to support@example.com)
    /// - API_VERSION (defaults to 1.0.0)
    /// - CORS_ORIGIN (defaults to *)
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = match env::var("APP_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| ConfigError::ParseError(format!("Invalid APP_PORT '{}': {}", raw, e)))?,
            Err(_) => {
                warn!("APP_PORT not set, using default: 3000");
                3000
            }
        };
        let support_email = env::var("SUPPORT_EMAIL").unwrap_or_else(|_| "support@example.com".to_string());
        let api_version = env::var("API_VERSION").unwrap_or_else(|_| "1.0.0".to_string());
        let cors_origin = env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".to_string());
        debug!(%host, port, %cors_origin, "App configuration loaded");

        Ok(AppConfig { host, port, support_email, api_version, cors_origin })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            support_email: "support@example.com".to_string(),
            api_version: "1.0.0".to_string(),
            cors_origin: "*".to_string(),
        }
    }
}
