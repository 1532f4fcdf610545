use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::ConfigError;

/// How the price table lands in the `{{PRICE_TABLE}}` placeholder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriceTableLayout {
    /// Fixed-width text block
    #[default]
    Text,
    /// Native Docs table filled cell by cell
    Grid,
}

impl FromStr for PriceTableLayout {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(PriceTableLayout::Text),
            "grid" => Ok(PriceTableLayout::Grid),
            _ => Err(ConfigError::InvalidValue(format!(
                "GOOGLE_DOCS_PRICE_TABLE must be text or grid, got {}",
                s
            ))),
        }
    }
}

/// Google Docs / Drive settings for PDF generation
#[derive(Debug, Clone)]
pub struct DocsConfig {
    /// Drive file id of the quotation template document
    pub template_id: String,
    /// OAuth bearer token with Docs and Drive scopes
    pub access_token: String,
    pub docs_api_url: String,
    pub drive_api_url: String,
    pub price_table_layout: PriceTableLayout,
    pub request_timeout: Duration,
}

impl DocsConfig {
    /// Load document generation configuration from environment variables
    ///
    /// - GOOGLE_DOCS_TEMPLATE_ID (required)
    /// - GOOGLE_ACCESS_TOKEN (required)
    /// - GOOGLE_DOCS_API_URL (defaults to https://docs.googleapis.com/v1)
    /// - GOOGLE_DRIVE_API_URL (defaults to https://www.googleapis.com/drive/v3)
    /// - GOOGLE_DOCS_PRICE_TABLE, `text` or `grid` (defaults to text)
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading document generation configuration from environment variables");

        let template_id = required("GOOGLE_DOCS_TEMPLATE_ID")?;
        let access_token = required("GOOGLE_ACCESS_TOKEN")?;
        let docs_api_url = env::var("GOOGLE_DOCS_API_URL")
            .unwrap_or_else(|_| "https://docs.googleapis.com/v1".to_string());
        let drive_api_url = env::var("GOOGLE_DRIVE_API_URL")
            .unwrap_or_else(|_| "https://www.googleapis.com/drive/v3".to_string());
        let price_table_layout = match env::var("GOOGLE_DOCS_PRICE_TABLE") {
            Ok(raw) => raw.parse().map_err(|e| {
                error!("Invalid GOOGLE_DOCS_PRICE_TABLE: {}", raw);
                e
            })?,
            Err(_) => PriceTableLayout::default(),
        };
        debug!(%template_id, %docs_api_url, %drive_api_url, ?price_table_layout, "Document generation configuration loaded");

        Ok(DocsConfig {
            template_id,
            access_token,
            docs_api_url: docs_api_url.trim_end_matches('/').to_string(),
            drive_api_url: drive_api_url.trim_end_matches('/').to_string(),
            price_table_layout,
            request_timeout: Duration::from_secs(30),
        })
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => {
            error!("{} environment variable not found", name);
            Err(ConfigError::EnvVarNotFound(name.to_string()))
        }
    }
}
