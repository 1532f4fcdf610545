//! ExchangeRate-API client used to refresh the conversion-rate cache.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::CurrencyConfig;

#[derive(Debug, Error)]
pub enum RateFetchError {
    #[error("No exchange-rate API key configured")]
    MissingApiKey,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rate request failed with status {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("rate API reported {0}")]
    Api(String),
    #[error("rate API returned an unusable rate: {0}")]
    InvalidRate(f64),
}

/// Source of live conversion rates.
#[async_trait]
pub trait RateFetcher: Send + Sync {
    async fn fetch_rate(&self, base: &str, target: &str) -> Result<f64, RateFetchError>;
}

#[derive(Debug, Deserialize)]
struct PairResponse {
    result: String,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    conversion_rate: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ExchangeRateApiFetcher {
    api_url: String,
    api_key: Option<String>,
    http: Client,
}

impl ExchangeRateApiFetcher {
    pub fn new(config: &CurrencyConfig) -> Result<Self, RateFetchError> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            http,
        })
    }
}

#[async_trait]
impl RateFetcher for ExchangeRateApiFetcher {
    #[instrument(skip(self))]
    async fn fetch_rate(&self, base: &str, target: &str) -> Result<f64, RateFetchError> {
        let api_key = self.api_key.as_deref().ok_or(RateFetchError::MissingApiKey)?;
        let url = format!("{}/{}/pair/{}/{}", self.api_url, api_key, base, target);

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RateFetchError::Upstream { status, body });
        }

        let parsed: PairResponse = response.json().await?;
        if parsed.result != "success" {
            return Err(RateFetchError::Api(parsed.error_type.unwrap_or(parsed.result)));
        }
        match parsed.conversion_rate {
            Some(rate) if rate.is_finite() && rate > 0.0 => {
                debug!(rate, "Fetched conversion rate");
                Ok(rate)
            }
            Some(rate) => Err(RateFetchError::InvalidRate(rate)),
            None => Err(RateFetchError::Api("missing conversion_rate".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(server: &MockServer, api_key: Option<&str>) -> ExchangeRateApiFetcher {
        ExchangeRateApiFetcher::new(&CurrencyConfig {
            api_key: api_key.map(str::to_string),
            api_url: format!("{}/v6", server.uri()),
            ..CurrencyConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_reads_conversion_rate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6/secret/pair/USD/INR"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": "success",
                "base_code": "USD",
                "target_code": "INR",
                "conversion_rate": 84.12
            })))
            .mount(&server)
            .await;

        let rate = fetcher(&server, Some("secret")).fetch_rate("USD", "INR").await.unwrap();
        assert_eq!(rate, 84.12);
    }

    #[tokio::test]
    async fn test_api_error_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6/bad/pair/USD/INR"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": "error",
                "error-type": "invalid-key"
            })))
            .mount(&server)
            .await;

        let err = fetcher(&server, Some("bad")).fetch_rate("USD", "INR").await.unwrap_err();
        assert!(matches!(err, RateFetchError::Api(ref kind) if kind == "invalid-key"));
    }

    #[tokio::test]
    async fn test_missing_key_skips_request() {
        let server = MockServer::start().await;
        let err = fetcher(&server, None).fetch_rate("USD", "INR").await.unwrap_err();
        assert!(matches!(err, RateFetchError::MissingApiKey));
    }
}
