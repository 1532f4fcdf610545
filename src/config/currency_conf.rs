use std::env;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::{parse_var, ConfigError};

/// Exchange-rate polling configuration
#[derive(Debug, Clone)]
pub struct CurrencyConfig {
    /// ExchangeRate-API key; without one only the fallback rate is served
    pub api_key: Option<String>,
    pub api_url: String,
    pub base: String,
    pub target: String,
    /// Served until the first successful fetch
    pub fallback_rate: f64,
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
}

impl CurrencyConfig {
    /// Load currency configuration from environment variables
    ///
    /// - EXCHANGE_RATE_API_KEY (optional)
    /// - EXCHANGE_RATE_API_URL (defaults to https://v6.exchangerate-api.com/v6)
    /// - CURRENCY_BASE / CURRENCY_TARGET (default USD / INR)
    /// - CURRENCY_FALLBACK_RATE (defaults to 83.0)
    /// - CURRENCY_REFRESH_HOURS (defaults to 24)
    /// - CURRENCY_REQUEST_TIMEOUT (seconds, defaults to 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading currency configuration from environment variables");
        let defaults = CurrencyConfig::default();

        let api_key = env::var("EXCHANGE_RATE_API_KEY").ok().filter(|key| !key.is_empty());
        if api_key.is_none() {
            warn!("EXCHANGE_RATE_API_KEY not set, the fallback conversion rate will be served");
        }

        let api_url = env::var("EXCHANGE_RATE_API_URL").unwrap_or(defaults.api_url);
        let base = env::var("CURRENCY_BASE").unwrap_or(defaults.base);
        let target = env::var("CURRENCY_TARGET").unwrap_or(defaults.target);

        let fallback_rate = parse_var("CURRENCY_FALLBACK_RATE", defaults.fallback_rate)?;
        let refresh_hours: u64 = parse_var("CURRENCY_REFRESH_HOURS", 24)?;
        let timeout_secs: u64 = parse_var("CURRENCY_REQUEST_TIMEOUT", 10)?;

        let config = CurrencyConfig {
            api_key,
            api_url,
            base,
            target,
            fallback_rate,
            refresh_interval: refresh_interval_from_hours(refresh_hours)?,
            request_timeout: Duration::from_secs(timeout_secs),
        };
        config.validate()?;
        debug!(base = %config.base, target = %config.target, "Currency configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fallback_rate.is_finite() && self.fallback_rate > 0.0) {
            error!("Fallback conversion rate must be a positive number");
            return Err(ConfigError::ValidationError(
                "CURRENCY_FALLBACK_RATE must be a positive number".to_string(),
            ));
        }
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "CURRENCY_REFRESH_HOURS must be greater than 0".to_string(),
            ));
        }
        if self.base.len() != 3 || self.target.len() != 3 {
            return Err(ConfigError::ValidationError(
                "Currency codes must be three-letter ISO codes".to_string(),
            ));
        }
        Ok(())
    }
}

fn refresh_interval_from_hours(hours: u64) -> Result<Duration, ConfigError> {
    hours.checked_mul(3600).map(Duration::from_secs).ok_or_else(|| {
        error!("CURRENCY_REFRESH_HOURS is too large: {}", hours);
        ConfigError::InvalidValue(format!("CURRENCY_REFRESH_HOURS is too large: {}", hours))
    })
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        CurrencyConfig {
            api_key: None,
            api_url: "https://v6.exchangerate-api.com/v6".to_string(),
            base: "USD".to_string(),
            target: "INR".to_string(),
            fallback_rate: 83.0,
            refresh_interval: Duration::from_secs(24 * 3600),
            request_timeout: Duration::from_secs(10),
        }
    }
}
