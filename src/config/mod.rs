pub mod app_conf;
pub mod currency_conf;
pub mod docs_conf;
pub mod jwt_conf;
pub mod mongo_conf;

pub use app_conf::AppConfig;
pub use currency_conf::CurrencyConfig;
pub use docs_conf::{DocsConfig, PriceTableLayout};
pub use jwt_conf::JwtConfig;
pub use mongo_conf::MongoConfig;

use tracing::error;

/// Common configuration error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Parses `name` from the environment, or returns `default` when it is unset.
pub(crate) fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e| {
            error!("Invalid {} value: {}", name, e);
            ConfigError::ParseError(format!("{}: {}", name, e))
        }),
        Err(_) => Ok(default),
    }
}
