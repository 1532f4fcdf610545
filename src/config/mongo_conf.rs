use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, error, info};

use crate::config::{parse_var, ConfigError};

/// Where quotations are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    /// Credentials are applied only when both are present
    pub username: Option<String>,
    pub password: Option<String>,
    pub quotation_collection: String,
    pub pool_size: u32,
    pub connection_timeout_secs: u64,
}

impl MongoConfig {
    /// Load MongoDB configuration from environment variables
    ///
    /// - MONGO_URI, MONGO_DATABASE (required)
    /// - MONGO_USERNAME / MONGO_PASSWORD (optional)
    /// - MONGO_QUOTATION_COLLECTION (defaults to "quotations")
    /// - MONGO_POOL_SIZE (defaults to 10)
    /// - MONGO_CONNECTION_TIMEOUT in seconds (defaults to 5)
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading MongoDB configuration from environment variables");
        let defaults = MongoConfig::default();

        let config = MongoConfig {
            uri: required("MONGO_URI")?,
            database: required("MONGO_DATABASE")?,
            username: env::var("MONGO_USERNAME").ok(),
            password: env::var("MONGO_PASSWORD").ok(),
            quotation_collection: env::var("MONGO_QUOTATION_COLLECTION")
                .unwrap_or(defaults.quotation_collection),
            pool_size: parse_var("MONGO_POOL_SIZE", defaults.pool_size)?,
            connection_timeout_secs: parse_var("MONGO_CONNECTION_TIMEOUT", defaults.connection_timeout_secs)?,
        };
        debug!(
            database = %config.database,
            collection = %config.quotation_collection,
            pool_size = config.pool_size,
            authenticated = config.username.is_some(),
            "MongoDB configuration read"
        );

        config.validate()?;
        info!("MongoDB configuration loaded successfully");
        Ok(config)
    }

    /// Local database with a dedicated collection, for tests
    pub fn from_test_env() -> Self {
        MongoConfig {
            database: "quote_builder_test".to_string(),
            quotation_collection: "test_quotations".to_string(),
            pool_size: 2,
            connection_timeout_secs: 2,
            ..MongoConfig::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let problem = if self.uri.is_empty() {
            Some("MongoDB URI cannot be empty")
        } else if self.database.is_empty() {
            Some("MongoDB database cannot be empty")
        } else if self.quotation_collection.is_empty() {
            Some("MongoDB quotation collection cannot be empty")
        } else if self.pool_size == 0 {
            Some("MongoDB pool size must be greater than 0")
        } else if self.connection_timeout_secs == 0 {
            Some("MongoDB connection timeout must be greater than 0")
        } else if self.username.as_deref() == Some("") || self.password.as_deref() == Some("") {
            Some("MongoDB credentials cannot be empty if set")
        } else {
            None
        };

        match problem {
            Some(message) => {
                error!("{}", message);
                Err(ConfigError::ValidationError(message.to_string()))
            }
            None => Ok(()),
        }
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| {
        error!("{} environment variable not found", name);
        ConfigError::EnvVarNotFound(name.to_string())
    })
}

impl Default for MongoConfig {
    fn default() -> Self {
        MongoConfig {
            uri: "mongodb://localhost:27017".to_string(),
            database: "quote_builder".to_string(),
            username: None,
            password: None,
            quotation_collection: "quotations".to_string(),
            pool_size: 10,
            connection_timeout_secs: 5,
        }
    }
}
