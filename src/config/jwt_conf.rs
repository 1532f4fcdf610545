use std::env;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;

/// Secrets shorter than this still work but are reported at startup.
const RECOMMENDED_SECRET_LEN: usize = 32;

/// JWT configuration structure
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared secret the bearer tokens are signed with (HS256)
    pub jwt_secret: String,
    /// Lifetime in minutes of tokens minted by this service
    pub token_expiration: i64,
    /// Expected `iss` claim (optional)
    pub jwt_issuer: Option<String>,
    /// Expected `aud` claim (optional)
    pub jwt_audience: Option<String>,
}

impl JwtConfig {
    /// Load JWT configuration from environment variables
    ///
    /// Expected environment variables:
    /// - JWT_SECRET: Secret key tokens are verified against (required)
    /// - JWT_TOKEN_EXPIRY: Lifetime of minted tokens in minutes (defaults to 60)
    /// - JWT_ISSUER: Required issuer claim (optional)
    /// - JWT_AUDIENCE: Required audience claim (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_prefixed_env("")
    }

    /// Same as [`JwtConfig::from_env`] but reads `TEST_`-prefixed variables
    pub fn from_test_env() -> Result<Self, ConfigError> {
        Self::from_prefixed_env("TEST_")
    }

    fn from_prefixed_env(prefix: &str) -> Result<Self, ConfigError> {
        info!("Loading {}JWT configuration from environment variables", prefix);

        let secret_var = format!("{prefix}JWT_SECRET");
        let jwt_secret = env::var(&secret_var).map_err(|_| {
            error!("{} environment variable not found", secret_var);
            ConfigError::EnvVarNotFound(secret_var.clone())
        })?;
        debug!("JWT secret loaded (length: {} chars)", jwt_secret.len());

        let expiry_var = format!("{prefix}JWT_TOKEN_EXPIRY");
        let token_expiration = env::var(&expiry_var)
            .unwrap_or_else(|_| {
                warn!("{} not set, using default: 60 minutes", expiry_var);
                "60".to_string()
            })
            .parse::<i64>()
            .map_err(|e| {
                error!("Invalid {} value: {}", expiry_var, e);
                ConfigError::ParseError(format!("{}: {}", expiry_var, e))
            })?;

        let jwt_issuer = env::var(format!("{prefix}JWT_ISSUER")).ok();
        let jwt_audience = env::var(format!("{prefix}JWT_AUDIENCE")).ok();
        debug!(issuer = ?jwt_issuer, audience = ?jwt_audience, "JWT claim expectations");

        let config = JwtConfig {
            jwt_secret,
            token_expiration,
            jwt_issuer,
            jwt_audience,
        };
        config.validate()?;

        info!("JWT configuration loaded successfully");
        Ok(config)
    }

    /// Validate the JWT configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            error!("JWT secret cannot be empty");
            return Err(ConfigError::ValidationError("JWT secret cannot be empty".to_string()));
        }

        if self.jwt_secret.len() < RECOMMENDED_SECRET_LEN {
            warn!(
                "JWT secret is shorter than the recommended {} characters",
                RECOMMENDED_SECRET_LEN
            );
        }

        if self.token_expiration <= 0 {
            error!("Token expiration must be greater than 0");
            return Err(ConfigError::ValidationError("Token expiration must be greater than 0".to_string()));
        }

        Ok(())
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        JwtConfig {
            jwt_secret: "test_secret_key_for_jwt_testing_should_be_long_enough_for_security_purposes".to_string(),
            token_expiration: 60,
            jwt_issuer: None,
            jwt_audience: None,
        }
    }
}
