use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::JwtConfig;

/// Claims carried by bearer tokens.
///
/// Tokens are issued elsewhere, so every registered claim is optional; an
/// `exp` is enforced only when present.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Claims {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// A single audience or a list of them.
    pub aud: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to encode JWT token: {0}")]
    EncodingFailed(String),
    #[error("Failed to decode JWT token: {0}")]
    DecodingFailed(String),
    #[error("Token has expired")]
    TokenExpired,
    #[error("Invalid token format")]
    InvalidToken,
}

pub trait JwtTokenUtils: Send + Sync {
    fn generate_access_token(&self, subject: &str) -> Result<String, JwtError>;
    fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError>;
    fn extract_token_from_header(&self, auth_header: &str) -> Result<String, JwtError>;
}

#[derive(Debug, Clone)]
pub struct JwtTokenUtilsImpl {
    pub jwt_config: JwtConfig,
}

impl JwtTokenUtilsImpl {
    pub fn new(jwt_config: JwtConfig) -> Self {
        JwtTokenUtilsImpl { jwt_config }
    }

    /// A configured issuer or audience must be present in the token, not merely match when sent.
    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        match &self.jwt_config.jwt_audience {
            Some(audience) => {
                validation.set_audience(&[audience]);
                validation.required_spec_claims.insert("aud".to_string());
            }
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &self.jwt_config.jwt_issuer {
            validation.set_issuer(&[issuer]);
            validation.required_spec_claims.insert("iss".to_string());
        }
        validation
    }
}

impl JwtTokenUtils for JwtTokenUtilsImpl {
    fn generate_access_token(&self, subject: &str) -> Result<String, JwtError> {
        debug!("Generating access token for subject: {}", subject);

        let now = Utc::now();
        let expiration = now + Duration::minutes(self.jwt_config.token_expiration);
        let claims = Claims {
            sub: Some(subject.to_string()),
            iat: Some(now.timestamp()),
            exp: Some(expiration.timestamp()),
            iss: self.jwt_config.jwt_issuer.clone(),
            aud: self.jwt_config.jwt_audience.clone().map(serde_json::Value::String),
            jti: Some(Uuid::new_v4().to_string()),
        };

        let encoding_key = EncodingKey::from_secret(self.jwt_config.jwt_secret.as_bytes());
        encode(&Header::new(Algorithm::HS256), &claims, &encoding_key)
            .map(|token| {
                info!("Generated access token for subject: {}", subject);
                token
            })
            .map_err(|err| {
                error!("Failed to encode JWT token: {}", err);
                JwtError::EncodingFailed(err.to_string())
            })
    }

    fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        debug!("Validating JWT token");

        let decoding_key = DecodingKey::from_secret(self.jwt_config.jwt_secret.as_bytes());
        match decode::<Claims>(token, &decoding_key, &self.validation()) {
            Ok(token_data) => {
                debug!("Token validation successful for subject: {:?}", token_data.claims.sub);
                Ok(token_data.claims)
            }
            Err(err) => match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    warn!("Rejected expired token");
                    Err(JwtError::TokenExpired)
                }
                _ => {
                    warn!("Failed to decode JWT token: {}", err);
                    Err(JwtError::DecodingFailed(err.to_string()))
                }
            },
        }
    }

    fn extract_token_from_header(&self, auth_header: &str) -> Result<String, JwtError> {
        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            debug!("Authorization header is not a Bearer credential");
            JwtError::InvalidToken
        })?;

        let token = token.trim();
        if token.is_empty() {
            debug!("Empty token in authorization header");
            return Err(JwtError::InvalidToken);
        }
        Ok(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utils() -> JwtTokenUtilsImpl {
        JwtTokenUtilsImpl::new(JwtConfig::default())
    }

    #[test]
    fn test_generated_token_validates() {
        let utils = utils();
        let token = utils.generate_access_token("sales-team").unwrap();
        let claims = utils.validate_access_token(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("sales-team"));
    }

    #[test]
    fn test_token_signed_with_other_secret_rejected() {
        let other = JwtTokenUtilsImpl::new(JwtConfig {
            jwt_secret: "a_completely_different_secret_of_sufficient_length".to_string(),
            ..JwtConfig::default()
        });
        let token = other.generate_access_token("intruder").unwrap();
        assert!(matches!(utils().validate_access_token(&token), Err(JwtError::DecodingFailed(_))));
    }

    #[test]
    fn test_token_without_exp_accepted() {
        let utils = utils();
        let claims = Claims { sub: Some("tool".to_string()), ..Claims::default() };
        let key = EncodingKey::from_secret(utils.jwt_config.jwt_secret.as_bytes());
        let token = encode(&Header::new(Algorithm::HS256), &claims, &key).unwrap();
        assert!(utils.validate_access_token(&token).is_ok());
    }

    #[test]
    fn test_expired_token_rejected() {
        let utils = utils();
        let claims = Claims {
            sub: Some("old".to_string()),
            exp: Some(Utc::now().timestamp() - 3600),
            ..Claims::default()
        };
        let key = EncodingKey::from_secret(utils.jwt_config.jwt_secret.as_bytes());
        let token = encode(&Header::new(Algorithm::HS256), &claims, &key).unwrap();
        assert!(matches!(utils.validate_access_token(&token), Err(JwtError::TokenExpired)));
    }

    #[test]
    fn test_configured_claims_are_required() {
        let utils = JwtTokenUtilsImpl::new(JwtConfig {
            jwt_issuer: Some("quote-builder".to_string()),
            jwt_audience: Some("quotations".to_string()),
            ..JwtConfig::default()
        });
        let key = EncodingKey::from_secret(utils.jwt_config.jwt_secret.as_bytes());
        let sign = |claims: &Claims| encode(&Header::new(Algorithm::HS256), claims, &key).unwrap();

        let without_aud = Claims { iss: Some("quote-builder".to_string()), ..Claims::default() };
        assert!(matches!(utils.validate_access_token(&sign(&without_aud)), Err(JwtError::DecodingFailed(_))));

        let without_iss = Claims { aud: Some("quotations".into()), ..Claims::default() };
        assert!(matches!(utils.validate_access_token(&sign(&without_iss)), Err(JwtError::DecodingFailed(_))));

        let complete = Claims {
            iss: Some("quote-builder".to_string()),
            aud: Some(serde_json::json!(["quotations", "billing"])),
            ..Claims::default()
        };
        assert!(utils.validate_access_token(&sign(&complete)).is_ok());

        let minted = utils.generate_access_token("sales-team").unwrap();
        let claims = utils.validate_access_token(&minted).unwrap();
        assert_eq!(claims.aud, Some(serde_json::Value::from("quotations")));
    }

    #[test]
    fn test_extract_token_from_header() {
        let utils = utils();
        assert_eq!(utils.extract_token_from_header("Bearer abc.def").unwrap(), "abc.def");
        assert!(utils.extract_token_from_header("Basic abc").is_err());
        assert!(utils.extract_token_from_header("Bearer   ").is_err());
    }
}
