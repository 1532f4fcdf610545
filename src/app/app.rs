use axum::{
    http::{HeaderValue, Method},
    middleware, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{AppConfig, ConfigError, CurrencyConfig, DocsConfig, JwtConfig, MongoConfig};
use crate::handler::health_handler::HealthState;
use crate::middlewares::auth_middleware::AuthState;
use crate::middlewares::security_headers::security_headers;
use crate::repository::quotation_repo::MongoQuotationRepository;
use crate::repository::repository_error::RepositoryError;
use crate::router::health_router::health_router;
use crate::router::quotation_router::quotation_router;
use crate::service::currency_service::{spawn_refresh_task, ConversionRateCache, SystemClock};
use crate::service::quotation_service::{QuotationService, QuotationServiceImpl};
use crate::util::exchange_rate::{ExchangeRateApiFetcher, RateFetchError};
use crate::util::google_docs::{DocumentError, DocumentExporter, GoogleDocsExporter};
use crate::util::jwt::{JwtTokenUtils, JwtTokenUtilsImpl};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Document exporter error: {0}")]
    Document(#[from] DocumentError),
    #[error("Exchange-rate client error: {0}")]
    RateFetch(#[from] RateFetchError),
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Collaborators the HTTP surface is built from.
pub struct AppDependencies {
    pub quotation_service: Arc<dyn QuotationService>,
    pub rate_cache: Arc<ConversionRateCache>,
    pub jwt_utils: Arc<dyn JwtTokenUtils>,
}

pub struct App {
    config: AppConfig,
    router: Router,
    rate_refresh: JoinHandle<()>,
}

impl App {
    /// Wires every collaborator from the environment and starts the rate refresher.
    pub async fn new() -> Result<Self, AppError> {
        let config = AppConfig::from_env()?;
        let jwt_config = JwtConfig::from_env()?;
        let mongo_config = MongoConfig::from_env()?;
        let currency_config = CurrencyConfig::from_env()?;

        let quotation_repo = Arc::new(MongoQuotationRepository::new(&mongo_config).await?);

        let exporter: Option<Arc<dyn DocumentExporter>> = match DocsConfig::from_env() {
            Ok(docs_config) => Some(Arc::new(GoogleDocsExporter::new(docs_config)?)),
            Err(e) => {
                warn!("PDF generation disabled: {}", e);
                None
            }
        };
        let quotation_service = Arc::new(QuotationServiceImpl::new(quotation_repo, exporter));

        let fetcher = Arc::new(ExchangeRateApiFetcher::new(&currency_config)?);
        let rate_cache = Arc::new(ConversionRateCache::new(&currency_config, fetcher, Arc::new(SystemClock)));
        let rate_refresh = spawn_refresh_task(rate_cache.clone());

        let jwt_utils = Arc::new(JwtTokenUtilsImpl::new(jwt_config));

        let router = Self::build_router(
            &config,
            AppDependencies { quotation_service, rate_cache, jwt_utils },
        )?;
        Ok(App { config, router, rate_refresh })
    }

    /// Full router with CORS, security headers and request tracing applied.
    pub fn build_router(config: &AppConfig, deps: AppDependencies) -> Result<Router, AppError> {
        let auth_state = Arc::new(AuthState { jwt_utils: deps.jwt_utils });
        let health_state = Arc::new(HealthState::new(config));

        let router = Router::new()
            .merge(health_router(health_state))
            .merge(quotation_router(deps.quotation_service, deps.rate_cache, auth_state))
            .layer(middleware::from_fn(security_headers))
            .layer(cors_layer(&config.cors_origin)?)
            .layer(TraceLayer::new_for_http());
        Ok(router)
    }

    pub async fn start(self) -> Result<(), AppError> {
        let host = self
            .config
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("APP_HOST '{}'", self.config.host)))?;
        let addr = SocketAddr::new(host, self.config.port);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Server running at http://{}", addr);
        let served = axum::serve(listener, self.router).await;

        self.rate_refresh.abort();
        served?;
        Ok(())
    }
}

fn cors_layer(origin: &str) -> Result<CorsLayer, ConfigError> {
    let allow_origin = if origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        let origins = origin
            .split(',')
            .map(|o| {
                o.trim()
                    .parse::<HeaderValue>()
                    .map_err(|_| ConfigError::InvalidValue(format!("CORS_ORIGIN '{}'", o)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers(Any))
}
