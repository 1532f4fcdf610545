//! Cached USD→INR (or configured pair) conversion rate.
//!
//! Readers always get an answer immediately: the last successfully fetched
//! rate, or the configured fallback until a fetch has succeeded. Fetching
//! happens outside the lock, so a slow upstream never blocks readers.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, instrument, warn};

use crate::config::CurrencyConfig;
use crate::util::exchange_rate::{RateFetchError, RateFetcher};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    Live,
    Fallback,
}

/// What `/convrate` reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSnapshot {
    pub base: String,
    pub target: String,
    pub rate: f64,
    pub source: RateSource,
    pub last_updated: Option<DateTime<Utc>>,
    pub stale: bool,
}

#[derive(Debug, Clone, Copy)]
struct LiveRate {
    rate: f64,
    fetched_at: DateTime<Utc>,
}

pub struct ConversionRateCache {
    base: String,
    target: String,
    fallback_rate: f64,
    refresh_interval: Duration,
    latest: RwLock<Option<LiveRate>>,
    fetcher: Arc<dyn RateFetcher>,
    clock: Arc<dyn Clock>,
}

impl ConversionRateCache {
    pub fn new(config: &CurrencyConfig, fetcher: Arc<dyn RateFetcher>, clock: Arc<dyn Clock>) -> Self {
        ConversionRateCache {
            base: config.base.clone(),
            target: config.target.clone(),
            fallback_rate: config.fallback_rate,
            refresh_interval: config.refresh_interval,
            latest: RwLock::new(None),
            fetcher,
            clock,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Last good rate, or the fallback when nothing has been fetched yet.
    pub async fn current(&self) -> RateSnapshot {
        let latest = *self.latest.read().await;
        match latest {
            Some(live) => {
                let age = self.clock.now().signed_duration_since(live.fetched_at);
                let stale = age.to_std().map(|age| age > self.refresh_interval).unwrap_or(false);
                RateSnapshot {
                    base: self.base.clone(),
                    target: self.target.clone(),
                    rate: live.rate,
                    source: RateSource::Live,
                    last_updated: Some(live.fetched_at),
                    stale,
                }
            }
            None => RateSnapshot {
                base: self.base.clone(),
                target: self.target.clone(),
                rate: self.fallback_rate,
                source: RateSource::Fallback,
                last_updated: None,
                stale: true,
            },
        }
    }

    /// Fetches a fresh rate. A failure keeps whatever was cached before.
    #[instrument(skip(self), fields(base = %self.base, target = %self.target))]
    pub async fn refresh(&self) -> Result<f64, RateFetchError> {
        match self.fetcher.fetch_rate(&self.base, &self.target).await {
            Ok(rate) => {
                let fetched_at = self.clock.now();
                *self.latest.write().await = Some(LiveRate { rate, fetched_at });
                info!(rate, "Conversion rate updated");
                Ok(rate)
            }
            Err(e) => {
                warn!("Failed to refresh conversion rate, keeping previous value: {}", e);
                Err(e)
            }
        }
    }
}

/// Refreshes right away, then once per refresh interval, for as long as the
/// returned task is alive.
pub fn spawn_refresh_task(cache: Arc<ConversionRateCache>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cache.refresh_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            // Errors are logged by refresh; the next tick retries.
            let _ = cache.refresh().await;
        }
    })
}
