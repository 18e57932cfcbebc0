use chrono::{NaiveDate, Utc};
use futures_util::stream::{self, StreamExt};
use market_core::{resolve_range, DateSpec, MarketError, PriceProvider, PriceSeries};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::RetryPolicy;

/// Knobs for the fetch layer. `from_env` picks up overrides so the free
/// tier of a data source can run with longer delays.
#[derive(Debug, Clone, Copy)]
pub struct FetchConfig {
    pub retry: RetryPolicy,
    /// Hard per-attempt deadline; a hung provider fails the attempt
    /// instead of stalling the whole request.
    pub deadline: Duration,
    /// Concurrent in-flight requests for universe scans.
    pub concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            deadline: Duration::from_secs(30),
            concurrency: 8,
        }
    }
}

impl FetchConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(attempts) = env_parse::<u32>("MARKET_DATA_RETRIES") {
            config.retry.max_attempts = attempts;
        }
        if let Some(secs) = env_parse::<u64>("MARKET_DATA_RETRY_SECS") {
            config.retry.delay = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("MARKET_DATA_DEADLINE_SECS") {
            config.deadline = Duration::from_secs(secs);
        }
        if let Some(n) = env_parse::<usize>("MARKET_DATA_CONCURRENCY") {
            config.concurrency = n.max(1);
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Retrying, deadline-bounded wrapper over a [`PriceProvider`].
///
/// Idempotent for a fixed (ticker, resolved start, resolved end): past
/// daily history never changes, so two identical fetches return the same
/// series.
#[derive(Clone)]
pub struct MarketDataFetcher<P> {
    provider: Arc<P>,
    config: FetchConfig,
}

impl<P: PriceProvider> MarketDataFetcher<P> {
    pub fn new(provider: Arc<P>, config: FetchConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch one ticker, resolving symbolic dates against the current
    /// instant.
    pub async fn fetch(
        &self,
        ticker: &str,
        start: DateSpec,
        end: DateSpec,
    ) -> Result<PriceSeries, MarketError> {
        let (start, end) = resolve_range(start, end, Utc::now());
        self.fetch_resolved(ticker, start, end).await
    }

    /// Fetch one ticker over an already-resolved range. Universe scans
    /// resolve once and call this so every ticker shares one snapshot
    /// instant.
    pub async fn fetch_resolved(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, MarketError> {
        let attempts = self.config.retry.max_attempts.max(1);
        let result = self
            .config
            .retry
            .run(|_attempt| self.attempt(ticker, start, end))
            .await;

        match result {
            Ok(points) => PriceSeries::new(ticker, points),
            Err(err) => {
                tracing::warn!(ticker, %err, "market data exhausted retries");
                Err(MarketError::DataUnavailable {
                    ticker: ticker.to_string(),
                    attempts,
                })
            }
        }
    }

    async fn attempt(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<market_core::PricePoint>, MarketError> {
        let fut = self.provider.daily_history(ticker, start, end);
        let points = tokio::time::timeout(self.config.deadline, fut)
            .await
            .map_err(|_| MarketError::Provider(format!("deadline exceeded for {ticker}")))??;

        // An empty result is a failed attempt, not a valid series.
        if points.is_empty() {
            return Err(MarketError::Provider(format!("empty result for {ticker}")));
        }
        Ok(points)
    }

    /// Fetch a whole universe with bounded concurrency. Tickers whose
    /// data cannot be fetched are skipped, not fatal: aggregate surfaces
    /// degrade to the tickers that resolved.
    pub async fn fetch_universe(
        &self,
        tickers: &[String],
        start: DateSpec,
        end: DateSpec,
    ) -> BTreeMap<String, PriceSeries> {
        let (start, end) = resolve_range(start, end, Utc::now());

        let results: Vec<(String, Result<PriceSeries, MarketError>)> = stream::iter(tickers)
            .map(|ticker| async move {
                (ticker.clone(), self.fetch_resolved(ticker, start, end).await)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut series = BTreeMap::new();
        for (ticker, result) in results {
            match result {
                Ok(s) => {
                    series.insert(ticker, s);
                }
                Err(err) => {
                    tracing::warn!(%ticker, %err, "excluding ticker from universe scan");
                }
            }
        }
        series
    }
}
