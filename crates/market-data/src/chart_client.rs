use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use market_core::{MarketError, PricePoint, PriceProvider};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Daily OHLCV provider backed by a Yahoo-style chart endpoint.
#[derive(Clone)]
pub struct ChartClient {
    base_url: String,
    client: Client,
}

impl ChartClient {
    /// Base URL comes from `MARKET_DATA_URL` when set.
    pub fn new() -> Self {
        let base_url =
            std::env::var("MARKET_DATA_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::with_base_url(base_url)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn epoch_seconds(date: NaiveDate) -> i64 {
        date.and_time(NaiveTime::MIN).and_utc().timestamp()
    }
}

impl Default for ChartClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceProvider for ChartClient {
    async fn daily_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, MarketError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", Self::epoch_seconds(start).to_string()),
                ("period2", Self::epoch_seconds(end).to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await
            .map_err(|e| MarketError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MarketError::Provider(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let body: ChartResponse = response
            .json()
            .await
            .map_err(|e| MarketError::Provider(e.to_string()))?;

        if let Some(err) = body.chart.error {
            return Err(MarketError::Provider(err.to_string()));
        }

        let result = body
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) });

        let Some(result) = result else {
            return Ok(Vec::new());
        };

        let timestamps = result.timestamp.unwrap_or_default();
        let Some(quote) = result.indicators.quote.into_iter().next() else {
            return Ok(Vec::new());
        };

        let mut points = Vec::with_capacity(timestamps.len());
        for (i, ts) in timestamps.iter().enumerate() {
            // Rows with any missing field (halted session, partial day)
            // are dropped rather than zero-filled.
            let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
                quote.open.get(i).copied().flatten(),
                quote.high.get(i).copied().flatten(),
                quote.low.get(i).copied().flatten(),
                quote.close.get(i).copied().flatten(),
                quote.volume.get(i).copied().flatten(),
            ) else {
                continue;
            };

            let Some(date) = chrono::DateTime::from_timestamp(*ts, 0).map(|dt| dt.date_naive())
            else {
                continue;
            };

            points.push(PricePoint {
                ticker: ticker.to_string(),
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        Ok(points)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize, Default)]
struct QuoteBlock {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}
