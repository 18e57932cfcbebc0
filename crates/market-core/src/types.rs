use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::MarketError;

/// One daily OHLCV observation. Identified by (ticker, date).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Ascending-by-date daily history for a single ticker.
///
/// Invariants (enforced at construction): all points share `ticker`,
/// dates strictly increase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, mut points: Vec<PricePoint>) -> Result<Self, MarketError> {
        let ticker = ticker.into();
        points.sort_by_key(|p| p.date);
        for pair in points.windows(2) {
            if pair[0].date == pair[1].date {
                return Err(MarketError::InvalidSeries(format!(
                    "duplicate date {} for {}",
                    pair[0].date, ticker
                )));
            }
        }
        if let Some(stray) = points.iter().find(|p| p.ticker != ticker) {
            return Err(MarketError::InvalidSeries(format!(
                "point for {} in series for {}",
                stray.ticker, ticker
            )));
        }
        Ok(Self { ticker, points })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Day-over-day percentage changes; one element shorter than the series.
    pub fn daily_pct_changes(&self) -> Vec<f64> {
        self.points
            .windows(2)
            .filter(|w| w[0].close != 0.0)
            .map(|w| 100.0 * (w[1].close - w[0].close) / w[0].close)
            .collect()
    }
}

/// A single buy (positive quantity) or sell (negative quantity) event.
/// The lot log is append-only; a sell reduces effective holdings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Transaction {
    pub quantity: i64,
    pub date: NaiveDate,
}

/// One user's lot-level transaction history, keyed by ticker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Portfolio {
    pub lots: BTreeMap<String, Vec<Transaction>>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, ticker: impl Into<String>, quantity: i64, date: NaiveDate) {
        self.lots
            .entry(ticker.into())
            .or_default()
            .push(Transaction { quantity, date });
    }

    pub fn tickers(&self) -> Vec<String> {
        self.lots.keys().cloned().collect()
    }

    pub fn holds(&self, ticker: &str) -> bool {
        self.lots.contains_key(ticker)
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }
}
