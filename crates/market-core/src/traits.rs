use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{MarketError, PricePoint};

/// Source of raw daily OHLCV rows for one ticker over a date range.
///
/// Implemented by the HTTP chart client in production and by in-memory
/// fakes in tests. A provider returns whatever rows it has, including
/// none; retry and empty-result handling live in the fetch layer above.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn daily_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, MarketError>;
}
