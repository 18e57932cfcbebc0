use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("No market data available for {ticker} after {attempts} attempts")]
    DataUnavailable { ticker: String, attempts: u32 },

    #[error("Insufficient history: need {needed} observations, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    #[error("Ticker histories have no usable common length")]
    MismatchedHistoryLength,

    #[error("Recommendations unavailable: {0}")]
    RecommendationsUnavailable(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid series: {0}")]
    InvalidSeries(String),
}
