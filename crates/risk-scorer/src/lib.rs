//! Cross-sectional volatility scoring.
//!
//! Volatility is the sample standard deviation of daily percentage
//! returns over a shared lookback window, normalized to a 0-10 scale
//! across the scored universe so a user's 1-10 risk level maps directly
//! onto it.

use market_core::PriceSeries;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Per-ticker volatility and its position within the scored universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskProfile {
    pub ticker: String,
    /// Std-dev of daily percentage returns.
    pub volatility: f64,
    /// Volatility rescaled to [0, 10] across the universe.
    pub normalized: f64,
}

/// Score a universe. A flat volatility spread (single ticker, one-day
/// window) normalizes every ticker to 10.0 rather than dividing by the
/// zero range.
pub fn score(series_by_ticker: &BTreeMap<String, PriceSeries>) -> BTreeMap<String, RiskProfile> {
    let volatilities: BTreeMap<String, f64> = series_by_ticker
        .iter()
        .map(|(ticker, series)| (ticker.clone(), volatility(series)))
        .collect();

    let min = volatilities.values().copied().fold(f64::INFINITY, f64::min);
    let max = volatilities
        .values()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    volatilities
        .into_iter()
        .map(|(ticker, vol)| {
            let normalized = if range > 0.0 {
                10.0 * (vol - min) / range
            } else {
                10.0
            };
            (
                ticker.clone(),
                RiskProfile {
                    ticker,
                    volatility: vol,
                    normalized,
                },
            )
        })
        .collect()
}

/// Sample std-dev of daily percentage changes; 0.0 when the series is
/// too short to produce two returns.
pub fn volatility(series: &PriceSeries) -> f64 {
    let changes = series.daily_pct_changes();
    if changes.len() < 2 {
        return 0.0;
    }
    changes.std_dev()
}

/// Tickers matching a 1-10 risk level.
///
/// Levels at or below 4 take the quiet end (`normalized <= level`),
/// levels 5-7 take the middle band (4 < normalized < 8), and levels 8+
/// take the volatile end (`normalized >= level`). An empty bucket falls
/// back to the `k` tickers nearest the requested level.
pub fn bucket(profiles: &BTreeMap<String, RiskProfile>, risk_level: u8, k: usize) -> Vec<RiskProfile> {
    let level = f64::from(risk_level.clamp(1, 10));

    let mut matched: Vec<RiskProfile> = profiles
        .values()
        .filter(|p| {
            if level <= 4.0 {
                p.normalized <= level
            } else if level < 8.0 {
                p.normalized > 4.0 && p.normalized < 8.0
            } else {
                p.normalized >= level
            }
        })
        .cloned()
        .collect();

    if matched.is_empty() {
        let mut nearest: Vec<RiskProfile> = profiles.values().cloned().collect();
        nearest.sort_by(|a, b| {
            let da = (a.normalized - level).abs();
            let db = (b.normalized - level).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        });
        nearest.truncate(k);
        return nearest;
    }

    matched.sort_by(|a, b| {
        a.normalized
            .partial_cmp(&b.normalized)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matched
}

/// The blurb shown beside risk-bucketed suggestions.
pub fn risk_message(risk_level: u8) -> &'static str {
    match risk_level.clamp(1, 10) {
        1..=4 => {
            "Based on your risk level, here are some steadier picks. These stocks \
             have shown relatively calm price movement recently, which can mean \
             smaller swings in your portfolio's value."
        }
        5..=7 => {
            "Based on your risk level, here are some balanced picks. These stocks \
             move more than the quiet end of the market but stop short of the \
             wildest names, trading some stability for growth potential."
        }
        _ => {
            "Based on your risk level, here are some high-octane picks. These \
             stocks have been among the most volatile in the universe recently; \
             they can move sharply in either direction."
        }
    }
}
