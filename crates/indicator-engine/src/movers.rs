use market_core::PriceSeries;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{percentage_gain, PctGain};

/// A ticker's latest move with its dense rank across the universe
/// (rank 1 = biggest gainer; ties share a rank).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mover {
    #[serde(flatten)]
    pub gain: PctGain,
    pub rank: u32,
}

/// Rank every ticker's latest day-over-day move, biggest gain first.
/// Tickers with fewer than two observations are dropped.
pub fn daily_movers(series_by_ticker: &BTreeMap<String, PriceSeries>) -> Vec<Mover> {
    let mut gains: Vec<PctGain> = series_by_ticker.values().filter_map(percentage_gain).collect();

    gains.sort_by(|a, b| {
        b.pct_change
            .partial_cmp(&a.pct_change)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut movers = Vec::with_capacity(gains.len());
    let mut rank = 0u32;
    let mut prev_change: Option<f64> = None;
    for gain in gains {
        if prev_change != Some(gain.pct_change) {
            rank += 1;
            prev_change = Some(gain.pct_change);
        }
        movers.push(Mover { gain, rank });
    }
    movers
}

/// The `k` biggest gainers.
pub fn top_gainers(movers: &[Mover], k: usize) -> Vec<&Mover> {
    movers.iter().take(k).collect()
}

/// The `k` biggest losers, worst first.
pub fn top_losers(movers: &[Mover], k: usize) -> Vec<&Mover> {
    movers.iter().rev().take(k).collect()
}

/// Look up a ticker's mover row.
pub fn mover_for<'a>(movers: &'a [Mover], ticker: &str) -> Option<&'a Mover> {
    movers.iter().find(|m| m.gain.ticker == ticker)
}
