//! Cross-sectional "more like this" engine.
//!
//! Each ticker becomes one vector: its recent closes and day-over-day
//! percentage changes, standardized independently per ticker, laid
//! end-to-end. Pairwise cosine similarity over those vectors ranks how
//! alike two tickers have traded.

use market_core::{MarketError, PriceSeries};
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Square ticker-by-ticker cosine similarity, values in [-1, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    tickers: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl SimilarityMatrix {
    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.tickers.iter().position(|t| t == a)?;
        let j = self.tickers.iter().position(|t| t == b)?;
        Some(self.values[i][j])
    }

    /// The `k` tickers most similar to `ticker`, best first. The ticker
    /// itself (self-similarity 1.0, always rank 0) is skipped.
    pub fn most_similar(&self, ticker: &str, k: usize) -> Vec<(String, f64)> {
        let Some(i) = self.tickers.iter().position(|t| t == ticker) else {
            return Vec::new();
        };

        let mut row: Vec<(String, f64)> = self
            .tickers
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(j, t)| (t.clone(), self.values[i][j]))
            .collect();

        row.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        row.truncate(k);
        row
    }
}

/// Build the pairwise similarity matrix for a universe.
///
/// Histories are truncated to the common (minimum) row count, keeping
/// the most recent rows, so every feature vector has equal length. A
/// universe whose common history is under two rows cannot produce a
/// percentage change and fails with `MismatchedHistoryLength`.
pub fn similarity(
    series_by_ticker: &BTreeMap<String, PriceSeries>,
) -> Result<SimilarityMatrix, MarketError> {
    if series_by_ticker.is_empty() {
        return Ok(SimilarityMatrix {
            tickers: Vec::new(),
            values: Vec::new(),
        });
    }

    let common_len = series_by_ticker
        .values()
        .map(PriceSeries::len)
        .min()
        .unwrap_or(0);
    if common_len < 2 {
        return Err(MarketError::MismatchedHistoryLength);
    }

    let tickers: Vec<String> = series_by_ticker.keys().cloned().collect();
    let vectors: Vec<Vec<f64>> = tickers
        .par_iter()
        .map(|ticker| feature_vector(&series_by_ticker[ticker], common_len))
        .collect();

    let n = tickers.len();
    let dim = vectors[0].len();
    let features = DMatrix::from_fn(n, dim, |i, j| vectors[i][j]);

    let mut values = vec![vec![0.0; n]; n];
    for i in 0..n {
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            let sim = cosine(&features.row(i).transpose(), &features.row(j).transpose());
            values[i][j] = sim;
            values[j][i] = sim;
        }
    }

    Ok(SimilarityMatrix { tickers, values })
}

/// Standardized closes followed by standardized pct changes over the
/// last `len` rows.
fn feature_vector(series: &PriceSeries, len: usize) -> Vec<f64> {
    let points = series.points();
    let window = &points[points.len() - len..];

    let closes: Vec<f64> = window.iter().map(|p| p.close).collect();
    let changes: Vec<f64> = closes
        .windows(2)
        .map(|w| {
            if w[0] != 0.0 {
                100.0 * (w[1] - w[0]) / w[0]
            } else {
                0.0
            }
        })
        .collect();

    let mut vector = standardize(&closes);
    vector.extend(standardize(&changes));
    vector
}

/// Zero mean, unit variance; a constant column maps to zeros.
fn standardize(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    if std == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mean) / std).collect()
}

fn cosine(a: &nalgebra::DVector<f64>, b: &nalgebra::DVector<f64>) -> f64 {
    let denom = a.norm() * b.norm();
    if denom == 0.0 {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0)
}
