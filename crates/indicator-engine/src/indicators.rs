//! Indicator calculators. Derived columns are aligned index-for-index
//! with the input series; `None` marks an indicator's warm-up window.

use chrono::NaiveDate;
use market_core::PriceSeries;
use serde::{Deserialize, Serialize};

/// Simple Moving Average. First `period - 1` slots are undefined.
pub fn sma(data: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; data.len()];
    }

    let mut result = vec![None; data.len()];
    for i in (period - 1)..data.len() {
        let window = &data[i + 1 - period..=i];
        result[i] = Some(window.iter().sum::<f64>() / period as f64);
    }
    result
}

/// Exponential Moving Average, plain recursion seeded with the first
/// observation: ema[t] = alpha*x[t] + (1-alpha)*ema[t-1],
/// alpha = 2/(period+1). Defined at every index.
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    if data.is_empty() || period == 0 {
        return vec![];
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut result = Vec::with_capacity(data.len());
    result.push(data[0]);
    for i in 1..data.len() {
        let prev = result[i - 1];
        result.push(alpha * data[i] + (1.0 - alpha) * prev);
    }
    result
}

/// Relative Strength Index over rolling mean gains/losses.
///
/// The rolling window holds at most `period` changes but admits as few
/// as one, so values appear from the second observation on. A window
/// with zero average loss saturates to 100 rather than dividing by zero.
pub fn rsi(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if period == 0 || data.len() < 2 {
        return result;
    }

    // changes[i] is the move into index i+1
    let changes: Vec<f64> = data.windows(2).map(|w| w[1] - w[0]).collect();

    for i in 1..data.len() {
        let window_start = i.saturating_sub(period);
        let window = &changes[window_start..i];
        let n = window.len() as f64;

        let avg_gain = window.iter().filter(|&&c| c > 0.0).sum::<f64>() / n;
        let avg_loss = window.iter().filter(|&&c| c < 0.0).map(|c| c.abs()).sum::<f64>() / n;

        let value = if avg_loss == 0.0 {
            100.0
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - 100.0 / (1.0 + rs)
        };
        result[i] = Some(value);
    }

    result
}

/// MACD columns, all fully defined (EMAs seed at index 0).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacdColumns {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// macd_line = EMA(fast) - EMA(slow); signal = EMA(macd_line, signal);
/// histogram = line - signal.
pub fn macd(
    data: &[f64],
    signal_period: usize,
    fast_period: usize,
    slow_period: usize,
) -> MacdColumns {
    if data.is_empty() || signal_period == 0 || fast_period == 0 || slow_period == 0 {
        return MacdColumns {
            macd_line: vec![],
            signal_line: vec![],
            histogram: vec![],
        };
    }

    let ema_fast = ema(data, fast_period);
    let ema_slow = ema(data, slow_period);

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&macd_line, signal_period);
    let histogram: Vec<f64> = macd_line
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| m - s)
        .collect();

    MacdColumns {
        macd_line,
        signal_line,
        histogram,
    }
}

/// Bollinger Band columns; undefined during the rolling warm-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BollingerColumns {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// middle = rolling mean, bands = middle +/- k * rolling sample std-dev.
pub fn bollinger_bands(data: &[f64], period: usize, num_std_devs: f64) -> BollingerColumns {
    let middle = sma(data, period);
    let mut upper = vec![None; data.len()];
    let mut lower = vec![None; data.len()];

    if period > 0 {
        for i in (period - 1)..data.len() {
            let window = &data[i + 1 - period..=i];
            let Some(mean) = middle[i] else { continue };
            let std = if period > 1 {
                let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>()
                    / (period as f64 - 1.0);
                variance.sqrt()
            } else {
                0.0
            };
            upper[i] = Some(mean + num_std_devs * std);
            lower[i] = Some(mean - num_std_devs * std);
        }
    }

    BollingerColumns { upper, middle, lower }
}

/// The latest day-over-day move for one ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PctGain {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
    pub pct_change: f64,
}

/// Percentage gain over the last two observations. A series without a
/// prior observation produces no row.
pub fn percentage_gain(series: &PriceSeries) -> Option<PctGain> {
    let points = series.points();
    if points.len() < 2 {
        return None;
    }

    let prev = &points[points.len() - 2];
    let last = &points[points.len() - 1];
    if prev.close == 0.0 {
        return None;
    }

    Some(PctGain {
        ticker: series.ticker().to_string(),
        date: last.date,
        close: last.close,
        pct_change: 100.0 * (last.close - prev.close) / prev.close,
    })
}
