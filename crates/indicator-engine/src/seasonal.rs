use chrono::{Datelike, NaiveDate};
use market_core::{MarketError, PriceSeries};
use serde::{Deserialize, Serialize};

/// One trading year of daily sessions; the default decomposition period.
pub const TRADING_DAYS_PER_YEAR: usize = 252;

/// Gaps between seasonal-mean crossings at or below this length are
/// treated as noise when estimating the cycle.
const MIN_CYCLE_GAP_DAYS: i64 = 62;

/// Multiplicative decomposition of a close series:
/// observed = trend * seasonal * residual.
///
/// Trend (and therefore residual) is undefined over the half-window at
/// each edge of the series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decomposition {
    pub ticker: String,
    pub period: usize,
    pub dates: Vec<NaiveDate>,
    pub observed: Vec<f64>,
    pub trend: Vec<Option<f64>>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<Option<f64>>,
}

/// Classic moving-average decomposition with an annual period.
///
/// Needs at least two full periods of history for a stable trend;
/// shorter series fail with `InsufficientHistory` so callers can fall
/// back to showing the raw price series.
pub fn seasonal_decompose(series: &PriceSeries, period: usize) -> Result<Decomposition, MarketError> {
    let observed = series.closes();
    let n = observed.len();
    if period < 2 {
        return Err(MarketError::InvalidSeries(
            "decomposition period must be at least 2".into(),
        ));
    }
    if n < 2 * period {
        return Err(MarketError::InsufficientHistory {
            needed: 2 * period,
            got: n,
        });
    }

    let trend = centered_moving_average(&observed, period);

    // Average detrended value per period position, normalized so the
    // seasonal factors have mean 1 (multiplicative model).
    let mut position_sums = vec![0.0; period];
    let mut position_counts = vec![0usize; period];
    for (i, t) in trend.iter().enumerate() {
        let Some(t) = t else { continue };
        if *t != 0.0 {
            position_sums[i % period] += observed[i] / t;
            position_counts[i % period] += 1;
        }
    }

    let mut factors: Vec<f64> = position_sums
        .iter()
        .zip(&position_counts)
        .map(|(sum, &count)| if count > 0 { sum / count as f64 } else { 1.0 })
        .collect();
    let factor_mean = factors.iter().sum::<f64>() / period as f64;
    if factor_mean != 0.0 {
        for f in &mut factors {
            *f /= factor_mean;
        }
    }

    let seasonal: Vec<f64> = (0..n).map(|i| factors[i % period]).collect();

    let residual: Vec<Option<f64>> = (0..n)
        .map(|i| match trend[i] {
            Some(t) if t * seasonal[i] != 0.0 => Some(observed[i] / (t * seasonal[i])),
            _ => None,
        })
        .collect();

    Ok(Decomposition {
        ticker: series.ticker().to_string(),
        period,
        dates: series.dates(),
        observed,
        trend,
        seasonal,
        residual,
    })
}

/// Centered moving average; for an even period the window spans
/// period + 1 observations with half weight on the endpoints.
fn centered_moving_average(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = data.len();
    let mut trend = vec![None; n];
    let half = period / 2;

    if period % 2 == 1 {
        for i in half..n.saturating_sub(half) {
            let window = &data[i - half..=i + half];
            trend[i] = Some(window.iter().sum::<f64>() / period as f64);
        }
    } else {
        for i in half..n.saturating_sub(half) {
            let lo = i - half;
            let hi = i + half;
            let inner: f64 = data[lo + 1..hi].iter().sum();
            trend[i] = Some((0.5 * data[lo] + inner + 0.5 * data[hi]) / period as f64);
        }
    }

    trend
}

/// Intra-month timing read off a fractional month value.
pub fn month_phase(fractional_month: f64) -> &'static str {
    let remainder = fractional_month.fract();
    if remainder <= 0.25 {
        "Early"
    } else if remainder <= 0.75 {
        "Mid"
    } else {
        "Late"
    }
}

/// Summary of a ticker's recurring seasonal shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalityInfo {
    /// Fractional month (1.0 = start of January) of the typical
    /// seasonal high, averaged across complete years.
    pub typical_peak_month: f64,
    pub peak_phase: String,
    pub typical_trough_month: f64,
    pub trough_phase: String,
    /// Twice the mean gap between seasonal-mean crossings, noise gaps
    /// filtered out. `None` when the seasonal line never crosses its
    /// mean cleanly.
    pub estimated_cycle_length_days: Option<f64>,
    pub seasonal_mean: f64,
}

/// Derive peak/trough months and an approximate cycle length from a
/// decomposition. The final (possibly incomplete) calendar year is
/// excluded from the month averages.
pub fn seasonality_info(decomposition: &Decomposition) -> Result<SeasonalityInfo, MarketError> {
    let dates = &decomposition.dates;
    let seasonal = &decomposition.seasonal;
    if dates.len() != seasonal.len() || dates.is_empty() {
        return Err(MarketError::InvalidSeries(
            "decomposition has no seasonal observations".into(),
        ));
    }

    let last_year = dates[dates.len() - 1].year();
    let mut peak_months = Vec::new();
    let mut trough_months = Vec::new();

    let mut year_start = 0usize;
    while year_start < dates.len() {
        let year = dates[year_start].year();
        let year_end = dates[year_start..]
            .iter()
            .position(|d| d.year() != year)
            .map(|offset| year_start + offset)
            .unwrap_or(dates.len());

        if year != last_year {
            let slice = &seasonal[year_start..year_end];
            if let Some((peak_idx, trough_idx)) = extremes(slice) {
                peak_months.push(fractional_month(dates[year_start + peak_idx]));
                trough_months.push(fractional_month(dates[year_start + trough_idx]));
            }
        }
        year_start = year_end;
    }

    if peak_months.is_empty() {
        return Err(MarketError::InsufficientHistory {
            needed: decomposition.period * 2,
            got: dates.len(),
        });
    }

    let typical_peak_month = mean(&peak_months);
    let typical_trough_month = mean(&trough_months);

    let seasonal_mean = mean(seasonal);
    let estimated_cycle_length_days = estimate_cycle_length(dates, seasonal, seasonal_mean);

    Ok(SeasonalityInfo {
        typical_peak_month,
        peak_phase: month_phase(typical_peak_month).to_string(),
        typical_trough_month,
        trough_phase: month_phase(typical_trough_month).to_string(),
        estimated_cycle_length_days,
        seasonal_mean,
    })
}

fn extremes(values: &[f64]) -> Option<(usize, usize)> {
    if values.is_empty() {
        return None;
    }
    let mut peak = 0usize;
    let mut trough = 0usize;
    for (i, v) in values.iter().enumerate() {
        if *v > values[peak] {
            peak = i;
        }
        if *v < values[trough] {
            trough = i;
        }
    }
    Some((peak, trough))
}

fn fractional_month(date: NaiveDate) -> f64 {
    let days_in_month = days_in_month(date.year(), date.month());
    date.month() as f64 + (date.day() as f64 - 1.0) / days_in_month as f64
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (next, NaiveDate::from_ymd_opt(year, month, 1)) {
        (Some(next), Some(first)) => (next - first).num_days() as u32,
        _ => 30,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Cycle length from crossings of the seasonal-mean line: gaps of 62
/// days or less are oscillation noise; a full cycle is two mean-to-mean
/// gaps.
fn estimate_cycle_length(dates: &[NaiveDate], seasonal: &[f64], seasonal_mean: f64) -> Option<f64> {
    let mut crossings = Vec::new();
    for i in 1..seasonal.len() {
        let prev = seasonal[i - 1] - seasonal_mean;
        let curr = seasonal[i] - seasonal_mean;
        if prev == 0.0 {
            continue;
        }
        if (prev < 0.0) != (curr < 0.0) {
            crossings.push(dates[i]);
        }
    }

    let gaps: Vec<f64> = crossings
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days())
        .filter(|&days| days > MIN_CYCLE_GAP_DAYS)
        .map(|days| days as f64)
        .collect();

    if gaps.is_empty() {
        None
    } else {
        Some(2.0 * mean(&gaps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::PricePoint;

    /// Synthetic daily series with a yearly sinusoidal seasonal factor
    /// peaking around the start of April (troughing in October) on top
    /// of a gentle upward trend.
    fn seasonal_series(days: usize) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let points = (0..days)
            .map(|i| {
                let date = start + chrono::Duration::days(i as i64);
                let day_of_year = date.ordinal() as f64;
                let trend = 100.0 + 0.01 * i as f64;
                let seasonal =
                    1.0 + 0.2 * (2.0 * std::f64::consts::PI * day_of_year / 365.25).sin();
                let close = trend * seasonal;
                PricePoint {
                    ticker: "AAPL".to_string(),
                    date,
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 1_000.0,
                }
            })
            .collect();
        PriceSeries::new("AAPL", points).unwrap()
    }

    #[test]
    fn short_history_is_rejected() {
        let series = seasonal_series(300);
        let err = seasonal_decompose(&series, TRADING_DAYS_PER_YEAR).unwrap_err();
        assert!(matches!(err, MarketError::InsufficientHistory { needed: 504, got: 300 }));
    }

    #[test]
    fn decomposition_columns_stay_aligned() {
        let series = seasonal_series(900);
        let d = seasonal_decompose(&series, 365).unwrap();

        assert_eq!(d.observed.len(), 900);
        assert_eq!(d.trend.len(), 900);
        assert_eq!(d.seasonal.len(), 900);
        assert_eq!(d.residual.len(), 900);

        // Trend warm-up at both edges.
        assert!(d.trend[0].is_none());
        assert!(d.trend[899].is_none());
        assert!(d.trend[450].is_some());

        // Seasonal factors average to 1 over one full period tile.
        let mean_factor: f64 = d.seasonal[..365].iter().sum::<f64>() / 365.0;
        assert!((mean_factor - 1.0).abs() < 1e-6);
    }

    #[test]
    fn residuals_are_near_one_for_clean_data() {
        let series = seasonal_series(1100);
        let d = seasonal_decompose(&series, 365).unwrap();

        let defined: Vec<f64> = d.residual.iter().flatten().copied().collect();
        assert!(!defined.is_empty());
        let worst = defined
            .iter()
            .map(|r| (r - 1.0).abs())
            .fold(0.0f64, f64::max);
        assert!(worst < 0.15, "worst residual deviation {worst}");
    }

    #[test]
    fn peak_month_recovers_the_planted_cycle() {
        let series = seasonal_series(1500);
        let d = seasonal_decompose(&series, 365).unwrap();
        let info = seasonality_info(&d).unwrap();

        // Sinusoid peaks ~day 91 (start of April), troughs ~day 274.
        assert!(
            info.typical_peak_month > 2.5 && info.typical_peak_month < 5.5,
            "peak month {}",
            info.typical_peak_month
        );
        assert!(
            info.typical_trough_month > 8.5 && info.typical_trough_month < 11.5,
            "trough month {}",
            info.typical_trough_month
        );

        // A yearly cycle: two half-period gaps of ~183 days each.
        let cycle = info.estimated_cycle_length_days.unwrap();
        assert!((cycle - 365.0).abs() < 45.0, "cycle {cycle}");
    }

    #[test]
    fn month_phase_boundaries() {
        assert_eq!(month_phase(3.0), "Early");
        assert_eq!(month_phase(3.25), "Early");
        assert_eq!(month_phase(3.5), "Mid");
        assert_eq!(month_phase(3.75), "Mid");
        assert_eq!(month_phase(3.76), "Late");
    }
}
