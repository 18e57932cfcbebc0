use market_core::PriceSeries;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{bollinger_bands, macd, rsi, sma};

/// A price series plus named derived columns, aligned row-for-row with
/// the underlying points. `None` cells mark indicator warm-up. This is
/// the shape the charting layer consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSeries {
    pub series: PriceSeries,
    pub columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl IndicatorSeries {
    pub fn new(series: PriceSeries) -> Self {
        Self {
            series,
            columns: BTreeMap::new(),
        }
    }

    fn insert(&mut self, name: &str, column: Vec<Option<f64>>) {
        debug_assert_eq!(column.len(), self.series.len());
        self.columns.insert(name.to_string(), column);
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn with_rsi(mut self, period: usize) -> Self {
        let column = rsi(&self.series.closes(), period);
        self.insert("rsi", column);
        self
    }

    pub fn with_sma(mut self, period: usize) -> Self {
        let column = sma(&self.series.closes(), period);
        self.insert(&format!("sma_{period}"), column);
        self
    }

    pub fn with_macd(mut self, signal_period: usize, fast_period: usize, slow_period: usize) -> Self {
        let columns = macd(&self.series.closes(), signal_period, fast_period, slow_period);
        self.insert("macd_line", columns.macd_line.into_iter().map(Some).collect());
        self.insert(
            "macd_signal",
            columns.signal_line.into_iter().map(Some).collect(),
        );
        self.insert("macd_hist", columns.histogram.into_iter().map(Some).collect());
        self
    }

    pub fn with_bollinger(mut self, period: usize, num_std_devs: f64) -> Self {
        let bands = bollinger_bands(&self.series.closes(), period, num_std_devs);
        self.insert("bb_middle", bands.middle);
        self.insert("bb_upper", bands.upper);
        self.insert("bb_lower", bands.lower);
        self
    }

    /// Latest defined value of a column, if any.
    pub fn latest(&self, name: &str) -> Option<f64> {
        self.columns
            .get(name)
            .and_then(|col| col.iter().rev().flatten().next())
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::PricePoint;

    fn series(closes: &[f64]) -> PriceSeries {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                ticker: "AAPL".to_string(),
                date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000.0,
            })
            .collect();
        PriceSeries::new("AAPL", points).unwrap()
    }

    #[test]
    fn columns_stay_aligned_with_points() {
        let annotated = IndicatorSeries::new(series(&[
            10.0, 11.0, 12.0, 11.0, 10.0, 11.0, 12.0, 13.0, 12.0, 11.0,
        ]))
        .with_rsi(5)
        .with_macd(3, 2, 4)
        .with_bollinger(5, 2.0)
        .with_sma(3);

        for column in annotated.columns.values() {
            assert_eq!(column.len(), 10);
        }
        assert!(annotated.column("rsi").unwrap()[0].is_none());
        assert!(annotated.column("bb_middle").unwrap()[3].is_none());
        assert!(annotated.column("bb_middle").unwrap()[4].is_some());
        assert!(annotated.column("macd_line").unwrap()[0].is_some());
    }

    #[test]
    fn latest_skips_trailing_undefined_cells() {
        let annotated = IndicatorSeries::new(series(&[10.0, 11.0, 12.0])).with_sma(3);
        let latest = annotated.latest("sma_3").unwrap();
        assert!((latest - 11.0).abs() < 1e-10);
    }
}
