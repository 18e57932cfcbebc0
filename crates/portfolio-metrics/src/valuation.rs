use chrono::{Duration, NaiveDate, Utc};
use market_core::{most_recent_trading_day, Portfolio, PriceProvider};
use market_data::MarketDataFetcher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Portfolio value attributed to one ticker on one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioValuePoint {
    pub date: NaiveDate,
    pub ticker: String,
    pub close: f64,
    pub quantity_owned: i64,
    pub value: f64,
}

/// Per-ticker valuation flattened across lots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerValuation {
    pub ticker: String,
    pub total_quantity: i64,
    /// Mean purchase price across this ticker's lots.
    pub avg_initial_price: f64,
    pub current_price: f64,
    pub initial_value: f64,
    pub current_value: f64,
    /// None when no initial value could be established (zero quantity,
    /// zero price); never a division error.
    pub pct_return: Option<f64>,
}

/// Whole-portfolio rollup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub initial_value: f64,
    pub current_value: f64,
    pub pct_change: Option<f64>,
    pub by_ticker: Vec<TickerValuation>,
}

fn widen_if_collapsed(start: NaiveDate, mut end: NaiveDate) -> (NaiveDate, NaiveDate) {
    if start == end {
        end += Duration::days(1);
    }
    (start, end)
}

/// Daily value of every holding from each lot's purchase date forward.
///
/// Overlapping lots for the same ticker are summed per calendar date so
/// a second purchase compounds the quantity owned from that day on.
/// Lots whose history cannot be fetched are skipped.
pub async fn value_over_time<P: PriceProvider>(
    portfolio: &Portfolio,
    fetcher: &MarketDataFetcher<P>,
) -> Vec<PortfolioValuePoint> {
    // One snapshot instant for the whole pass.
    let end = most_recent_trading_day(Utc::now());

    let mut owned: BTreeMap<(String, NaiveDate), (f64, i64)> = BTreeMap::new();

    for (ticker, lots) in &portfolio.lots {
        for lot in lots {
            let (start, lot_end) = widen_if_collapsed(lot.date, end);
            let series = match fetcher.fetch_resolved(ticker, start, lot_end).await {
                Ok(series) => series,
                Err(err) => {
                    tracing::warn!(%ticker, %err, "skipping lot in portfolio history");
                    continue;
                }
            };

            for point in series.points() {
                let entry = owned
                    .entry((ticker.clone(), point.date))
                    .or_insert((point.close, 0));
                entry.1 += lot.quantity;
            }
        }
    }

    owned
        .into_iter()
        .map(|((ticker, date), (close, quantity_owned))| PortfolioValuePoint {
            date,
            ticker,
            close,
            quantity_owned,
            value: close * quantity_owned as f64,
        })
        .collect()
}

/// Current valuation per ticker: initial price at each lot's purchase
/// date joined against one shared most-recent-trading-day price.
pub async fn value_now<P: PriceProvider>(
    portfolio: &Portfolio,
    fetcher: &MarketDataFetcher<P>,
) -> Vec<TickerValuation> {
    let snapshot = most_recent_trading_day(Utc::now());
    let mut valuations = Vec::new();

    for (ticker, lots) in &portfolio.lots {
        let (start, end) = widen_if_collapsed(snapshot, snapshot);
        let current_price = match fetcher.fetch_resolved(ticker, start, end).await {
            Ok(series) => match series.last() {
                Some(point) => point.close,
                None => continue,
            },
            Err(err) => {
                tracing::warn!(%ticker, %err, "no current price, excluding from valuation");
                continue;
            }
        };

        let mut total_quantity = 0i64;
        let mut initial_prices = Vec::new();
        for lot in lots {
            let (start, end) = widen_if_collapsed(lot.date, lot.date);
            match fetcher.fetch_resolved(ticker, start, end).await {
                Ok(series) => {
                    if let Some(point) = series.points().first() {
                        total_quantity += lot.quantity;
                        initial_prices.push(point.close);
                    }
                }
                Err(err) => {
                    tracing::warn!(%ticker, %err, "skipping lot without an initial price");
                }
            }
        }

        if initial_prices.is_empty() {
            continue;
        }

        let avg_initial_price = initial_prices.iter().sum::<f64>() / initial_prices.len() as f64;
        let initial_value = total_quantity as f64 * avg_initial_price;
        let current_value = total_quantity as f64 * current_price;
        let pct_return = if initial_value != 0.0 {
            Some(100.0 * (current_value - initial_value) / initial_value)
        } else {
            None
        };

        valuations.push(TickerValuation {
            ticker: ticker.clone(),
            total_quantity,
            avg_initial_price,
            current_price,
            initial_value,
            current_value,
            pct_return,
        });
    }

    valuations
}

/// Roll per-ticker valuations up to the whole portfolio. Positions with
/// no positive current value (fully sold, net short) are excluded from
/// the headline numbers.
pub fn portfolio_summary(valuations: Vec<TickerValuation>) -> PortfolioSummary {
    let held: Vec<&TickerValuation> = valuations
        .iter()
        .filter(|v| v.current_value > 0.0)
        .collect();

    let initial_value: f64 = held.iter().map(|v| v.initial_value).sum();
    let current_value: f64 = held.iter().map(|v| v.current_value).sum();
    let pct_change = if initial_value != 0.0 {
        Some(100.0 * (current_value - initial_value) / initial_value)
    } else {
        None
    };

    PortfolioSummary {
        initial_value,
        current_value,
        pct_change,
        by_ticker: valuations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use market_core::{MarketError, PricePoint, Transaction};
    use market_data::{FetchConfig, RetryPolicy};
    use std::sync::Arc;

    /// Serves a deterministic price path: every ticker closes at
    /// `base + days_since_epoch_of(date)` so tests can predict prices.
    struct LadderProvider {
        base: f64,
    }

    fn day_index(date: NaiveDate) -> i64 {
        (date - NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).num_days()
    }

    #[async_trait]
    impl PriceProvider for LadderProvider {
        async fn daily_history(
            &self,
            ticker: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<PricePoint>, MarketError> {
            let mut points = Vec::new();
            let mut date = start;
            while date < end {
                let close = self.base + day_index(date) as f64;
                points.push(PricePoint {
                    ticker: ticker.to_string(),
                    date,
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 500.0,
                });
                date += Duration::days(1);
            }
            Ok(points)
        }
    }

    /// Flat price path: same close on every date.
    struct FlatProvider {
        price: f64,
    }

    #[async_trait]
    impl PriceProvider for FlatProvider {
        async fn daily_history(
            &self,
            ticker: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<PricePoint>, MarketError> {
            let mut points = Vec::new();
            let mut date = start;
            while date < end {
                points.push(PricePoint {
                    ticker: ticker.to_string(),
                    date,
                    open: self.price,
                    high: self.price,
                    low: self.price,
                    close: self.price,
                    volume: 500.0,
                });
                date += Duration::days(1);
            }
            Ok(points)
        }
    }

    fn fetcher<P: PriceProvider>(provider: P) -> MarketDataFetcher<P> {
        MarketDataFetcher::new(
            Arc::new(provider),
            FetchConfig {
                retry: RetryPolicy::new(1, std::time::Duration::ZERO),
                ..FetchConfig::default()
            },
        )
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn overlapping_lots_compound_quantity_per_date() {
        let mut portfolio = Portfolio::new();
        portfolio.lots.insert(
            "AAPL".to_string(),
            vec![
                Transaction { quantity: 2, date: date("2024-01-10") },
                Transaction { quantity: 3, date: date("2024-01-12") },
            ],
        );

        let history = value_over_time(&portfolio, &fetcher(LadderProvider { base: 100.0 })).await;

        let on = |d: &str| {
            history
                .iter()
                .find(|p| p.date == date(d))
                .expect("date present")
        };

        // Before the second lot: only 2 shares.
        assert_eq!(on("2024-01-10").quantity_owned, 2);
        assert_eq!(on("2024-01-11").quantity_owned, 2);
        // From the second purchase on: 5 shares.
        assert_eq!(on("2024-01-12").quantity_owned, 5);
        let p = on("2024-01-12");
        assert!((p.value - p.close * 5.0).abs() < 1e-10);
    }

    #[tokio::test]
    async fn same_day_buy_values_at_zero_return() {
        let mut portfolio = Portfolio::new();
        portfolio.record("AAPL", 4, most_recent_trading_day(Utc::now()));

        let valuations = value_now(&portfolio, &fetcher(FlatProvider { price: 50.0 })).await;
        assert_eq!(valuations.len(), 1);

        let v = &valuations[0];
        assert_eq!(v.total_quantity, 4);
        assert!((v.current_value - v.initial_value).abs() < 1e-10);
        assert!((v.pct_return.unwrap() - 0.0).abs() < 1e-10);
    }

    #[tokio::test]
    async fn multiple_lots_average_their_initial_prices() {
        let mut portfolio = Portfolio::new();
        portfolio.lots.insert(
            "AAPL".to_string(),
            vec![
                Transaction { quantity: 1, date: date("2024-01-11") }, // closes at 110
                Transaction { quantity: 1, date: date("2024-01-21") }, // closes at 120
            ],
        );

        let valuations = value_now(&portfolio, &fetcher(LadderProvider { base: 100.0 })).await;
        let v = &valuations[0];
        assert_eq!(v.total_quantity, 2);
        assert!((v.avg_initial_price - 115.0).abs() < 1e-10);
        assert!((v.initial_value - 230.0).abs() < 1e-10);
    }

    #[tokio::test]
    async fn zero_net_quantity_reports_undefined_return() {
        let mut portfolio = Portfolio::new();
        portfolio.lots.insert(
            "GME".to_string(),
            vec![
                Transaction { quantity: 2, date: date("2024-01-10") },
                Transaction { quantity: -2, date: date("2024-01-12") },
            ],
        );

        let valuations = value_now(&portfolio, &fetcher(FlatProvider { price: 20.0 })).await;
        let v = &valuations[0];
        assert_eq!(v.total_quantity, 0);
        assert!(v.pct_return.is_none());
    }

    #[test]
    fn summary_excludes_non_positive_positions() {
        let valuations = vec![
            TickerValuation {
                ticker: "AAPL".to_string(),
                total_quantity: 2,
                avg_initial_price: 100.0,
                current_price: 110.0,
                initial_value: 200.0,
                current_value: 220.0,
                pct_return: Some(10.0),
            },
            TickerValuation {
                ticker: "GME".to_string(),
                total_quantity: 0,
                avg_initial_price: 20.0,
                current_price: 25.0,
                initial_value: 0.0,
                current_value: 0.0,
                pct_return: None,
            },
        ];

        let summary = portfolio_summary(valuations);
        assert!((summary.initial_value - 200.0).abs() < 1e-10);
        assert!((summary.current_value - 220.0).abs() < 1e-10);
        assert!((summary.pct_change.unwrap() - 10.0).abs() < 1e-10);
        assert_eq!(summary.by_ticker.len(), 2);
    }

    #[test]
    fn summary_with_no_held_positions_has_undefined_change() {
        let summary = portfolio_summary(Vec::new());
        assert!(summary.pct_change.is_none());
    }
}
