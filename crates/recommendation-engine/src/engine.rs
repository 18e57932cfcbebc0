use indicator_engine::{rsi, Mover};
use market_core::{MarketError, PriceSeries};
use risk_scorer::{risk_message, RiskProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{DirectionClassifier, FeatureRow, ModelHorizon, Prediction};

const RSI_PERIOD: usize = 14;

/// One classifier-backed pick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRecommendation {
    pub ticker: String,
    pub current_price: f64,
    pub probability: f64,
}

/// Ranked buys and sells for one model horizon. Request-scoped: built
/// fresh per page render, never cached.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub buys: Vec<StockRecommendation>,
    pub sells: Vec<StockRecommendation>,
}

/// Run the classifier over a universe snapshot and rank its calls.
///
/// Tickers whose market data is missing from the snapshot were already
/// skipped upstream; a classifier failure here is systemic and aborts
/// the whole set rather than returning a partial list.
pub async fn recommend(
    classifier: &dyn DirectionClassifier,
    horizon: ModelHorizon,
    series_by_ticker: &BTreeMap<String, PriceSeries>,
) -> Result<RecommendationSet, MarketError> {
    let mut set = RecommendationSet::default();

    for (ticker, series) in series_by_ticker {
        let Some(features) = feature_row(ticker, series, horizon) else {
            tracing::warn!(%ticker, "no usable feature row, skipping");
            continue;
        };

        let Prediction { rises, probability } = classifier.predict(horizon, &features).await?;
        let pick = StockRecommendation {
            ticker: ticker.clone(),
            current_price: features.close,
            probability,
        };
        if rises {
            set.buys.push(pick);
        } else {
            set.sells.push(pick);
        }
    }

    let by_probability_desc = |a: &StockRecommendation, b: &StockRecommendation| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    };
    set.buys.sort_by(by_probability_desc);
    set.sells.sort_by(by_probability_desc);

    Ok(set)
}

fn feature_row(ticker: &str, series: &PriceSeries, horizon: ModelHorizon) -> Option<FeatureRow> {
    let last = series.last()?;
    let rsi_value = match horizon {
        ModelHorizon::ThreeMonth => None,
        ModelHorizon::SevenDay => {
            // The short-horizon model requires RSI; without enough
            // history for one there is no feature row.
            Some(rsi(&series.closes(), RSI_PERIOD).last().copied().flatten()?)
        }
    };

    Some(FeatureRow {
        ticker: ticker.to_string(),
        close: last.close,
        volume: last.volume,
        rsi: rsi_value,
    })
}

/// One volatility-matched pick with its latest move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YmalPick {
    pub ticker: String,
    pub current_price: f64,
    pub pct_change: f64,
}

/// The "you might also like" surface: risk-bucketed tickers plus the
/// blurb explaining the bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YmalSet {
    pub risk_message: String,
    pub picks: Vec<YmalPick>,
}

/// Match tickers to the user's risk level and attach their latest move.
/// Tickers without a mover row (fetch failed or one-row history) are
/// dropped from the surface.
pub fn ymal(
    profiles: &BTreeMap<String, RiskProfile>,
    movers: &[Mover],
    risk_level: u8,
    k: usize,
) -> YmalSet {
    let picks = risk_scorer::bucket(profiles, risk_level, k)
        .into_iter()
        .filter_map(|profile| {
            let mover = indicator_engine::mover_for(movers, &profile.ticker)?;
            Some(YmalPick {
                ticker: profile.ticker,
                current_price: mover.gain.close,
                pct_change: mover.gain.pct_change,
            })
        })
        .take(k)
        .collect();

    YmalSet {
        risk_message: risk_message(risk_level).to_string(),
        picks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use indicator_engine::daily_movers;
    use market_core::PricePoint;

    /// Deterministic stand-in for the external model: rises when the
    /// close has an even integer part, probability scales with volume.
    struct FakeClassifier;

    #[async_trait]
    impl DirectionClassifier for FakeClassifier {
        async fn predict(
            &self,
            _horizon: ModelHorizon,
            features: &FeatureRow,
        ) -> Result<Prediction, MarketError> {
            Ok(Prediction {
                rises: (features.close as i64) % 2 == 0,
                probability: (features.volume / 10_000.0).min(1.0),
            })
        }
    }

    struct BrokenClassifier;

    #[async_trait]
    impl DirectionClassifier for BrokenClassifier {
        async fn predict(
            &self,
            _horizon: ModelHorizon,
            _features: &FeatureRow,
        ) -> Result<Prediction, MarketError> {
            Err(MarketError::RecommendationsUnavailable("down".into()))
        }
    }

    fn series(ticker: &str, closes: &[f64], volume: f64) -> (String, PriceSeries) {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                ticker: ticker.to_string(),
                date: chrono::NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume,
            })
            .collect();
        (ticker.to_string(), PriceSeries::new(ticker, points).unwrap())
    }

    fn universe() -> BTreeMap<String, PriceSeries> {
        [
            series("AAPL", &[100.0, 102.0], 9_000.0), // rises, p=0.9
            series("MSFT", &[200.0, 201.0], 5_000.0), // falls, p=0.5
            series("NVDA", &[50.0, 52.0], 7_000.0),   // rises, p=0.7
            series("GME", &[20.0, 21.0], 8_000.0),    // falls, p=0.8
        ]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn splits_and_ranks_by_probability() {
        let set = recommend(&FakeClassifier, ModelHorizon::ThreeMonth, &universe())
            .await
            .unwrap();

        let buys: Vec<&str> = set.buys.iter().map(|r| r.ticker.as_str()).collect();
        let sells: Vec<&str> = set.sells.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(buys, vec!["AAPL", "NVDA"]);
        assert_eq!(sells, vec!["GME", "MSFT"]);
        assert!(set.buys[0].probability > set.buys[1].probability);
    }

    #[tokio::test]
    async fn classifier_failure_is_systemic() {
        let err = recommend(&BrokenClassifier, ModelHorizon::ThreeMonth, &universe())
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::RecommendationsUnavailable(_)));
    }

    #[tokio::test]
    async fn quick_win_horizon_requires_rsi_history() {
        // A single observation yields no RSI, so the 7-day model skips
        // the ticker; the 3-month model still scores it.
        let mut universe: BTreeMap<String, PriceSeries> = [series(
            "AAPL",
            &(0..30).map(|i| 100.0 + i as f64).collect::<Vec<_>>(),
            9_000.0,
        )]
        .into_iter()
        .collect();
        let (ticker, newly_listed) = series("RDDT", &[34.0], 2_000.0);
        universe.insert(ticker, newly_listed);

        let quick = recommend(&FakeClassifier, ModelHorizon::SevenDay, &universe)
            .await
            .unwrap();
        assert_eq!(quick.buys.len() + quick.sells.len(), 1);

        let broad = recommend(&FakeClassifier, ModelHorizon::ThreeMonth, &universe)
            .await
            .unwrap();
        assert_eq!(broad.buys.len() + broad.sells.len(), 2);
    }

    #[test]
    fn ymal_attaches_latest_move() {
        let universe = universe();
        let movers = daily_movers(&universe);
        let profiles = risk_scorer::score(&universe);

        let set = ymal(&profiles, &movers, 5, 3);
        assert!(!set.picks.is_empty());
        assert!(set.risk_message.contains("risk level"));
        for pick in &set.picks {
            assert!(pick.current_price > 0.0);
        }
    }
}
