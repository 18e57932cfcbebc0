//! feed-builder: assemble the personalized dashboard feed as JSON.
//!
//! Stands in for the page-rendering layer: fetches the universe,
//! computes movers, risk buckets, similarity neighbours, portfolio
//! valuation, and (when a classifier endpoint is configured) the
//! model-driven recommendation surfaces.
//!
//! Usage:
//!   cargo run -p feed-builder -- --risk-level 5
//!   cargo run -p feed-builder -- --risk-level 8 --portfolio portfolio.json
//!   CLASSIFIER_URL=http://localhost:8500 cargo run -p feed-builder

use market_core::{DateSpec, Portfolio, TickerRegistry};
use market_data::{ChartClient, FetchConfig, MarketDataFetcher};
use recommendation_engine::{compose_feed, recommend, ymal, ModelHorizon, RemoteClassifier};
use serde_json::json;
use std::sync::Arc;

const LOOKBACK_DAYS: i64 = 30;
const YMAL_PICKS: usize = 5;
const MOVERS_SHOWN: usize = 5;
const SIMILAR_PER_HOLDING: usize = 3;
const PER_SURFACE: usize = 8;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feed_builder=info,market_data=warn".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let risk_level: u8 = args
        .iter()
        .position(|a| a == "--risk-level")
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
        .unwrap_or(5);

    let portfolio: Portfolio = match args
        .iter()
        .position(|a| a == "--portfolio")
        .and_then(|i| args.get(i + 1))
    {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => Portfolio::new(),
    };

    let registry = TickerRegistry::builtin();
    let fetcher = MarketDataFetcher::new(Arc::new(ChartClient::new()), FetchConfig::from_env());

    tracing::info!(universe = registry.len(), risk_level, "building feed");

    let series = fetcher
        .fetch_universe(
            &registry.tickers(),
            DateSpec::DaysAgo(LOOKBACK_DAYS),
            DateSpec::MostRecentTradingDay,
        )
        .await;
    tracing::info!(fetched = series.len(), "universe fetched");

    // Explore surfaces: movers and similarity.
    let movers = indicator_engine::daily_movers(&series);
    let gainers: Vec<_> = indicator_engine::top_gainers(&movers, MOVERS_SHOWN)
        .into_iter()
        .map(|m| {
            json!({
                "ticker": m.gain.ticker,
                "name": registry.display_name(&m.gain.ticker),
                "rank": m.rank,
                "close": m.gain.close,
                "pct_change": m.gain.pct_change,
            })
        })
        .collect();
    let losers: Vec<_> = indicator_engine::top_losers(&movers, MOVERS_SHOWN)
        .into_iter()
        .map(|m| {
            json!({
                "ticker": m.gain.ticker,
                "rank": m.rank,
                "close": m.gain.close,
                "pct_change": m.gain.pct_change,
            })
        })
        .collect();

    let similar = match similarity_engine::similarity(&series) {
        Ok(matrix) => portfolio
            .tickers()
            .iter()
            .map(|t| json!({ "ticker": t, "neighbours": matrix.most_similar(t, SIMILAR_PER_HOLDING) }))
            .collect::<Vec<_>>(),
        Err(err) => {
            tracing::warn!(%err, "similarity unavailable");
            Vec::new()
        }
    };

    // Personalized surfaces.
    let profiles = risk_scorer::score(&series);
    let ymal_set = ymal(&profiles, &movers, risk_level, YMAL_PICKS);

    let recommendations = match RemoteClassifier::from_env() {
        Some(classifier) => {
            let for_you = recommend(&classifier, ModelHorizon::ThreeMonth, &series).await;
            let quick = recommend(&classifier, ModelHorizon::SevenDay, &series).await;
            match (for_you, quick) {
                (Ok(for_you), Ok(quick)) => {
                    let feed = compose_feed(&portfolio, ymal_set, &for_you, &quick, PER_SURFACE);
                    json!({ "available": true, "feed": feed })
                }
                (Err(err), _) | (_, Err(err)) => {
                    tracing::warn!(%err, "recommendations unavailable");
                    json!({ "available": false, "ymal": ymal_set, "reason": err.to_string() })
                }
            }
        }
        None => {
            tracing::info!("CLASSIFIER_URL not set; serving risk-bucketed picks only");
            json!({ "available": false, "ymal": ymal_set, "reason": "no classifier configured" })
        }
    };

    // Portfolio surfaces.
    let valuations = portfolio_metrics::value_now(&portfolio, &fetcher).await;
    let summary = portfolio_metrics::portfolio_summary(valuations);
    let history = portfolio_metrics::value_over_time(&portfolio, &fetcher).await;

    let document = json!({
        "top_gainers": gainers,
        "top_losers": losers,
        "recommendations": recommendations,
        "more_like_your_holdings": similar,
        "portfolio": {
            "summary": summary,
            "history": history,
        },
    });

    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}
