use market_core::Portfolio;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{RecommendationSet, StockRecommendation, YmalSet};

/// What the user can actually do with a sell-side pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SellAction {
    /// They hold it: close the position.
    SellShares,
    /// They don't: a short idea.
    ShortStock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellRecommendation {
    #[serde(flatten)]
    pub pick: StockRecommendation,
    pub action: SellAction,
}

/// The composed home view. Surfaces are filled in priority order; a
/// ticker appears on at most one of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeFeed {
    pub ymal: YmalSet,
    pub buys_for_you: Vec<StockRecommendation>,
    pub strategic_sells: Vec<SellRecommendation>,
    pub quick_wins: Vec<StockRecommendation>,
}

/// Tracks tickers already emitted by a higher-priority surface.
#[derive(Debug, Default)]
struct SeenTickers(HashSet<String>);

impl SeenTickers {
    fn admit(&mut self, ticker: &str) -> bool {
        self.0.insert(ticker.to_string())
    }

    fn contains(&self, ticker: &str) -> bool {
        self.0.contains(ticker)
    }
}

/// Compose the home surfaces from one recommendation pass.
///
/// Priority runs YMAL, then the 3-month buys, the 3-month sells, and
/// last the 7-day quick wins. Later surfaces drop tickers an earlier
/// surface already shows. Buy-side surfaces also drop tickers the user
/// already holds; the sell side keeps them and labels the action
/// instead, since exiting a held position is the useful advice.
pub fn compose_feed(
    portfolio: &Portfolio,
    ymal: YmalSet,
    for_you: &RecommendationSet,
    quick: &RecommendationSet,
    per_surface: usize,
) -> HomeFeed {
    let mut seen = SeenTickers::default();
    for pick in &ymal.picks {
        seen.admit(&pick.ticker);
    }

    let buys_for_you: Vec<StockRecommendation> = for_you
        .buys
        .iter()
        .filter(|r| !seen.contains(&r.ticker) && !portfolio.holds(&r.ticker))
        .take(per_surface)
        .cloned()
        .collect();
    for pick in &buys_for_you {
        seen.admit(&pick.ticker);
    }

    let strategic_sells: Vec<SellRecommendation> = for_you
        .sells
        .iter()
        .filter(|r| !seen.contains(&r.ticker))
        .take(per_surface)
        .map(|r| SellRecommendation {
            pick: r.clone(),
            action: if portfolio.holds(&r.ticker) {
                SellAction::SellShares
            } else {
                SellAction::ShortStock
            },
        })
        .collect();
    for sell in &strategic_sells {
        seen.admit(&sell.pick.ticker);
    }

    let quick_wins: Vec<StockRecommendation> = quick
        .buys
        .iter()
        .filter(|r| !seen.contains(&r.ticker) && !portfolio.holds(&r.ticker))
        .take(per_surface)
        .cloned()
        .collect();

    HomeFeed {
        ymal,
        buys_for_you,
        strategic_sells,
        quick_wins,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::YmalPick;

    fn rec(ticker: &str, probability: f64) -> StockRecommendation {
        StockRecommendation {
            ticker: ticker.to_string(),
            current_price: 100.0,
            probability,
        }
    }

    fn ymal_set(tickers: &[&str]) -> YmalSet {
        YmalSet {
            risk_message: "test".to_string(),
            picks: tickers
                .iter()
                .map(|t| YmalPick {
                    ticker: t.to_string(),
                    current_price: 50.0,
                    pct_change: 1.0,
                })
                .collect(),
        }
    }

    #[test]
    fn later_surfaces_exclude_earlier_tickers() {
        let for_you = RecommendationSet {
            buys: vec![rec("AAPL", 0.9), rec("MSFT", 0.8), rec("NVDA", 0.7)],
            sells: vec![rec("MSFT", 0.6), rec("GME", 0.5)],
        };
        let quick = RecommendationSet {
            buys: vec![rec("AAPL", 0.95), rec("NVDA", 0.9), rec("PLTR", 0.85)],
            sells: vec![],
        };

        let feed = compose_feed(
            &Portfolio::new(),
            ymal_set(&["AAPL"]),
            &for_you,
            &quick,
            8,
        );

        let buys: Vec<&str> = feed.buys_for_you.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(buys, vec!["MSFT", "NVDA"]);

        // MSFT already shown as a buy; only GME survives on the sell side.
        let sells: Vec<&str> = feed
            .strategic_sells
            .iter()
            .map(|s| s.pick.ticker.as_str())
            .collect();
        assert_eq!(sells, vec!["GME"]);

        // AAPL (ymal) and NVDA (buys) are gone; PLTR remains.
        let wins: Vec<&str> = feed.quick_wins.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(wins, vec!["PLTR"]);
    }

    #[test]
    fn held_tickers_never_appear_on_buy_surfaces() {
        let mut portfolio = Portfolio::new();
        portfolio.record("AAPL", 1, "2024-03-05".parse().unwrap());

        let for_you = RecommendationSet {
            buys: vec![rec("AAPL", 0.9), rec("MSFT", 0.8)],
            sells: vec![],
        };
        let quick = RecommendationSet {
            buys: vec![rec("AAPL", 0.95), rec("NVDA", 0.9)],
            sells: vec![],
        };

        let feed = compose_feed(&portfolio, ymal_set(&[]), &for_you, &quick, 8);
        assert!(feed.buys_for_you.iter().all(|r| r.ticker != "AAPL"));
        assert!(feed.quick_wins.iter().all(|r| r.ticker != "AAPL"));
    }

    #[test]
    fn held_sell_picks_become_sell_shares() {
        let mut portfolio = Portfolio::new();
        portfolio.record("GME", 2, "2024-03-05".parse().unwrap());

        let for_you = RecommendationSet {
            buys: vec![],
            sells: vec![rec("GME", 0.7), rec("MSFT", 0.6)],
        };

        let feed = compose_feed(
            &portfolio,
            ymal_set(&[]),
            &for_you,
            &RecommendationSet::default(),
            8,
        );

        assert_eq!(feed.strategic_sells[0].action, SellAction::SellShares);
        assert_eq!(feed.strategic_sells[1].action, SellAction::ShortStock);
    }

    #[test]
    fn per_surface_limit_is_enforced() {
        let for_you = RecommendationSet {
            buys: (0..20).map(|i| rec(&format!("T{i}"), 0.5)).collect(),
            sells: vec![],
        };

        let feed = compose_feed(
            &Portfolio::new(),
            ymal_set(&[]),
            &for_you,
            &RecommendationSet::default(),
            8,
        );
        assert_eq!(feed.buys_for_you.len(), 8);
    }
}
