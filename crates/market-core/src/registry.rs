use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ticker -> company display name. Static reference data supplied by the
/// hosting application; `builtin()` carries the default trading universe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickerRegistry {
    names: BTreeMap<String, String>,
}

const BUILTIN_UNIVERSE: &[(&str, &str)] = &[
    ("AAPL", "Apple Inc."),
    ("ABNB", "Airbnb Inc"),
    ("AMD", "Advanced Micro Devices Inc."),
    ("AMZN", "Amazon.com Inc."),
    ("AXP", "American Express Company"),
    ("BA", "The Boeing Company"),
    ("BABA", "Alibaba Group Holding Limited"),
    ("BP", "British Petroleum"),
    ("CAT", "Caterpillar Inc."),
    ("CMCSA", "Comcast"),
    ("CMG", "Chipotle"),
    ("COF", "Capital One Financial Corporation"),
    ("COIN", "Coinbase Global Inc"),
    ("COST", "Costco Wholesale Corporation"),
    ("CRM", "Salesforce.com Inc."),
    ("CSCO", "Cisco Systems Inc."),
    ("CVX", "Chevron Corporation"),
    ("DASH", "DoorDash Inc"),
    ("DELL", "Dell Technologies Inc"),
    ("DIS", "The Walt Disney Company"),
    ("EXPE", "Expedia Group Inc"),
    ("F", "Ford Motor Company"),
    ("GME", "Gamestop"),
    ("GOOG", "Alphabet Inc. (Google Class C Shares)"),
    ("GOOGL", "Alphabet Inc. (Google Class A Shares)"),
    ("GS", "The Goldman Sachs Group Inc."),
    ("HD", "The Home Depot Inc."),
    ("IBM", "International Business Machines Corporation"),
    ("INTC", "Intel Corporation"),
    ("INTU", "Intuit"),
    ("JPM", "JPMorgan Chase & Co."),
    ("KO", "The Coca-Cola Company"),
    ("LYFT", "LYFT Inc"),
    ("MCD", "McDonald's Corporation"),
    ("META", "Meta Platforms Inc. (Facebook)"),
    ("MRK", "Merck & Co. Inc."),
    ("MRNA", "Moderna Inc."),
    ("MSFT", "Microsoft Corporation"),
    ("MU", "Micron Technology"),
    ("NFLX", "Netflix"),
    ("NKE", "NIKE Inc."),
    ("NOW", "ServiceNow"),
    ("NVDA", "NVIDIA Corporation"),
    ("ORCL", "Oracle"),
    ("OXY", "Occidental Petroleum"),
    ("PANW", "Palo Alto Networks"),
    ("PEP", "PepsiCo Inc."),
    ("PFE", "Pfizer Inc."),
    ("PG", "Procter & Gamble Co."),
    ("PLTR", "Palantir Technologies"),
    ("PYPL", "PayPal Holdings Inc."),
    ("QQQ", "Invesco QQQ ETF"),
    ("RDDT", "Reddit Inc"),
    ("RIVN", "Rivian Automotive Inc"),
    ("SHOP", "Shopify"),
    ("SPOT", "Spotify Technology"),
    ("TSLA", "Tesla Inc."),
    ("UBER", "Uber Technologies"),
    ("UL", "Unilever"),
    ("UNH", "UnitedHealth Group Incorporated"),
    ("V", "Visa Inc."),
    ("WMT", "Walmart Inc."),
    ("XOM", "Exxon Mobil Corporation"),
];

impl TickerRegistry {
    pub fn new(names: BTreeMap<String, String>) -> Self {
        Self { names }
    }

    /// The default universe shipped with the dashboard.
    pub fn builtin() -> Self {
        Self {
            names: BUILTIN_UNIVERSE
                .iter()
                .map(|(t, n)| (t.to_string(), n.to_string()))
                .collect(),
        }
    }

    pub fn display_name(&self, ticker: &str) -> Option<&str> {
        self.names.get(ticker).map(String::as_str)
    }

    /// All tickers, sorted.
    pub fn tickers(&self) -> Vec<String> {
        self.names.keys().cloned().collect()
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.names.contains_key(ticker)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_universe_is_sorted_and_nonempty() {
        let registry = TickerRegistry::builtin();
        assert!(registry.len() > 50);
        let tickers = registry.tickers();
        assert!(tickers.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(registry.display_name("AAPL"), Some("Apple Inc."));
    }
}
