use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Longest itemset the miner will grow. Portfolios are small and rules
/// past three tickers stop being readable suggestions.
const MAX_ITEMSET_LEN: usize = 3;

/// "Investors who hold `antecedent` also hold `consequent`."
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociationRule {
    pub antecedent: Vec<String>,
    pub consequent: Vec<String>,
    /// Share of users holding antecedent + consequent together.
    pub support: f64,
    /// P(consequent | antecedent).
    pub confidence: f64,
    /// Confidence relative to the consequent's base rate.
    pub lift: f64,
}

/// Mine association rules from a snapshot of every user's holdings.
///
/// Apriori over the one-hot ticker-per-user matrix: frequent itemsets
/// meet `min_support`, rules meet `min_confidence`. The snapshot is an
/// explicit argument; nothing is read from ambient state.
pub fn mine_rules(
    holdings_by_user: &BTreeMap<String, BTreeSet<String>>,
    min_support: f64,
    min_confidence: f64,
) -> Vec<AssociationRule> {
    let user_count = holdings_by_user.len();
    if user_count == 0 {
        return Vec::new();
    }

    let baskets: Vec<&BTreeSet<String>> = holdings_by_user.values().collect();
    let frequent = frequent_itemsets(&baskets, user_count, min_support);

    let mut rules = Vec::new();
    for (itemset, support) in frequent.iter().filter(|(items, _)| items.len() >= 2) {
        for (antecedent, consequent) in splits(itemset) {
            let Some(antecedent_support) = frequent.get(&antecedent) else {
                continue;
            };
            let Some(consequent_support) = frequent.get(&consequent) else {
                continue;
            };

            let confidence = support / antecedent_support;
            if confidence < min_confidence {
                continue;
            }

            rules.push(AssociationRule {
                antecedent: antecedent.into_iter().collect(),
                consequent: consequent.into_iter().collect(),
                support: *support,
                confidence,
                lift: confidence / consequent_support,
            });
        }
    }

    rules.sort_by(|a, b| {
        (b.confidence, b.support)
            .partial_cmp(&(a.confidence, a.support))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rules
}

/// The strongest rule suggesting companions for a just-bought ticker.
pub fn investors_also_bought<'a>(
    rules: &'a [AssociationRule],
    ticker: &str,
) -> Option<&'a AssociationRule> {
    rules
        .iter()
        .find(|rule| rule.antecedent.iter().any(|t| t == ticker))
}

/// Level-wise frequent itemset search. Returns itemset -> support.
fn frequent_itemsets(
    baskets: &[&BTreeSet<String>],
    user_count: usize,
    min_support: f64,
) -> BTreeMap<BTreeSet<String>, f64> {
    let mut frequent: BTreeMap<BTreeSet<String>, f64> = BTreeMap::new();

    // Level 1: single tickers.
    let mut singles: BTreeSet<String> = BTreeSet::new();
    for basket in baskets {
        singles.extend(basket.iter().cloned());
    }

    let mut current: Vec<BTreeSet<String>> = singles
        .into_iter()
        .map(|t| BTreeSet::from([t]))
        .collect();

    while !current.is_empty() {
        let mut next_seeds: BTreeSet<String> = BTreeSet::new();
        let mut survivors: Vec<BTreeSet<String>> = Vec::new();

        for itemset in current {
            let count = baskets.iter().filter(|b| itemset.is_subset(b)).count();
            let support = count as f64 / user_count as f64;
            if support >= min_support && support > 0.0 {
                next_seeds.extend(itemset.iter().cloned());
                survivors.push(itemset.clone());
                frequent.insert(itemset, support);
            }
        }

        if survivors.is_empty() || survivors[0].len() >= MAX_ITEMSET_LEN {
            break;
        }

        // Grow each survivor by one ticker drawn from the surviving pool.
        let mut next: BTreeSet<BTreeSet<String>> = BTreeSet::new();
        for itemset in &survivors {
            for ticker in &next_seeds {
                if !itemset.contains(ticker) {
                    let mut grown = itemset.clone();
                    grown.insert(ticker.clone());
                    next.insert(grown);
                }
            }
        }
        current = next.into_iter().collect();
    }

    frequent
}

/// Every (antecedent, consequent) split of an itemset into two
/// non-empty parts.
fn splits(itemset: &BTreeSet<String>) -> Vec<(BTreeSet<String>, BTreeSet<String>)> {
    let items: Vec<&String> = itemset.iter().collect();
    let n = items.len();
    let mut result = Vec::new();

    for mask in 1..(1u32 << n) - 1 {
        let mut antecedent = BTreeSet::new();
        let mut consequent = BTreeSet::new();
        for (i, item) in items.iter().enumerate() {
            if mask & (1 << i) != 0 {
                antecedent.insert((*item).clone());
            } else {
                consequent.insert((*item).clone());
            }
        }
        result.push((antecedent, consequent));
    }
    result
}
