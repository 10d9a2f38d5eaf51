use std::cmp::Ordering;
use std::time::Instant;

use log::{info, warn};
use rayon::prelude::*;

use crate::config::{Metric, RuleConfig};
use crate::error::ConfigError;
use crate::structs::{AssociationRule, FrequentItemset, Itemset, NoResultReason, Outcome};
use crate::table::FrequentItemsetTable;

/// Splits are enumerated with a `u64` bitmask.
const MAX_SPLIT_LEN: usize = 63;

impl AssociationRule {
    pub(crate) fn from_supports(
        antecedent: Itemset,
        consequent: Itemset,
        antecedent_support: f64,
        consequent_support: f64,
        support: f64,
    ) -> Self {
        let confidence = support / antecedent_support;
        let lift = confidence / consequent_support;
        let leverage = support - antecedent_support * consequent_support;
        let conviction = if confidence < 1.0 {
            (1.0 - consequent_support) / (1.0 - confidence)
        } else {
            f64::INFINITY
        };
        Self {
            antecedent,
            consequent,
            antecedent_support,
            consequent_support,
            support,
            confidence,
            lift,
            leverage,
            conviction,
        }
    }

    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Support => self.support,
            Metric::Confidence => self.confidence,
            Metric::Lift => self.lift,
            Metric::Leverage => self.leverage,
            Metric::Conviction => self.conviction,
        }
    }
}

/// Ranking used for the top-K list: confidence, then support, both
/// descending, then antecedent and consequent in canonical order.
pub fn rank(a: &AssociationRule, b: &AssociationRule) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| b.support.total_cmp(&a.support))
        .then_with(|| a.antecedent.cmp(&b.antecedent))
        .then_with(|| a.consequent.cmp(&b.consequent))
}

/// Every rule that passed the metric threshold, in generation order
/// (frequent-table order, then split mask order).
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTable {
    rules: Vec<AssociationRule>,
    top_k: usize,
}

impl RuleTable {
    pub fn rules(&self) -> &[AssociationRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AssociationRule> {
        self.rules.iter()
    }

    /// All rules in [`rank`] order.
    pub fn ranked(&self) -> Vec<&AssociationRule> {
        let mut ranked: Vec<_> = self.rules.iter().collect();
        ranked.sort_by(|a, b| rank(a, b));
        ranked
    }

    /// The configured number of best rules in [`rank`] order.
    pub fn top(&self) -> Vec<&AssociationRule> {
        let mut ranked = self.ranked();
        ranked.truncate(self.top_k);
        ranked
    }

    pub fn filter(&self, predicate: impl Fn(&AssociationRule) -> bool) -> Vec<&AssociationRule> {
        self.rules.iter().filter(|rule| predicate(rule)).collect()
    }

    /// Rules at or above `min_support` whose lift shows positive association.
    pub fn positive_associations(&self, min_support: f64) -> Vec<&AssociationRule> {
        self.filter(|rule| rule.support >= min_support && rule.lift > 1.0)
    }

    pub fn into_rules(self) -> Vec<AssociationRule> {
        self.rules
    }
}

#[derive(Debug, Clone)]
pub struct RuleGenerator {
    config: RuleConfig,
}

impl RuleGenerator {
    pub fn new(config: RuleConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    pub fn generate(&self, table: &FrequentItemsetTable) -> Outcome<RuleTable> {
        if table.is_empty() {
            return Outcome::NoResult(NoResultReason::NoFrequentItemsets);
        }
        let start = Instant::now();
        let sources: Vec<&FrequentItemset> = table.iter().filter(|r| r.len() >= 2).collect();

        let rules: Vec<AssociationRule> = sources
            .par_iter()
            .flat_map_iter(|record| self.rules_for(table, record))
            .collect();

        info!(
            "Generated {} rules from {} itemsets ({} >= {}) in {:.2} seconds",
            rules.len(),
            sources.len(),
            self.config.metric,
            self.config.min_threshold,
            start.elapsed().as_secs_f32()
        );

        if rules.is_empty() {
            return Outcome::NoResult(NoResultReason::NoRules);
        }
        Outcome::Found(RuleTable {
            rules,
            top_k: self.config.top_k,
        })
    }

    fn rules_for(&self, table: &FrequentItemsetTable, record: &FrequentItemset) -> Vec<AssociationRule> {
        let len = record.len();
        if len > MAX_SPLIT_LEN {
            warn!("Skipping rules for an itemset of length {len}");
            return Vec::new();
        }

        let full: u64 = (1u64 << len) - 1;
        let mut rules = Vec::new();
        for mask in 1..full {
            let (antecedent, consequent) = record.itemset.split(mask);
            // subsets of a frequent itemset are frequent, the lookup only misses
            // on tables that were truncated by hand
            let (Some(a), Some(c)) = (table.support(&antecedent), table.support(&consequent))
            else {
                continue;
            };
            let rule = AssociationRule::from_supports(antecedent, consequent, a, c, record.support);
            if rule.metric(self.config.metric) >= self.config.min_threshold {
                rules.push(rule);
            }
        }
        rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MiningConfig;
    use crate::miner::AprioriMiner;
    use crate::store::TransactionStore;
    use crate::synthetic;

    const EPS: f64 = 1e-9;

    fn groceries() -> TransactionStore<&'static str> {
        TransactionStore::from_transactions(vec![
            vec!["milk", "bread"],
            vec!["milk", "bread", "butter"],
            vec!["bread", "butter"],
            vec!["milk"],
        ])
    }

    fn mine<I: Ord + std::hash::Hash + Clone + Sync>(
        store: &TransactionStore<I>,
        min_support: f64,
    ) -> FrequentItemsetTable {
        AprioriMiner::new(MiningConfig::new(min_support))
            .unwrap()
            .mine(store)
            .unwrap()
            .found()
            .unwrap()
    }

    fn generator(metric: Metric, threshold: f64) -> RuleGenerator {
        RuleGenerator::new(RuleConfig::new(metric, threshold)).unwrap()
    }

    fn find<'a>(
        rules: &'a RuleTable,
        store: &TransactionStore<&'static str>,
        antecedent: &[&'static str],
        consequent: &[&'static str],
    ) -> Option<&'a AssociationRule> {
        let a = store.itemset_of(antecedent.iter())?;
        let c = store.itemset_of(consequent.iter())?;
        rules
            .iter()
            .find(|rule| rule.antecedent == a && rule.consequent == c)
    }

    #[test]
    fn test_milk_implies_bread() {
        let store = groceries();
        let table = mine(&store, 0.5);
        let rules = generator(Metric::Confidence, 0.0).generate(&table).found().unwrap();

        let rule = find(&rules, &store, &["milk"], &["bread"]).unwrap();
        assert!((rule.support - 0.5).abs() < EPS);
        assert!((rule.confidence - 2.0 / 3.0).abs() < EPS);
        assert!((rule.lift - 8.0 / 9.0).abs() < EPS);
        assert!((rule.leverage - (0.5 - 0.75 * 0.75)).abs() < EPS);
        assert!((rule.conviction - 0.25 / (1.0 / 3.0)).abs() < EPS);

        // {bread,milk} and {bread,butter} each yield two rules
        assert_eq!(rules.len(), 4);
    }

    #[test]
    fn test_certain_rule_has_infinite_conviction() {
        let store = groceries();
        let table = mine(&store, 0.5);
        let rules = generator(Metric::Confidence, 0.0).generate(&table).found().unwrap();
        let rule = find(&rules, &store, &["butter"], &["bread"]).unwrap();
        assert_eq!(rule.confidence, 1.0);
        assert!(rule.conviction.is_infinite());
    }

    #[test]
    fn test_threshold_gates_rules() {
        let store = groceries();
        let table = mine(&store, 0.5);
        let rules = generator(Metric::Lift, 1.0).generate(&table).found().unwrap();
        // only butter <-> bread reach lift 4/3
        assert_eq!(rules.len(), 2);
        for rule in rules.iter() {
            assert!(rule.lift >= 1.0);
        }

        let none = generator(Metric::Confidence, 1.0)
            .generate(&mine(&groceries(), 0.75))
            .no_result_reason();
        assert_eq!(none, Some(NoResultReason::NoRules));
    }

    #[test]
    fn test_empty_table_is_no_result() {
        let table = FrequentItemsetTable::from_records(4, Vec::new());
        assert_eq!(
            generator(Metric::Support, 0.1).generate(&table).no_result_reason(),
            Some(NoResultReason::NoFrequentItemsets)
        );
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        assert!(RuleGenerator::new(RuleConfig::new(Metric::Confidence, 2.0)).is_err());
    }

    #[test]
    fn test_rule_properties_on_random_baskets() {
        let store = TransactionStore::from_transactions(synthetic::generate(5, 400, 12, 5));
        let table = mine(&store, 0.03);
        let rules = generator(Metric::Support, 0.0).generate(&table).found().unwrap();

        let expected: usize = table
            .iter()
            .filter(|r| r.len() >= 2)
            .map(|r| (1usize << r.len()) - 2)
            .sum();
        assert_eq!(rules.len(), expected);

        for rule in rules.iter() {
            assert!(rule.antecedent.is_disjoint(&rule.consequent));
            let union = rule.antecedent.union(&rule.consequent);
            assert_eq!(table.support(&union), Some(rule.support));
            assert!((0.0..=1.0).contains(&rule.confidence));
            assert!((0.0..=1.0).contains(&rule.support));

            let direct = rule.support / (rule.antecedent_support * rule.consequent_support);
            assert!((direct - rule.lift).abs() < EPS * rule.lift.max(1.0));
        }
    }

    #[test]
    fn test_top_k_is_deterministic() {
        let store = TransactionStore::from_transactions(synthetic::generate(9, 300, 10, 4));
        let table = mine(&store, 0.05);
        let config = RuleConfig::new(Metric::Confidence, 0.1).with_top_k(5);
        let first = RuleGenerator::new(config.clone()).unwrap().generate(&table).found().unwrap();
        let second = RuleGenerator::new(config).unwrap().generate(&table).found().unwrap();

        assert_eq!(first, second);
        let top = first.top();
        assert_eq!(top.len(), 5.min(first.len()));
        assert_eq!(top, second.top());
        for pair in top.windows(2) {
            assert_ne!(rank(pair[0], pair[1]), Ordering::Greater);
        }
    }

    #[test]
    fn test_top_zero_surfaces_nothing() {
        let store = groceries();
        let table = mine(&store, 0.5);
        let rules = RuleGenerator::new(RuleConfig::new(Metric::Support, 0.0).with_top_k(0))
            .unwrap()
            .generate(&table)
            .found()
            .unwrap();
        assert!(rules.top().is_empty());
        assert_eq!(rules.len(), 4);
    }

    #[test]
    fn test_positive_associations() {
        let store = groceries();
        let table = mine(&store, 0.5);
        let rules = generator(Metric::Support, 0.5).generate(&table).found().unwrap();
        let positive = rules.positive_associations(0.5);
        assert_eq!(positive.len(), 2);
        assert!(positive.iter().all(|r| r.lift > 1.0));
    }

    #[test]
    fn test_default_gate_keeps_every_frequent_rule() {
        let config = crate::config::Config::from_lookup(|name| {
            (name == "MIN_SUPPORT").then(|| "0.5".to_string())
        })
        .unwrap();
        let store = groceries();
        let table = mine(&store, config.mining.min_support);
        let rules = RuleGenerator::new(config.rules)
            .unwrap()
            .generate(&table)
            .found()
            .unwrap();
        assert_eq!(rules.len(), 4);
        assert_eq!(rules.positive_associations(0.5).len(), 2);
    }
}
