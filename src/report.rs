use std::fmt::Display;
use std::fs::{self, File};
use std::path::Path;

use anyhow::Result;
use num_format::{Locale, ToFormattedString};
use serde::{Serialize, Serializer};

use crate::rules::RuleTable;
use crate::structs::{AssociationRule, FrequentItemset, Itemset, NoResultReason, Outcome};
use crate::table::FrequentItemsetTable;

/// A frequent itemset with its items spelled out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemsetRow {
    pub itemsets: Vec<String>,
    pub support: f64,
    pub length: usize,
    pub count: usize,
}

/// An association rule with its items spelled out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleRow {
    pub antecedents: Vec<String>,
    pub consequents: Vec<String>,
    pub antecedent_support: f64,
    pub consequent_support: f64,
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
    pub leverage: f64,
    #[serde(serialize_with = "serialize_unbounded")]
    pub conviction: f64,
}

fn serialize_unbounded<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_infinite() {
        serializer.serialize_str(if *value > 0.0 { "inf" } else { "-inf" })
    } else {
        serializer.serialize_f64(*value)
    }
}

/// `vocabulary` is indexed by [`crate::ItemId`], as kept by a
/// [`crate::TransactionStore`] or a saved table.
fn names<I: Display>(vocabulary: &[I], itemset: &Itemset) -> Vec<String> {
    itemset
        .items()
        .iter()
        .map(|id| vocabulary[id.index()].to_string())
        .collect()
}

pub fn itemset_row<I: Display>(vocabulary: &[I], record: &FrequentItemset) -> ItemsetRow {
    ItemsetRow {
        itemsets: names(vocabulary, &record.itemset),
        support: record.support,
        length: record.len(),
        count: record.count,
    }
}

pub fn rule_row<I: Display>(vocabulary: &[I], rule: &AssociationRule) -> RuleRow {
    RuleRow {
        antecedents: names(vocabulary, &rule.antecedent),
        consequents: names(vocabulary, &rule.consequent),
        antecedent_support: rule.antecedent_support,
        consequent_support: rule.consequent_support,
        support: rule.support,
        confidence: rule.confidence,
        lift: rule.lift,
        leverage: rule.leverage,
        conviction: rule.conviction,
    }
}

/// Presentation-filtered itemsets, descending support.
pub fn itemset_rows<I: Display>(
    vocabulary: &[I],
    table: &FrequentItemsetTable,
    min_length: usize,
    max_length: Option<usize>,
) -> Vec<ItemsetRow> {
    let upper = max_length.unwrap_or(usize::MAX);
    table
        .by_support()
        .into_iter()
        .filter(|record| record.len() >= min_length && record.len() <= upper)
        .map(|record| itemset_row(vocabulary, record))
        .collect()
}

pub fn rule_rows<'a, I: Display>(
    vocabulary: &[I],
    rules: impl IntoIterator<Item = &'a AssociationRule>,
) -> Vec<RuleRow> {
    rules.into_iter().map(|rule| rule_row(vocabulary, rule)).collect()
}

pub fn describe(reason: NoResultReason) -> String {
    match reason {
        NoResultReason::NoFrequentItemsets => {
            format!("No frequent itemsets: {reason}. Try a lower minimum support.")
        }
        NoResultReason::NoRules => {
            format!("No association rules: {reason}. Try a lower rule threshold.")
        }
        NoResultReason::EmptyStore | NoResultReason::TooFewTransactions => {
            format!("Nothing to mine: {reason}.")
        }
    }
}

pub fn print_itemsets(title: &str, rows: &[ItemsetRow]) {
    println!("\n{title}:\n");
    if rows.is_empty() {
        println!("(none)");
        return;
    }
    println!("{:>10}  {:>10}  {:>6}  itemsets", "support", "count", "length");
    for row in rows {
        println!(
            "{:>10.4}  {:>10}  {:>6}  {{{}}}",
            row.support,
            row.count.to_formatted_string(&Locale::en),
            row.length,
            row.itemsets.join(", ")
        );
    }
}

pub fn print_rules(title: &str, rows: &[RuleRow]) {
    println!("\n{title}:\n");
    if rows.is_empty() {
        println!("(none)");
        return;
    }
    println!(
        "{:>8}  {:>10}  {:>8}  {:>9}  {:>10}  rule",
        "support", "confidence", "lift", "leverage", "conviction"
    );
    for row in rows {
        println!(
            "{:>8.4}  {:>10.4}  {:>8.4}  {:>9.4}  {:>10.4}  {{{}}} => {{{}}}",
            row.support,
            row.confidence,
            row.lift,
            row.leverage,
            row.conviction,
            row.antecedents.join(", "),
            row.consequents.join(", ")
        );
    }
}

pub fn print_outcome_summary<T>(what: &str, outcome: &Outcome<T>, len: impl Fn(&T) -> usize) {
    match outcome {
        Outcome::Found(value) => {
            println!("{what}: {}", len(value).to_formatted_string(&Locale::en))
        }
        Outcome::NoResult(reason) => println!("{}", describe(*reason)),
    }
}

/// Writes `frequent_itemsets.json` and, when there are rules, `rules.json`.
pub fn save_json<I: Display>(
    output_dir: &Path,
    vocabulary: &[I],
    table: &FrequentItemsetTable,
    rules: Option<&RuleTable>,
) -> Result<()> {
    fs::create_dir_all(output_dir)?;

    let itemsets = itemset_rows(vocabulary, table, 1, None);
    let file = File::create(output_dir.join("frequent_itemsets.json"))?;
    serde_json::to_writer_pretty(file, &itemsets)?;

    if let Some(rules) = rules {
        let rows = rule_rows(vocabulary, rules.ranked());
        let file = File::create(output_dir.join("rules.json"))?;
        serde_json::to_writer_pretty(file, &rows)?;
    }
    Ok(())
}
