use std::env;
use std::path::PathBuf;

use anyhow::Result;
use basket_rules::io::{describe, load_table, print_rules, rule_rows};
use basket_rules::{Config, Outcome, RuleGenerator};
use log::info;
use num_format::{Locale, ToFormattedString};

fn main() -> Result<()> {
    env_logger::init();
    // load `TABLE_PATH`
    let table_path = env::var("TABLE_PATH")
        .unwrap_or("/tmp/data/basket-rules/frequent_itemsets.bin".to_string());
    let table_path = PathBuf::from(table_path);
    info!("table_path: {}", table_path.display());

    let config = Config::from_env()?;
    let saved = load_table(&table_path)?;
    println!(
        "Loaded {} frequent itemsets over {} items mined from {} transactions",
        saved.table.len().to_formatted_string(&Locale::en),
        saved.vocabulary.len().to_formatted_string(&Locale::en),
        saved.table.transaction_count().to_formatted_string(&Locale::en)
    );

    match RuleGenerator::new(config.rules.clone())?.generate(&saved.table) {
        Outcome::Found(rules) => {
            print_rules(
                &format!(
                    "Top {} association rules with {} >= {}, sorted by confidence",
                    config.rules.top_k, config.rules.metric, config.rules.min_threshold
                ),
                &rule_rows(&saved.vocabulary, rules.top()),
            );
            print_rules(
                &format!(
                    "Association rules with support >= {} and lift > 1",
                    config.mining.min_support
                ),
                &rule_rows(
                    &saved.vocabulary,
                    rules.positive_associations(config.mining.min_support),
                ),
            );
        }
        Outcome::NoResult(reason) => println!("{}", describe(reason)),
    }
    Ok(())
}
