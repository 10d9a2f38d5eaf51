use std::path::{Path, PathBuf};

use anyhow::Result;
use basket_rules::io::{
    describe, itemset_rows, print_itemsets, print_rules, rule_rows, save_json, save_table,
};
use basket_rules::{AprioriMiner, Config, Outcome, RuleGenerator, TransactionLoader};
use log::info;

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    env_logger::init();
    // parse environment variables `INPUT_FILE`, `OUTPUT_DIR`
    let input_file =
        std::env::var("INPUT_FILE").unwrap_or("/tmp/data/groceries.csv".to_string());
    let input_file = Path::new(&input_file);
    info!("input_file: {}", input_file.display());
    let output_dir = match std::env::var("OUTPUT_DIR") {
        Ok(dir) => PathBuf::new().join(dir),
        Err(_) => "/tmp/data/basket-rules".into(),
    };
    info!("output_dir: {}", output_dir.display());

    let config = Config::from_env()?;
    let miner = AprioriMiner::new(config.mining.clone())?;
    let generator = RuleGenerator::new(config.rules.clone())?;

    let loader = TransactionLoader::default().with_progress(config.mining.show_progress);
    let store = if input_file.is_dir() {
        loader.load_directory(input_file)?
    } else {
        loader.load_basket_file(input_file)?
    };

    let table = match miner.mine(&store)? {
        Outcome::Found(table) => table,
        Outcome::NoResult(reason) => {
            println!("{}", describe(reason));
            return Ok(());
        }
    };

    let min_support = config.mining.min_support;
    let min_length = config.mining.min_length;
    let max_length = config.mining.max_length;
    let bounds = match max_length {
        Some(max) if max == min_length => format!("of length {min_length}"),
        Some(max) => format!("of length {min_length}-{max}"),
        None => format!("of length >= {min_length}"),
    };
    print_itemsets(
        &format!("Itemsets {bounds} with support >= {min_support}"),
        &itemset_rows(store.vocabulary(), &table, min_length, max_length),
    );

    let rules = generator.generate(&table);
    match &rules {
        Outcome::Found(rules) => {
            print_rules(
                &format!(
                    "Top {} association rules with {} >= {}, sorted by confidence",
                    config.rules.top_k, config.rules.metric, config.rules.min_threshold
                ),
                &rule_rows(store.vocabulary(), rules.top()),
            );
            print_rules(
                &format!("Association rules with support >= {min_support} and lift > 1"),
                &rule_rows(store.vocabulary(), rules.positive_associations(min_support)),
            );
        }
        Outcome::NoResult(reason) => println!("\n{}", describe(*reason)),
    }

    save_json(&output_dir, store.vocabulary(), &table, rules.as_ref().found())?;
    save_table(
        &output_dir.join("frequent_itemsets.bin"),
        &table,
        store.vocabulary(),
    )?;
    info!("Results written to {}", output_dir.display());
    Ok(())
}
