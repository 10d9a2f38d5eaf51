use std::env;
use std::path::PathBuf;

use anyhow::Result;
use basket_rules::io::{generate, write_basket_file};

fn main() -> Result<()> {
    env_logger::init();
    // parse environment variables `OUTPUT_FILE`, `SEED`, `TRANSACTIONS`, `UNIVERSE`, `MEAN_LEN`
    let output_file = PathBuf::from(
        env::var("OUTPUT_FILE").unwrap_or("/tmp/data/synthetic_baskets.csv".to_string()),
    );
    let seed: u64 = env::var("SEED").unwrap_or("42".to_string()).parse()?;
    let transactions: usize = env::var("TRANSACTIONS")
        .unwrap_or("10000".to_string())
        .parse()?;
    let universe: u32 = env::var("UNIVERSE").unwrap_or("200".to_string()).parse()?;
    let mean_len: usize = env::var("MEAN_LEN").unwrap_or("4".to_string()).parse()?;

    let baskets = generate(seed, transactions, universe, mean_len);
    write_basket_file(&output_file, &baskets)?;
    println!("Wrote {} baskets to {}", baskets.len(), output_file.display());
    Ok(())
}
