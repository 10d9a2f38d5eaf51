use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Result;
use log::info;
use rand::prelude::*;
use rand_chacha::ChaCha20Rng;

/// Random baskets over items `0..universe` with skewed popularity, so that low
/// codes co-occur often enough to form frequent itemsets.
///
/// Basket sizes are uniform in `1..=2 * mean_len - 1`. The same seed always
/// produces the same baskets.
pub fn generate(seed: u64, transactions: usize, universe: u32, mean_len: usize) -> Vec<Vec<u32>> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let universe = universe.max(1);
    let max_len = (2 * mean_len.max(1)).saturating_sub(1).max(1);

    (0..transactions)
        .map(|_| {
            let len = rng.random_range(1..=max_len);
            let mut basket: Vec<u32> = (0..len)
                .map(|_| {
                    let u: f64 = rng.random();
                    ((u * u * universe as f64) as u32).min(universe - 1)
                })
                .collect();
            basket.sort_unstable();
            basket.dedup();
            basket
        })
        .collect()
}

/// Writes one comma-separated basket per line.
pub fn write_basket_file(path: &Path, transactions: &[Vec<u32>]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = BufWriter::new(File::create(path)?);
    let mut buffer = itoa::Buffer::new();
    for basket in transactions {
        for (position, &code) in basket.iter().enumerate() {
            if position > 0 {
                file.write_all(b",")?;
            }
            file.write_all(buffer.format(code).as_bytes())?;
        }
        file.write_all(b"\n")?;
    }
    file.flush()?;
    info!(
        "Wrote {} baskets to {}",
        transactions.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataloader::TransactionLoader;
    use tempfile::tempdir;

    #[test]
    fn test_generate_is_seeded() {
        assert_eq!(generate(1, 50, 20, 3), generate(1, 50, 20, 3));
        assert_ne!(generate(1, 50, 20, 3), generate(2, 50, 20, 3));
    }

    #[test]
    fn test_generate_shape() {
        let baskets = generate(4, 200, 8, 3);
        assert_eq!(baskets.len(), 200);
        for basket in &baskets {
            assert!(!basket.is_empty() && basket.len() <= 5);
            assert!(basket.windows(2).all(|w| w[0] < w[1]));
            assert!(basket.iter().all(|&code| code < 8));
        }
    }

    #[test]
    fn test_basket_file_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("baskets.csv");
        write_basket_file(&path, &[vec![0, 3, 12], vec![], vec![7]]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "0,3,12\n\n7\n");
    }

    #[test]
    fn test_written_file_loads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baskets.csv");
        let baskets = generate(8, 40, 6, 2);
        write_basket_file(&path, &baskets).unwrap();

        let store = TransactionLoader::default().load_basket_file(&path).unwrap();
        assert_eq!(store.len(), baskets.len());
        for (tid, basket) in baskets.iter().enumerate() {
            assert_eq!(store.transaction(tid).unwrap().len(), basket.len());
        }
    }
}
