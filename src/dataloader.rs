use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use flate2::read::GzDecoder;
use indicatif::{ParallelProgressIterator, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::store::TransactionStore;

/// Builds a [`TransactionStore`] from basket files on disk.
pub struct TransactionLoader {
    separator: char,
    show_progress: bool,
}

impl Default for TransactionLoader {
    fn default() -> Self {
        Self {
            separator: ',',
            show_progress: false,
        }
    }
}

impl TransactionLoader {
    pub fn new(separator: char) -> Self {
        Self {
            separator,
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}

impl TransactionLoader {
    /// One transaction per line. Files ending in `.gz` are decompressed.
    /// Blank lines become empty transactions.
    pub fn load_basket_file(&self, path: &Path) -> Result<TransactionStore> {
        let start = Instant::now();
        let file = File::open(path)?;
        let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };

        let mut transactions = Vec::new();
        for line in BufReader::new(reader).lines() {
            transactions.push(self.parse_line(&line?));
        }
        let store = TransactionStore::from_transactions(transactions);
        info!(
            "Loaded {} transactions ({} distinct items) from {} in {:.2} seconds",
            store.len(),
            store.item_count(),
            path.display(),
            start.elapsed().as_secs_f32()
        );
        Ok(store)
    }

    /// Every regular file below `dir` is one transaction of separated items.
    /// Files are taken in path order; unreadable files are skipped.
    pub fn load_directory(&self, dir: &Path) -> Result<TransactionStore> {
        if !dir.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Transaction directory not found: {}", dir.display()),
            )
            .into());
        }

        let mut paths: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        let skipped = boxcar::Vec::new();
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{wide_bar}] {pos}/{len} ({eta})")?;
        let progress = if self.show_progress {
            indicatif::ProgressBar::new(paths.len() as u64).with_style(style)
        } else {
            indicatif::ProgressBar::hidden()
        };

        let transactions: Vec<Vec<String>> = paths
            .par_iter()
            .progress_with(progress)
            .filter_map(|path| match std::fs::read_to_string(path) {
                Ok(content) => Some(
                    content
                        .lines()
                        .flat_map(|line| self.parse_line(line))
                        .collect(),
                ),
                Err(e) => {
                    warn!("Skipping {}: {e}", path.display());
                    skipped.push(path.clone());
                    None
                }
            })
            .collect();

        if skipped.count() > 0 {
            warn!("Skipped {} unreadable files", skipped.count());
        }
        let store = TransactionStore::from_transactions(transactions);
        info!(
            "Loaded {} transactions ({} distinct items) from {}",
            store.len(),
            store.item_count(),
            dir.display()
        );
        Ok(store)
    }

    fn parse_line(&self, line: &str) -> Vec<String> {
        line.split(self.separator)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::fs;
    use std::io::Write;
    use tempfile::tempdir;

    const BASKETS: &str = "milk,bread\nmilk, bread ,butter\nbread,butter,\n\nmilk,milk\n";

    #[test]
    fn test_load_basket_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("groceries.csv");
        fs::write(&path, BASKETS).unwrap();

        let store = TransactionLoader::default().load_basket_file(&path).unwrap();
        assert_eq!(store.len(), 5);
        assert_eq!(store.vocabulary(), &["bread", "butter", "milk"]);
        assert_eq!(store.transaction(1).unwrap().len(), 3);
        assert!(store.transaction(3).unwrap().is_empty());
        assert_eq!(store.transaction(4).unwrap().len(), 1);
    }

    #[test]
    fn test_load_gzip_basket_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("groceries.csv.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(BASKETS.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let store = TransactionLoader::default().load_basket_file(&path).unwrap();
        assert_eq!(store.len(), 5);
        assert_eq!(store.item_count(), 3);
    }

    #[test]
    fn test_custom_separator() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baskets.tsv");
        fs::write(&path, "a\tb\nb\tc\n").unwrap();
        let store = TransactionLoader::new('\t').load_basket_file(&path).unwrap();
        assert_eq!(store.vocabulary(), &["a", "b", "c"]);
    }

    #[test]
    fn test_load_directory_in_path_order() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("2"), "cherry,apple").unwrap();
        fs::write(dir.path().join("1"), "apple,banana").unwrap();
        fs::write(dir.path().join("nested").join("3"), "banana\ncherry").unwrap();

        let store = TransactionLoader::default()
            .load_directory(dir.path())
            .unwrap();
        assert_eq!(store.len(), 3);
        let first: Vec<_> = store.labels(store.transaction(0).unwrap());
        assert_eq!(first, vec!["apple", "banana"]);
        let last: Vec<_> = store.labels(store.transaction(2).unwrap());
        assert_eq!(last, vec!["banana", "cherry"]);
    }

    #[test]
    fn test_directory_not_found() {
        let dir = tempdir().unwrap();
        let result = TransactionLoader::default().load_directory(&dir.path().join("missing"));
        assert_eq!(
            result
                .unwrap_err()
                .downcast_ref::<std::io::Error>()
                .unwrap()
                .kind(),
            std::io::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_missing_basket_file() {
        let dir = tempdir().unwrap();
        let result = TransactionLoader::default().load_basket_file(&dir.path().join("none.csv"));
        assert!(result.is_err());
    }
}
