use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use ahash::AHashSet;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{debug, info};
use rayon::prelude::*;

use crate::config::{CountingStrategy, MiningConfig};
use crate::error::{ConfigError, MineError};
use crate::store::TransactionStore;
use crate::structs::{FrequentItemset, ItemId, Itemset, NoResultReason, Outcome};
use crate::table::FrequentItemsetTable;

/// Cooperative stop flag, checked between mining levels.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Level-wise (Apriori) frequent itemset miner.
///
/// Level k+1 candidates are built by joining k-itemsets that share their first
/// k-1 members, pruned unless every k-subset is frequent, and counted against
/// the store. The search stops at the first empty level or at `max_length`.
#[derive(Debug, Clone)]
pub struct AprioriMiner {
    config: MiningConfig,
    cancel: Option<CancellationToken>,
}

impl AprioriMiner {
    pub fn new(config: MiningConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: None,
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &MiningConfig {
        &self.config
    }

    pub fn mine<I>(
        &self,
        store: &TransactionStore<I>,
    ) -> Result<Outcome<FrequentItemsetTable>, MineError>
    where
        I: Ord + Hash + Clone + Sync,
    {
        let start = Instant::now();
        let n = store.len();
        match n {
            0 => return Ok(Outcome::NoResult(NoResultReason::EmptyStore)),
            1 => return Ok(Outcome::NoResult(NoResultReason::TooFewTransactions)),
            _ => {}
        }
        let min_count = min_count(self.config.min_support, n);
        let max_length = self.config.max_length.unwrap_or(usize::MAX);
        info!(
            "Mining {n} transactions over {} items, min_support={} (count >= {min_count})",
            store.item_count(),
            self.config.min_support
        );

        let mut current: Vec<FrequentItemset> = (0..store.item_count())
            .filter_map(|idx| {
                let id = ItemId(idx as u32);
                let count = store.tids(id).len();
                (count >= min_count).then(|| FrequentItemset::new(Itemset::single(id), count, n))
            })
            .collect();
        info!("Level 1: {} frequent items", current.len());

        if current.is_empty() {
            return Ok(Outcome::NoResult(NoResultReason::NoFrequentItemsets));
        }

        let mut levels = Vec::new();
        while !current.is_empty() {
            let level_size = current.len();
            let level_len = current[0].len();
            levels.push(current);
            if level_len >= max_length {
                break;
            }
            if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                info!("Mining cancelled after level {level_len}");
                return Err(MineError::Cancelled {
                    completed_levels: levels.len(),
                });
            }

            let previous: Vec<&Itemset> = levels[levels.len() - 1]
                .iter()
                .map(|record| &record.itemset)
                .collect();
            let joined = generate_candidates(&previous);
            let joined_len = joined.len();
            let candidates = prune_candidates(joined, &previous);
            debug!(
                "Level {}: {joined_len} joined from {level_size}, {} survive subset pruning",
                level_len + 1,
                candidates.len()
            );
            if candidates.is_empty() {
                break;
            }

            let counts = self.count_candidates(store, &candidates);
            current = candidates
                .into_iter()
                .zip(counts)
                .filter(|(_, count)| *count >= min_count)
                .map(|(itemset, count)| FrequentItemset::new(itemset, count, n))
                .collect();
            info!(
                "Level {}: {} frequent itemsets",
                level_len + 1,
                current.len()
            );
        }

        let table = FrequentItemsetTable::from_levels(n, levels);
        info!(
            "Found {} frequent itemsets in {:.2} seconds",
            table.len(),
            start.elapsed().as_secs_f32()
        );
        Ok(Outcome::Found(table))
    }

    fn count_candidates<I: Sync>(
        &self,
        store: &TransactionStore<I>,
        candidates: &[Itemset],
    ) -> Vec<usize> {
        match self.config.counting {
            CountingStrategy::Scan => store.count_by_scan(candidates),
            CountingStrategy::Inverted => {
                let progress = if self.config.show_progress {
                    ProgressBar::new(candidates.len() as u64).with_style(
                        ProgressStyle::default_bar()
                            .template("[{elapsed_precise}] [{wide_bar}] {pos}/{len} ({eta})")
                            .unwrap_or_else(|_| ProgressStyle::default_bar()),
                    )
                } else {
                    ProgressBar::hidden()
                };
                let counts = candidates
                    .par_iter()
                    .progress_with(progress.clone())
                    .map(|candidate| store.count(candidate))
                    .collect();
                progress.finish_and_clear();
                counts
            }
        }
    }
}

/// Smallest transaction count `c` with `c / transaction_count >= min_support`,
/// so a count passes exactly when the support it reports does.
pub(crate) fn min_count(min_support: f64, transaction_count: usize) -> usize {
    let n = transaction_count.max(1);
    let reaches = |count: usize| count as f64 / n as f64 >= min_support;
    // the product may be off by one ulp either way, e.g. 0.1 * 30 = 3.0000000000000004
    let mut count = ((min_support * n as f64).ceil() as usize).clamp(1, n);
    while count > 1 && reaches(count - 1) {
        count -= 1;
    }
    while count <= n && !reaches(count) {
        count += 1;
    }
    count
}

/// Apriori-gen join over a canonically sorted level: itemsets sharing a
/// (k-1)-prefix are contiguous, so each one only joins with its followers in
/// the same prefix run.
pub(crate) fn generate_candidates(level: &[&Itemset]) -> Vec<Itemset> {
    let mut candidates = Vec::new();
    for (i, left) in level.iter().enumerate() {
        for right in &level[i + 1..] {
            match left.join(right) {
                Some(candidate) => candidates.push(candidate),
                None => break,
            }
        }
    }
    candidates
}

/// Drops candidates with a k-subset that is not frequent.
pub(crate) fn prune_candidates(candidates: Vec<Itemset>, level: &[&Itemset]) -> Vec<Itemset> {
    let frequent: AHashSet<&Itemset> = level.iter().copied().collect();
    candidates
        .into_par_iter()
        .filter(|candidate| {
            // the subsets without the last two members are the joined parents
            (0..candidate.len().saturating_sub(2))
                .all(|position| frequent.contains(&candidate.without(position)))
        })
        .collect()
}
