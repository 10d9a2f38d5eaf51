use ahash::AHashMap;

use crate::structs::{FrequentItemset, Itemset};

/// Every frequent itemset of one mining run, grouped by length.
///
/// The table is never filtered by length: rule generation needs the support
/// of every subset of a frequent itemset, and anti-monotonicity guarantees they
/// are all here. Use [`filter_length`](Self::filter_length) for presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequentItemsetTable {
    transaction_count: usize,
    /// `levels[k - 1]` holds the k-itemsets in canonical order.
    levels: Vec<Vec<FrequentItemset>>,
    positions: AHashMap<Itemset, (usize, usize)>,
}

impl FrequentItemsetTable {
    pub(crate) fn from_levels(transaction_count: usize, mut levels: Vec<Vec<FrequentItemset>>) -> Self {
        while levels.last().is_some_and(Vec::is_empty) {
            levels.pop();
        }
        for level in &mut levels {
            level.sort_by(|a, b| a.itemset.cmp(&b.itemset));
        }
        let positions = levels
            .iter()
            .enumerate()
            .flat_map(|(l, level)| {
                level
                    .iter()
                    .enumerate()
                    .map(move |(p, record)| (record.itemset.clone(), (l, p)))
            })
            .collect();
        Self {
            transaction_count,
            levels,
            positions,
        }
    }

    /// Rebuilds a table from flat records, e.g. ones read back from disk.
    pub fn from_records(
        transaction_count: usize,
        records: impl IntoIterator<Item = FrequentItemset>,
    ) -> Self {
        let mut levels: Vec<Vec<FrequentItemset>> = Vec::new();
        for record in records {
            let k = record.len();
            if k == 0 {
                continue;
            }
            if levels.len() < k {
                levels.resize_with(k, Vec::new);
            }
            levels[k - 1].push(record);
        }
        Self::from_levels(transaction_count, levels)
    }

    pub fn transaction_count(&self) -> usize {
        self.transaction_count
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Length of the longest frequent itemset.
    pub fn max_len(&self) -> usize {
        self.levels.len()
    }

    /// Frequent itemsets of length `k`, in canonical order.
    pub fn level(&self, k: usize) -> &[FrequentItemset] {
        match k {
            0 => &[],
            k => self.levels.get(k - 1).map(Vec::as_slice).unwrap_or(&[]),
        }
    }

    /// Shortest itemsets first, canonical order within a length.
    pub fn iter(&self) -> impl Iterator<Item = &FrequentItemset> {
        self.levels.iter().flatten()
    }

    pub fn get(&self, itemset: &Itemset) -> Option<&FrequentItemset> {
        self.positions
            .get(itemset)
            .map(|&(l, p)| &self.levels[l][p])
    }

    pub fn support(&self, itemset: &Itemset) -> Option<f64> {
        self.get(itemset).map(|record| record.support)
    }

    pub fn contains(&self, itemset: &Itemset) -> bool {
        self.positions.contains_key(itemset)
    }

    /// Itemsets whose length lies within `[min_length, max_length]`.
    pub fn filter_length(
        &self,
        min_length: usize,
        max_length: Option<usize>,
    ) -> impl Iterator<Item = &FrequentItemset> {
        let upper = max_length.unwrap_or(usize::MAX);
        self.iter()
            .filter(move |record| record.len() >= min_length && record.len() <= upper)
    }

    /// Descending support, ties in canonical itemset order.
    pub fn by_support(&self) -> Vec<&FrequentItemset> {
        let mut records: Vec<_> = self.iter().collect();
        records.sort_by(|a, b| {
            b.support
                .total_cmp(&a.support)
                .then_with(|| a.itemset.cmp(&b.itemset))
        });
        records
    }

    pub fn into_records(self) -> Vec<FrequentItemset> {
        self.levels.into_iter().flatten().collect()
    }
}
