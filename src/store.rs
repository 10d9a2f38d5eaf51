use std::collections::BTreeSet;
use std::hash::Hash;

use ahash::AHashMap;
use rayon::prelude::*;

use crate::structs::{ItemId, Itemset};

const SCAN_SHARD: usize = 4096;

/// Immutable, indexed collection of transactions.
///
/// Items are interned to dense [`ItemId`]s in ascending item order. Every
/// transaction is stored as a canonical [`Itemset`]; an inverted index maps each
/// item to the ascending ids of the transactions that contain it.
#[derive(Debug, Clone)]
pub struct TransactionStore<I = String> {
    vocabulary: Vec<I>,
    lookup: AHashMap<I, ItemId>,
    transactions: Vec<Itemset>,
    index: Vec<Vec<u32>>,
}

/// Narrows a position to the `u32` used for item and transaction ids.
///
/// Panics past `u32::MAX`, the most items or transactions a store can hold.
fn dense_id(position: usize, what: &str) -> u32 {
    match u32::try_from(position) {
        Ok(id) => id,
        Err(_) => panic!("{what} position {position} does not fit a u32 id"),
    }
}

impl<I: Ord + Hash + Clone> TransactionStore<I> {
    /// Interns and indexes `transactions`.
    ///
    /// A store holds at most `u32::MAX + 1` distinct items and as many
    /// transactions; building a larger one panics.
    pub fn from_transactions<T, It>(transactions: T) -> Self
    where
        T: IntoIterator<Item = It>,
        It: IntoIterator<Item = I>,
    {
        let raw: Vec<Vec<I>> = transactions
            .into_iter()
            .map(|t| t.into_iter().collect())
            .collect();

        let vocabulary: Vec<I> = raw
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let lookup: AHashMap<I, ItemId> = vocabulary
            .iter()
            .enumerate()
            .map(|(idx, item)| (item.clone(), ItemId(dense_id(idx, "item"))))
            .collect();

        let transactions: Vec<Itemset> = raw
            .iter()
            .map(|t| t.iter().map(|item| lookup[item]).collect())
            .collect();

        let mut index = vec![Vec::new(); vocabulary.len()];
        for (tid, transaction) in transactions.iter().enumerate() {
            let tid = dense_id(tid, "transaction");
            for item in transaction.items() {
                index[item.index()].push(tid);
            }
        }

        Self {
            vocabulary,
            lookup,
            transactions,
            index,
        }
    }

    pub fn id_of(&self, item: &I) -> Option<ItemId> {
        self.lookup.get(item).copied()
    }

    /// `None` when any of the items never occurs in the store.
    pub fn itemset_of<'a>(&self, items: impl IntoIterator<Item = &'a I>) -> Option<Itemset>
    where
        I: 'a,
    {
        items
            .into_iter()
            .map(|item| self.id_of(item))
            .collect::<Option<Vec<_>>>()
            .map(Itemset::new)
    }
}

impl<I> TransactionStore<I> {
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Number of distinct items.
    pub fn item_count(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn vocabulary(&self) -> &[I] {
        &self.vocabulary
    }

    pub fn item(&self, id: ItemId) -> Option<&I> {
        self.vocabulary.get(id.index())
    }

    /// Resolves every member of `itemset` back to its item. Panics on ids that
    /// do not belong to this store.
    pub fn labels(&self, itemset: &Itemset) -> Vec<&I> {
        itemset
            .items()
            .iter()
            .map(|id| &self.vocabulary[id.index()])
            .collect()
    }

    pub fn transactions(&self) -> &[Itemset] {
        &self.transactions
    }

    pub fn transaction(&self, tid: usize) -> Option<&Itemset> {
        self.transactions.get(tid)
    }

    /// Ascending ids of the transactions containing `item`.
    pub fn tids(&self, item: ItemId) -> &[u32] {
        self.index
            .get(item.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of transactions containing every member of `itemset`.
    pub fn count(&self, itemset: &Itemset) -> usize {
        match itemset.items() {
            [] => self.len(),
            [only] => self.tids(*only).len(),
            members => {
                let mut lists: Vec<&[u32]> = members.iter().map(|id| self.tids(*id)).collect();
                // walk the shortest list, probe the others
                lists.sort_unstable_by_key(|l| l.len());
                let Some((first, rest)) = lists.split_first() else {
                    return 0;
                };
                let mut cursors = vec![0usize; rest.len()];

                let mut count = 0;
                'tids: for &tid in first.iter() {
                    for (list, cursor) in rest.iter().zip(cursors.iter_mut()) {
                        while *cursor < list.len() && list[*cursor] < tid {
                            *cursor += 1;
                        }
                        if *cursor == list.len() {
                            break 'tids;
                        }
                        if list[*cursor] != tid {
                            continue 'tids;
                        }
                    }
                    count += 1;
                }
                count
            }
        }
    }

    pub fn support(&self, itemset: &Itemset) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.count(itemset) as f64 / self.len() as f64
    }

    /// Counts every candidate by scanning transaction shards in parallel and
    /// summing the per-shard counters.
    pub fn count_by_scan(&self, candidates: &[Itemset]) -> Vec<usize> {
        let zero = || vec![0usize; candidates.len()];
        self.transactions
            .par_chunks(SCAN_SHARD)
            .map(|shard| {
                let mut counts = zero();
                for transaction in shard {
                    if transaction.is_empty() {
                        continue;
                    }
                    for (count, candidate) in counts.iter_mut().zip(candidates) {
                        if candidate.is_subset_of(transaction) {
                            *count += 1;
                        }
                    }
                }
                counts
            })
            .reduce(zero, |mut acc, shard| {
                for (a, b) in acc.iter_mut().zip(shard) {
                    *a += b;
                }
                acc
            })
    }
}
