use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense identifier of an item inside a [`TransactionStore`](crate::TransactionStore).
///
/// Ids are handed out in ascending item order, so comparing two ids compares
/// the items they stand for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub(crate) u32);

impl ItemId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

/// A set of distinct items kept in canonical ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Itemset(Vec<ItemId>);

impl Itemset {
    pub fn new(items: impl IntoIterator<Item = ItemId>) -> Self {
        let mut items: Vec<_> = items.into_iter().collect();
        items.sort_unstable();
        items.dedup();
        Self(items)
    }

    /// Caller guarantees `items` is strictly ascending.
    pub(crate) fn from_sorted(items: Vec<ItemId>) -> Self {
        debug_assert!(items.windows(2).all(|w| w[0] < w[1]));
        Self(items)
    }

    pub fn single(item: ItemId) -> Self {
        Self(vec![item])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn items(&self) -> &[ItemId] {
        &self.0
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.0.binary_search(&item).is_ok()
    }

    /// Merge walk over both sorted sequences.
    pub fn is_subset_of(&self, other: &Itemset) -> bool {
        if self.len() > other.len() {
            return false;
        }
        let mut rest = other.0.iter();
        'outer: for item in &self.0 {
            for candidate in rest.by_ref() {
                match candidate.cmp(item) {
                    std::cmp::Ordering::Less => continue,
                    std::cmp::Ordering::Equal => continue 'outer,
                    std::cmp::Ordering::Greater => return false,
                }
            }
            return false;
        }
        true
    }

    pub fn is_disjoint(&self, other: &Itemset) -> bool {
        !self.0.iter().any(|item| other.contains(*item))
    }

    pub fn union(&self, other: &Itemset) -> Itemset {
        Itemset::new(self.0.iter().chain(other.0.iter()).copied())
    }

    pub fn difference(&self, other: &Itemset) -> Itemset {
        Itemset::from_sorted(
            self.0
                .iter()
                .copied()
                .filter(|item| !other.contains(*item))
                .collect(),
        )
    }

    /// The itemset with the member at `position` removed.
    pub fn without(&self, position: usize) -> Itemset {
        let mut items = self.0.clone();
        items.remove(position);
        Itemset(items)
    }

    /// Apriori-gen join: two k-itemsets sharing their first k-1 members and
    /// ordered by their last member produce the (k+1)-itemset of both.
    pub(crate) fn join(&self, other: &Itemset) -> Option<Itemset> {
        let k = self.len();
        if k == 0 || k != other.len() {
            return None;
        }
        if self.0[..k - 1] != other.0[..k - 1] || self.0[k - 1] >= other.0[k - 1] {
            return None;
        }
        let mut items = Vec::with_capacity(k + 1);
        items.extend_from_slice(&self.0);
        items.push(other.0[k - 1]);
        Some(Itemset(items))
    }

    /// Splits by bitmask: members whose bit is set go left, the rest go right.
    pub(crate) fn split(&self, mask: u64) -> (Itemset, Itemset) {
        let (left, right): (Vec<_>, Vec<_>) = self
            .0
            .iter()
            .enumerate()
            .partition(|&(i, _)| mask & (1u64 << i) != 0);
        (
            Itemset(left.into_iter().map(|(_, item)| *item).collect()),
            Itemset(right.into_iter().map(|(_, item)| *item).collect()),
        )
    }
}

impl FromIterator<ItemId> for Itemset {
    fn from_iter<T: IntoIterator<Item = ItemId>>(iter: T) -> Self {
        Itemset::new(iter)
    }
}

impl fmt::Display for Itemset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item.0)?;
        }
        write!(f, "}}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequentItemset {
    pub itemset: Itemset,
    /// Number of transactions containing the itemset.
    pub count: usize,
    pub support: f64,
}

impl FrequentItemset {
    pub fn new(itemset: Itemset, count: usize, transaction_count: usize) -> Self {
        let support = if transaction_count == 0 {
            0.0
        } else {
            count as f64 / transaction_count as f64
        };
        Self {
            itemset,
            count,
            support,
        }
    }

    pub fn len(&self) -> usize {
        self.itemset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.itemset.is_empty()
    }
}

/// `antecedent => consequent` with its strength measures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationRule {
    pub antecedent: Itemset,
    pub consequent: Itemset,
    pub antecedent_support: f64,
    pub consequent_support: f64,
    /// Support of `antecedent ∪ consequent`.
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
    pub leverage: f64,
    /// `f64::INFINITY` when confidence is 1.
    pub conviction: f64,
}

/// Result of a run that may legitimately find nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Found(T),
    NoResult(NoResultReason),
}

impl<T> Outcome<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Outcome::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Outcome::Found(value) => Some(value),
            Outcome::NoResult(_) => None,
        }
    }

    pub fn as_ref(&self) -> Outcome<&T> {
        match self {
            Outcome::Found(value) => Outcome::Found(value),
            Outcome::NoResult(reason) => Outcome::NoResult(*reason),
        }
    }

    pub fn no_result_reason(&self) -> Option<NoResultReason> {
        match self {
            Outcome::Found(_) => None,
            Outcome::NoResult(reason) => Some(*reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoResultReason {
    EmptyStore,
    TooFewTransactions,
    NoFrequentItemsets,
    NoRules,
}

impl fmt::Display for NoResultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            NoResultReason::EmptyStore => "the transaction store is empty",
            NoResultReason::TooFewTransactions => "at least two transactions are needed to mine",
            NoResultReason::NoFrequentItemsets => "no itemset reaches the minimum support",
            NoResultReason::NoRules => "no association rule meets the threshold",
        };
        f.write_str(message)
    }
}
