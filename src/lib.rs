mod codec;
mod config;
mod dataloader;
mod error;
mod miner;
mod report;
mod rules;
mod store;
mod structs;
mod synthetic;
mod table;
pub use config::{Config, CountingStrategy, Metric, MiningConfig, RuleConfig};
pub use dataloader::TransactionLoader;
pub use error::{ConfigError, MineError};
pub use miner::{AprioriMiner, CancellationToken};
pub use rules::{RuleGenerator, RuleTable, rank};
pub use store::TransactionStore;
pub use structs::{AssociationRule, FrequentItemset, ItemId, Itemset, NoResultReason, Outcome};
pub use table::FrequentItemsetTable;

pub mod io {
    pub use crate::codec::{SavedTable, load_table, read_table, save_table, write_table};
    pub use crate::report::{
        ItemsetRow, RuleRow, describe, itemset_row, itemset_rows, print_itemsets,
        print_outcome_summary, print_rules, rule_row, rule_rows, save_json,
    };
    pub use crate::synthetic::{generate, write_basket_file};
}
