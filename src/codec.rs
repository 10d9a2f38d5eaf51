use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use anyhow::Result;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::info;

use crate::structs::{FrequentItemset, ItemId, Itemset};
use crate::table::FrequentItemsetTable;

const MAGIC: &[u8; 4] = b"FITB";
const VERSION: u32 = 2;

/// A frequent itemset table together with the labels of the items its ids refer to.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedTable {
    pub table: FrequentItemsetTable,
    pub vocabulary: Vec<String>,
}

/// Writes `table` and the item labels as little-endian binary:
///
/// ```text
/// magic "FITB" | version u32 | transactions u64
/// items u64 | per item: byte length u64 | utf-8 label
/// itemsets u64 | per itemset: length u64 | ids u32 * length | count u64
/// ```
pub fn save_table<I: Display>(
    path: &Path,
    table: &FrequentItemsetTable,
    vocabulary: &[I],
) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    write_table(&mut writer, table, vocabulary)?;
    writer.flush()?;
    info!(
        "Saved {} frequent itemsets over {} items to {}",
        table.len(),
        vocabulary.len(),
        path.display()
    );
    Ok(())
}

pub fn load_table(path: &Path) -> Result<SavedTable> {
    let mut reader = BufReader::new(File::open(path)?);
    let saved = read_table(&mut reader)?;
    info!(
        "Loaded {} frequent itemsets from {}",
        saved.table.len(),
        path.display()
    );
    Ok(saved)
}

pub fn write_table<I: Display>(
    writer: &mut impl Write,
    table: &FrequentItemsetTable,
    vocabulary: &[I],
) -> std::io::Result<()> {
    writer.write_all(MAGIC)?;
    writer.write_u32::<LittleEndian>(VERSION)?;
    writer.write_u64::<LittleEndian>(table.transaction_count() as u64)?;

    writer.write_u64::<LittleEndian>(vocabulary.len() as u64)?;
    for item in vocabulary {
        let label = item.to_string();
        writer.write_u64::<LittleEndian>(label.len() as u64)?;
        writer.write_all(label.as_bytes())?;
    }

    writer.write_u64::<LittleEndian>(table.len() as u64)?;
    for record in table.iter() {
        writer.write_u64::<LittleEndian>(record.len() as u64)?;
        for id in record.itemset.items() {
            if id.index() >= vocabulary.len() {
                return Err(invalid_data(format!(
                    "Item id {} has no label in a vocabulary of {}",
                    id.get(),
                    vocabulary.len()
                )));
            }
            writer.write_u32::<LittleEndian>(id.get())?;
        }
        writer.write_u64::<LittleEndian>(record.count as u64)?;
    }
    Ok(())
}

pub fn read_table(reader: &mut impl Read) -> std::io::Result<SavedTable> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(invalid_data("Not a frequent itemset table".to_string()));
    }
    let version = reader.read_u32::<LittleEndian>()?;
    if version != VERSION {
        return Err(invalid_data(format!(
            "Unsupported table version: expected {VERSION}, found {version}"
        )));
    }

    let transaction_count = reader.read_u64::<LittleEndian>()? as usize;

    let item_count = reader.read_u64::<LittleEndian>()?;
    let mut vocabulary = Vec::new();
    for _ in 0..item_count {
        let len = reader.read_u64::<LittleEndian>()?;
        let mut bytes = Vec::new();
        reader.by_ref().take(len).read_to_end(&mut bytes)?;
        if bytes.len() as u64 != len {
            return Err(ErrorKind::UnexpectedEof.into());
        }
        let label = String::from_utf8(bytes)
            .map_err(|e| invalid_data(format!("Item label is not utf-8: {e}")))?;
        vocabulary.push(label);
    }

    let itemset_count = reader.read_u64::<LittleEndian>()?;
    let mut records = Vec::new();
    for _ in 0..itemset_count {
        let len = reader.read_u64::<LittleEndian>()?;
        let mut ids = Vec::new();
        for _ in 0..len {
            let id = ItemId::new(reader.read_u32::<LittleEndian>()?);
            if id.index() >= vocabulary.len() {
                return Err(invalid_data(format!(
                    "Item id {} is outside the {} stored labels",
                    id.get(),
                    vocabulary.len()
                )));
            }
            ids.push(id);
        }
        let count = reader.read_u64::<LittleEndian>()? as usize;
        if count > transaction_count {
            return Err(invalid_data(format!(
                "Itemset count {count} exceeds transaction count {transaction_count}"
            )));
        }
        records.push(FrequentItemset::new(
            Itemset::new(ids),
            count,
            transaction_count,
        ));
    }

    Ok(SavedTable {
        table: FrequentItemsetTable::from_records(transaction_count, records),
        vocabulary,
    })
}

fn invalid_data(message: String) -> std::io::Error {
    std::io::Error::new(ErrorKind::InvalidData, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MiningConfig;
    use crate::miner::AprioriMiner;
    use crate::store::TransactionStore;
    use crate::synthetic;
    use tempfile::tempdir;

    fn mined() -> (TransactionStore<u32>, FrequentItemsetTable) {
        let store = TransactionStore::from_transactions(synthetic::generate(21, 250, 10, 4));
        let table = AprioriMiner::new(MiningConfig::new(0.05))
            .unwrap()
            .mine(&store)
            .unwrap()
            .found()
            .unwrap();
        (store, table)
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tables").join("frequent.bin");
        let (store, table) = mined();

        save_table(&path, &table, store.vocabulary()).unwrap();
        let loaded = load_table(&path).unwrap();
        assert_eq!(loaded.table, table);
        let expected: Vec<String> = store.vocabulary().iter().map(u32::to_string).collect();
        assert_eq!(loaded.vocabulary, expected);
    }

    #[test]
    fn test_labels_survive_the_round_trip() {
        let store = TransactionStore::from_transactions(vec![
            vec!["crème fraîche", "bread"],
            vec!["crème fraîche", "bread"],
            vec!["milk"],
        ]);
        let table = AprioriMiner::new(MiningConfig::new(0.5))
            .unwrap()
            .mine(&store)
            .unwrap()
            .found()
            .unwrap();
        let mut bytes = Vec::new();
        write_table(&mut bytes, &table, store.vocabulary()).unwrap();

        let saved = read_table(&mut &bytes[..]).unwrap();
        assert_eq!(saved.vocabulary, vec!["bread", "crème fraîche", "milk"]);
        let pair = table.iter().find(|r| r.len() == 2).unwrap();
        let labels: Vec<&str> = pair
            .itemset
            .items()
            .iter()
            .map(|id| saved.vocabulary[id.index()].as_str())
            .collect();
        assert_eq!(labels, vec!["bread", "crème fraîche"]);
    }

    #[test]
    fn test_ids_outside_vocabulary_rejected() {
        let (store, table) = mined();
        let mut bytes = Vec::new();
        let err = write_table(&mut bytes, &table, &store.vocabulary()[..1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn test_label_not_utf8() {
        let mut bytes = Vec::new();
        bytes.write_all(MAGIC).unwrap();
        bytes.write_u32::<LittleEndian>(VERSION).unwrap();
        bytes.write_u64::<LittleEndian>(3).unwrap();
        bytes.write_u64::<LittleEndian>(1).unwrap();
        bytes.write_u64::<LittleEndian>(2).unwrap();
        bytes.write_all(&[0xff, 0xfe]).unwrap();
        let err = read_table(&mut &bytes[..]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = Vec::new();
        bytes.write_all(b"NOPE").unwrap();
        bytes.write_u32::<LittleEndian>(VERSION).unwrap();
        let err = read_table(&mut &bytes[..]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn test_version_mismatch() {
        let mut bytes = Vec::new();
        bytes.write_all(MAGIC).unwrap();
        bytes.write_u32::<LittleEndian>(VERSION + 1).unwrap();
        let err = read_table(&mut &bytes[..]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn test_truncated_file() {
        let mut bytes = Vec::new();
        let (store, table) = mined();
        write_table(&mut bytes, &table, store.vocabulary()).unwrap();
        bytes.truncate(bytes.len() - 3);
        let err = read_table(&mut &bytes[..]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_missing_file_keeps_io_kind() {
        let dir = tempdir().unwrap();
        let err = load_table(&dir.path().join("absent.bin")).unwrap_err();
        assert_eq!(
            err.downcast_ref::<std::io::Error>().unwrap().kind(),
            ErrorKind::NotFound
        );
    }
}
