//! Transaction indexing across four B-trees
//!
//! Every transaction of an indexed block lands in up to four indexes:
//!
//! ```text
//! LedgerBlock
//!     ├─ transaction_id → id index        (String)
//!     ├─ timestamp      → time index      (Timestamp, range queries)
//!     ├─ sender         → sender index    (String, skipped for rewards)
//!     └─ receiver       → receiver index  (String)
//! ```
//!
//! Each index stores a full [`TransactionRecord`] so a lookup never needs a
//! second hop back into the ledger.

use crate::btree::{BTree, ValueSlot};
use crate::error::Result;
use crate::types::{IndexerConfig, LedgerBlock, Timestamp, Transaction, TransactionRecord};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Four-way transaction index
#[derive(Debug, Clone)]
pub struct TransactionIndexer {
    config: IndexerConfig,
    id_index: BTree<String, TransactionRecord>,
    time_index: BTree<Timestamp, TransactionRecord>,
    sender_index: BTree<String, TransactionRecord>,
    receiver_index: BTree<String, TransactionRecord>,
    blocks_indexed: u64,
}

impl TransactionIndexer {
    /// Create an empty indexer
    pub fn new(config: IndexerConfig) -> Result<Self> {
        config.validate()?;

        let indexer = Self {
            id_index: BTree::new(config.id_index_capacity())?,
            time_index: BTree::new(config.time_index_capacity())?,
            sender_index: BTree::new(config.sender_index_capacity())?,
            receiver_index: BTree::new(config.receiver_index_capacity())?,
            blocks_indexed: 0,
            config,
        };

        info!(
            "Transaction indexer initialized (max {} keys per node)",
            indexer.config.max_keys_per_node
        );
        Ok(indexer)
    }

    /// Create an indexer with the default configuration
    pub fn with_defaults() -> Result<Self> {
        Self::new(IndexerConfig::default())
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Index every transaction of a mined block
    pub fn index_block(&mut self, block: &LedgerBlock) {
        debug!(
            "Indexing block {} ({} transactions)",
            block.index,
            block.transactions.len()
        );

        for tx in &block.transactions {
            self.index_transaction(block.index, tx);
        }
        self.blocks_indexed += 1;
    }

    /// Index a single transaction owned by block `block_index`
    pub fn index_transaction(&mut self, block_index: u64, tx: &Transaction) {
        let record = TransactionRecord {
            block_index,
            transaction: tx.clone(),
        };

        self.id_index.insert(tx.transaction_id.clone(), record.clone());
        self.time_index.insert(tx.timestamp, record.clone());

        match tx.sender.as_deref() {
            Some(sender) if !sender.is_empty() => {
                self.sender_index.insert(sender.to_string(), record.clone());
            }
            Some(_) => warn!(
                "Transaction {} has an empty sender, not indexed by sender",
                tx.transaction_id
            ),
            None => {}
        }

        match tx.receiver.as_deref() {
            Some(receiver) if !receiver.is_empty() => {
                self.receiver_index.insert(receiver.to_string(), record);
            }
            _ => warn!(
                "Transaction {} has no receiver, not indexed by receiver",
                tx.transaction_id
            ),
        }
    }

    /// Values stored under a transaction id
    pub fn lookup_id(&self, transaction_id: &str) -> Option<&ValueSlot<TransactionRecord>> {
        self.id_index.search(transaction_id)
    }

    /// Values stored under a sender address
    pub fn lookup_sender(&self, sender: &str) -> Option<&ValueSlot<TransactionRecord>> {
        self.sender_index.search(sender)
    }

    /// Values stored under a receiver address
    pub fn lookup_receiver(&self, receiver: &str) -> Option<&ValueSlot<TransactionRecord>> {
        self.receiver_index.search(receiver)
    }

    /// Time index entries with `start <= timestamp <= end`
    pub fn time_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Vec<(&Timestamp, &ValueSlot<TransactionRecord>)> {
        self.time_index.range_search(&start, &end)
    }

    pub fn id_index(&self) -> &BTree<String, TransactionRecord> {
        &self.id_index
    }

    pub fn time_index(&self) -> &BTree<Timestamp, TransactionRecord> {
        &self.time_index
    }

    pub fn sender_index(&self) -> &BTree<String, TransactionRecord> {
        &self.sender_index
    }

    pub fn receiver_index(&self) -> &BTree<String, TransactionRecord> {
        &self.receiver_index
    }

    /// Verify the structure of all four indexes
    pub fn check_invariants(&self) -> Result<()> {
        self.id_index.check_invariants()?;
        self.time_index.check_invariants()?;
        self.sender_index.check_invariants()?;
        self.receiver_index.check_invariants()
    }

    /// Log the node layout of every index at debug level
    pub fn log_structure(&self) {
        debug!("id index:\n{}", self.id_index.dump());
        debug!("time index:\n{}", self.time_index.dump());
        debug!("sender index:\n{}", self.sender_index.dump());
        debug!("receiver index:\n{}", self.receiver_index.dump());
    }

    /// Get index statistics
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            id_index: IndexSize::of(&self.id_index),
            time_index: IndexSize::of(&self.time_index),
            sender_index: IndexSize::of(&self.sender_index),
            receiver_index: IndexSize::of(&self.receiver_index),
            total_transactions: self.id_index.value_count(),
            blocks_indexed: self.blocks_indexed,
        }
    }

    /// Capture every index's entries in key order
    pub fn snapshot(&self) -> IndexSnapshot<'_> {
        IndexSnapshot {
            by_id: export(&self.id_index),
            by_timestamp: export(&self.time_index),
            by_sender: export(&self.sender_index),
            by_receiver: export(&self.receiver_index),
        }
    }

    /// Snapshot serialized as JSON
    pub fn snapshot_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }
}

/// Size of one index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexSize {
    /// Distinct keys
    pub keys: usize,
    /// Stored records
    pub entries: usize,
    /// Tree levels
    pub height: usize,
}

impl IndexSize {
    fn of<K: Ord>(tree: &BTree<K, TransactionRecord>) -> Self {
        Self {
            keys: tree.len(),
            entries: tree.value_count(),
            height: tree.height(),
        }
    }
}

/// Index statistics
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub id_index: IndexSize,
    pub time_index: IndexSize,
    pub sender_index: IndexSize,
    pub receiver_index: IndexSize,
    pub total_transactions: usize,
    pub blocks_indexed: u64,
}

/// One exported index entry
#[derive(Debug, Serialize)]
pub struct SnapshotEntry<'a, K> {
    pub key: &'a K,
    pub records: &'a ValueSlot<TransactionRecord>,
}

/// Ordered contents of all four indexes
#[derive(Debug, Serialize)]
pub struct IndexSnapshot<'a> {
    pub by_id: Vec<SnapshotEntry<'a, String>>,
    pub by_timestamp: Vec<SnapshotEntry<'a, Timestamp>>,
    pub by_sender: Vec<SnapshotEntry<'a, String>>,
    pub by_receiver: Vec<SnapshotEntry<'a, String>>,
}

fn export<K: Ord>(tree: &BTree<K, TransactionRecord>) -> Vec<SnapshotEntry<'_, K>> {
    tree.get_all_items()
        .into_iter()
        .map(|(key, records)| SnapshotEntry { key, records })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(index: u64, transactions: Vec<Transaction>) -> LedgerBlock {
        LedgerBlock {
            index,
            transactions,
        }
    }

    fn small_indexer() -> TransactionIndexer {
        TransactionIndexer::new(IndexerConfig {
            max_keys_per_node: 3,
            ..IndexerConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let config = IndexerConfig {
            max_keys_per_node: 1,
            ..IndexerConfig::default()
        };
        assert!(TransactionIndexer::new(config).is_err());
    }

    #[test]
    fn indexes_all_four_dimensions() {
        let mut indexer = small_indexer();
        indexer.index_block(&block(
            1,
            vec![
                Transaction::transfer("t1", "Alice", "Ricardo", 100.0, 10.0),
                Transaction::reward("t2", "Miner1", 100.0, 11.0),
            ],
        ));

        let record = indexer.lookup_id("t1").and_then(ValueSlot::first).unwrap();
        assert_eq!(record.block_index, 1);
        assert_eq!(record.transaction.receiver.as_deref(), Some("Ricardo"));

        assert_eq!(indexer.lookup_sender("Alice").map(ValueSlot::len), Some(1));
        assert_eq!(indexer.lookup_receiver("Miner1").map(ValueSlot::len), Some(1));
        assert!(indexer.lookup_sender("Miner1").is_none());
        assert_eq!(indexer.time_range(Timestamp(10.0), Timestamp(11.0)).len(), 2);
    }

    #[test]
    fn reward_skips_sender_index() {
        let mut indexer = small_indexer();
        indexer.index_block(&block(2, vec![Transaction::reward("r", "Miner", 50.0, 1.0)]));

        let stats = indexer.stats();
        assert_eq!(stats.sender_index.entries, 0);
        assert_eq!(stats.receiver_index.entries, 1);
        assert_eq!(stats.id_index.entries, 1);
        assert_eq!(stats.time_index.entries, 1);
    }

    #[test]
    fn empty_addresses_are_not_indexed() {
        let mut indexer = small_indexer();
        let mut tx = Transaction::transfer("x", "", "", 1.0, 1.0);
        indexer.index_transaction(0, &tx);
        tx.receiver = None;
        tx.transaction_id = "y".to_string();
        indexer.index_transaction(0, &tx);

        let stats = indexer.stats();
        assert_eq!(stats.sender_index.keys, 0);
        assert_eq!(stats.receiver_index.keys, 0);
        assert_eq!(stats.id_index.keys, 2);
    }

    #[test]
    fn stats_count_duplicates() {
        let mut indexer = small_indexer();
        let transactions: Vec<Transaction> = (0..20)
            .map(|i| Transaction::transfer(format!("tx{i}"), "Alice", format!("r{}", i % 4), 1.0, i as f64))
            .collect();
        indexer.index_block(&block(1, transactions));

        let stats = indexer.stats();
        assert_eq!(stats.total_transactions, 20);
        assert_eq!(stats.sender_index.keys, 1);
        assert_eq!(stats.sender_index.entries, 20);
        assert_eq!(stats.receiver_index.keys, 4);
        assert_eq!(stats.blocks_indexed, 1);
        assert!(stats.id_index.height > 1);
        indexer.check_invariants().unwrap();
    }

    #[test]
    fn snapshot_is_ordered_json() {
        let mut indexer = small_indexer();
        indexer.index_block(&block(
            1,
            vec![
                Transaction::transfer("b", "Bob", "Alice", 5.0, 2.0),
                Transaction::transfer("a", "Alice", "Bob", 7.0, 1.0),
                Transaction::transfer("c", "Alice", "Carol", 9.0, 3.0),
            ],
        ));

        let snapshot = indexer.snapshot();
        let ids: Vec<&str> = snapshot.by_id.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(snapshot.by_sender[0].records.len(), 2);

        let json: serde_json::Value = serde_json::from_str(&indexer.snapshot_json().unwrap()).unwrap();
        assert_eq!(json["by_timestamp"][0]["key"], 1.0);
        assert!(json["by_sender"][0]["records"].is_array());
        assert!(json["by_sender"][1]["records"].is_object());
    }
}
