//! Chain Index - B-tree indexes over blockchain transactions
//!
//! Indexes the transactions of a hash-chain ledger by four independent
//! dimensions so lookups never scan the chain:
//!
//! # Architecture
//!
//! ```text
//! Ledger (external)
//!     ↓ mined LedgerBlock
//! TransactionIndexer
//!     ├─ id index        BTree<String, TransactionRecord>
//!     ├─ time index      BTree<Timestamp, TransactionRecord>
//!     ├─ sender index    BTree<String, TransactionRecord>
//!     └─ receiver index  BTree<String, TransactionRecord>
//! ```
//!
//! Each index is a multi-valued [`BTree`]: one entry per distinct key, with
//! repeated keys (many transactions per sender, say) aggregated into that
//! entry's [`ValueSlot`].
//!
//! # Query Flow
//!
//! ```text
//! query_by_sender("Alice")
//!     ↓
//! sender index search → ValueSlot
//!     ↓
//! normalize → Vec<TransactionRecord> (indexing order)
//! ```

pub mod btree;
pub mod error;
pub mod indexing;
pub mod query;
pub mod types;

pub use btree::{BTree, Node, ValueSlot};
pub use error::{IndexError, Result};
pub use indexing::{IndexSize, IndexStats, TransactionIndexer};
pub use query::QueryResults;
pub use types::{IndexerConfig, LedgerBlock, Timestamp, Transaction, TransactionRecord};

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

/// Shared handle to one transaction indexer
///
/// All four indexes sit behind a single lock: an insert touches several
/// trees and readers must never see a block half indexed.
#[derive(Clone)]
pub struct ChainIndexer {
    indexer: Arc<RwLock<TransactionIndexer>>,
}

impl ChainIndexer {
    /// Create new chain indexer
    pub fn new(config: IndexerConfig) -> Result<Self> {
        info!("Initializing chain indexer");
        let indexer = TransactionIndexer::new(config)?;

        Ok(Self {
            indexer: Arc::new(RwLock::new(indexer)),
        })
    }

    /// Create chain indexer with the default configuration
    pub fn with_defaults() -> Result<Self> {
        Self::new(IndexerConfig::default())
    }

    /// Index a block mined by the ledger
    pub fn index_block(&self, block: &LedgerBlock) {
        self.indexer.write().index_block(block);
    }

    /// Index several blocks under one write lock
    pub fn index_blocks<'a>(&self, blocks: impl IntoIterator<Item = &'a LedgerBlock>) {
        let mut indexer = self.indexer.write();
        for block in blocks {
            indexer.index_block(block);
        }
    }

    /// Query transaction by id
    pub fn query_by_id(&self, transaction_id: &str) -> Result<TransactionRecord> {
        query::query_by_id(&self.indexer.read(), transaction_id)
    }

    /// Query transactions by sender
    pub fn query_by_sender(&self, sender: &str) -> Vec<TransactionRecord> {
        query::query_by_sender(&self.indexer.read(), sender)
    }

    /// Query transactions by receiver
    pub fn query_by_receiver(&self, receiver: &str) -> Vec<TransactionRecord> {
        query::query_by_receiver(&self.indexer.read(), receiver)
    }

    /// Query transactions in time range
    pub fn query_by_time_range(
        &self,
        start: impl Into<Timestamp>,
        end: impl Into<Timestamp>,
    ) -> Result<Vec<TransactionRecord>> {
        query::query_by_time_range(&self.indexer.read(), start, end)
    }

    /// Query transactions in time range, first page only
    pub fn query_page_by_time_range(
        &self,
        start: impl Into<Timestamp>,
        end: impl Into<Timestamp>,
    ) -> Result<QueryResults> {
        let indexer = self.indexer.read();
        let records = query::query_by_time_range(&indexer, start, end)?;
        Ok(query::first_page(&indexer, records))
    }

    /// Get address balance derived from indexed transactions
    pub fn balance_of(&self, address: &str) -> f64 {
        query::balance_of(&self.indexer.read(), address)
    }

    /// Get index statistics
    pub fn get_stats(&self) -> IndexStats {
        self.indexer.read().stats()
    }

    /// Export all indexes as JSON
    pub fn export_json(&self) -> Result<String> {
        debug!("Exporting index snapshot");
        self.indexer.read().snapshot_json()
    }

    /// Log the node layout of every index
    pub fn log_structure(&self) {
        self.indexer.read().log_structure();
    }

    /// Verify structural invariants of all indexes
    pub fn check_invariants(&self) -> Result<()> {
        self.indexer.read().check_invariants()
    }
}
