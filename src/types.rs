//! Chain index types

use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Transaction timestamp in seconds since the Unix epoch.
///
/// Wraps an `f64` so it can be used as a B-tree key: ordering is the IEEE-754
/// total order, which makes every value (including NaN) comparable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub f64);

impl Timestamp {
    /// Seconds since the Unix epoch
    pub fn as_secs_f64(self) -> f64 {
        self.0
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f64> for Timestamp {
    fn from(secs: f64) -> Self {
        Timestamp(secs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction as produced by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction identifier
    pub transaction_id: String,
    /// Sender address (`None` for mining rewards)
    pub sender: Option<String>,
    /// Receiver address
    pub receiver: Option<String>,
    /// Transferred amount
    pub amount: f64,
    /// Creation time
    pub timestamp: Timestamp,
}

impl Transaction {
    /// Create a transfer between two addresses
    pub fn transfer(
        transaction_id: impl Into<String>,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: f64,
        timestamp: impl Into<Timestamp>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            sender: Some(sender.into()),
            receiver: Some(receiver.into()),
            amount,
            timestamp: timestamp.into(),
        }
    }

    /// Create a mining reward paid to `receiver`
    pub fn reward(
        transaction_id: impl Into<String>,
        receiver: impl Into<String>,
        amount: f64,
        timestamp: impl Into<Timestamp>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            sender: None,
            receiver: Some(receiver.into()),
            amount,
            timestamp: timestamp.into(),
        }
    }
}

/// Value stored in every index: a transaction and the block that holds it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Index of the owning block in the chain
    pub block_index: u64,
    /// Indexed transaction
    pub transaction: Transaction,
}

/// Mined block handed over by the ledger for indexing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerBlock {
    /// Block position in the chain (genesis = 0)
    pub index: u64,
    /// Transactions in this block
    pub transactions: Vec<Transaction>,
}

/// Indexer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Node capacity shared by all indexes
    pub max_keys_per_node: usize,
    /// Capacity override for the transaction id index
    pub id_index_max_keys: Option<usize>,
    /// Capacity override for the timestamp index
    pub time_index_max_keys: Option<usize>,
    /// Capacity override for the sender index
    pub sender_index_max_keys: Option<usize>,
    /// Capacity override for the receiver index
    pub receiver_index_max_keys: Option<usize>,
    /// Page size used when paginating query results
    pub default_query_limit: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            max_keys_per_node: 10,
            id_index_max_keys: None,
            time_index_max_keys: None,
            sender_index_max_keys: None,
            receiver_index_max_keys: None,
            default_query_limit: 1000,
        }
    }
}

impl IndexerConfig {
    /// Parse configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: IndexerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check capacities and limits
    pub fn validate(&self) -> Result<()> {
        for capacity in [
            self.id_index_capacity(),
            self.time_index_capacity(),
            self.sender_index_capacity(),
            self.receiver_index_capacity(),
        ] {
            if capacity < 2 {
                return Err(IndexError::InvalidCapacity(capacity));
            }
        }
        if self.default_query_limit == 0 {
            return Err(IndexError::InvalidConfig(
                "default_query_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn id_index_capacity(&self) -> usize {
        self.id_index_max_keys.unwrap_or(self.max_keys_per_node)
    }

    pub fn time_index_capacity(&self) -> usize {
        self.time_index_max_keys.unwrap_or(self.max_keys_per_node)
    }

    pub fn sender_index_capacity(&self) -> usize {
        self.sender_index_max_keys.unwrap_or(self.max_keys_per_node)
    }

    pub fn receiver_index_capacity(&self) -> usize {
        self.receiver_index_max_keys.unwrap_or(self.max_keys_per_node)
    }
}
