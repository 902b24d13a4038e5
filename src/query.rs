//! Chain index query operations
//!
//! Index lookups return a [`ValueSlot`](crate::btree::ValueSlot) that holds
//! either one record or several. Every query here flattens that into an
//! ordered list so callers never branch on the slot shape.

use crate::error::{IndexError, Result};
use crate::indexing::TransactionIndexer;
use crate::types::{Timestamp, TransactionRecord};
use serde::Serialize;
use tracing::debug;

/// Query transaction by id
///
/// Ids are unique in a well-formed ledger; if one was indexed twice the
/// record indexed first is returned.
pub fn query_by_id(indexer: &TransactionIndexer, transaction_id: &str) -> Result<TransactionRecord> {
    debug!("Querying transaction: {}", transaction_id);
    indexer
        .lookup_id(transaction_id)
        .and_then(|slot| slot.first())
        .cloned()
        .ok_or_else(|| IndexError::TransactionNotFound(transaction_id.to_string()))
}

/// Query transactions sent by `sender`, in indexing order
pub fn query_by_sender(indexer: &TransactionIndexer, sender: &str) -> Vec<TransactionRecord> {
    debug!("Querying transactions for sender: {}", sender);
    indexer
        .lookup_sender(sender)
        .map(|slot| slot.as_slice().to_vec())
        .unwrap_or_default()
}

/// Query transactions received by `receiver`, in indexing order
pub fn query_by_receiver(indexer: &TransactionIndexer, receiver: &str) -> Vec<TransactionRecord> {
    debug!("Querying transactions for receiver: {}", receiver);
    indexer
        .lookup_receiver(receiver)
        .map(|slot| slot.as_slice().to_vec())
        .unwrap_or_default()
}

/// Query transactions with `start <= timestamp <= end`, oldest first
pub fn query_by_time_range(
    indexer: &TransactionIndexer,
    start: impl Into<Timestamp>,
    end: impl Into<Timestamp>,
) -> Result<Vec<TransactionRecord>> {
    let (start, end) = (start.into(), end.into());
    if start > end {
        return Err(IndexError::InvalidTimeRange {
            start: start.as_secs_f64(),
            end: end.as_secs_f64(),
        });
    }

    debug!("Querying transactions in range {} - {}", start, end);
    Ok(indexer
        .time_range(start, end)
        .into_iter()
        .flat_map(|(_, slot)| slot.iter().cloned())
        .collect())
}

/// Net amount for an address: everything received minus everything sent
pub fn balance_of(indexer: &TransactionIndexer, address: &str) -> f64 {
    let received: f64 = indexer
        .lookup_receiver(address)
        .map(|slot| slot.iter().map(|r| r.transaction.amount).sum())
        .unwrap_or(0.0);
    let sent: f64 = indexer
        .lookup_sender(address)
        .map(|slot| slot.iter().map(|r| r.transaction.amount).sum())
        .unwrap_or(0.0);

    received - sent
}

/// Query results with pagination
#[derive(Debug, Clone, Serialize)]
pub struct QueryResults {
    pub items: Vec<TransactionRecord>,
    pub total_count: usize,
    pub has_more: bool,
}

/// Keep the first `limit` records of a result list
pub fn paginate(mut records: Vec<TransactionRecord>, limit: usize) -> QueryResults {
    let total_count = records.len();
    let has_more = total_count > limit;
    records.truncate(limit);

    QueryResults {
        items: records,
        total_count,
        has_more,
    }
}

/// Paginate with the indexer's configured page size
pub fn first_page(indexer: &TransactionIndexer, records: Vec<TransactionRecord>) -> QueryResults {
    paginate(records, indexer.config().default_query_limit)
}
