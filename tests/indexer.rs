//! End-to-end indexing of a small ledger

use chain_index::{ChainIndexer, IndexError, IndexerConfig, LedgerBlock, Transaction};
use std::thread;

fn demo_blocks() -> Vec<LedgerBlock> {
    let genesis = LedgerBlock {
        index: 0,
        transactions: vec![Transaction::transfer("genesis", "genesis", "genesis", 0.0, 1000.0)],
    };

    let first = [
        ("Alice", "Ricardo", 100.0),
        ("Ricardo", "Joao", 50.0),
        ("Joao", "Maria", 25.0),
        ("Maria", "Alice", 10.0),
        ("Alice", "Joao", 30.0),
        ("Ricardo", "Maria", 15.0),
    ];
    let mut transactions: Vec<Transaction> = first
        .iter()
        .enumerate()
        .map(|(i, (from, to, amount))| {
            Transaction::transfer(format!("a{i}"), *from, *to, *amount, 1001.0 + i as f64)
        })
        .collect();
    transactions.push(Transaction::reward("reward1", "DemoMiner1", 100.0, 1007.0));
    let block1 = LedgerBlock {
        index: 1,
        transactions,
    };

    let second = [("Joao", "Ricardo", 20.0), ("Maria", "Joao", 5.0), ("Alice", "Maria", 40.0)];
    let mut transactions: Vec<Transaction> = second
        .iter()
        .enumerate()
        .map(|(i, (from, to, amount))| {
            Transaction::transfer(format!("b{i}"), *from, *to, *amount, 2001.0 + i as f64)
        })
        .collect();
    transactions.push(Transaction::reward("reward2", "DemoMiner2", 100.0, 2004.0));
    let block2 = LedgerBlock {
        index: 2,
        transactions,
    };

    vec![genesis, block1, block2]
}

fn demo_indexer() -> ChainIndexer {
    let indexer = ChainIndexer::new(IndexerConfig {
        max_keys_per_node: 3,
        ..IndexerConfig::default()
    })
    .unwrap();
    indexer.index_blocks(&demo_blocks());
    indexer
}

#[test]
fn queries_every_dimension() {
    let indexer = demo_indexer();

    let genesis = indexer.query_by_id("genesis").unwrap();
    assert_eq!(genesis.block_index, 0);

    let b2 = indexer.query_by_id("b2").unwrap();
    assert_eq!(b2.block_index, 2);
    assert_eq!(b2.transaction.amount, 40.0);

    assert!(matches!(
        indexer.query_by_id("nope"),
        Err(IndexError::TransactionNotFound(_))
    ));

    let alice_sent: Vec<f64> = indexer
        .query_by_sender("Alice")
        .iter()
        .map(|r| r.transaction.amount)
        .collect();
    assert_eq!(alice_sent, vec![100.0, 30.0, 40.0]);

    let maria_received: Vec<u64> = indexer
        .query_by_receiver("Maria")
        .iter()
        .map(|r| r.block_index)
        .collect();
    assert_eq!(maria_received, vec![1, 1, 2]);

    let second_block: Vec<String> = indexer
        .query_by_time_range(2000.0, 3000.0)
        .unwrap()
        .into_iter()
        .map(|r| r.transaction.transaction_id)
        .collect();
    assert_eq!(second_block, vec!["b0", "b1", "b2", "reward2"]);

    indexer.check_invariants().unwrap();
}

#[test]
fn balances_and_stats() {
    let indexer = demo_indexer();

    assert_eq!(indexer.balance_of("Alice"), -160.0);
    assert_eq!(indexer.balance_of("DemoMiner1"), 100.0);

    let stats = indexer.get_stats();
    assert_eq!(stats.total_transactions, 12);
    assert_eq!(stats.blocks_indexed, 3);
    assert_eq!(stats.id_index.keys, 12);
    // rewards carry no sender
    assert_eq!(stats.sender_index.entries, 10);
    assert_eq!(stats.receiver_index.entries, 12);
}

#[test]
fn paginates_time_range() {
    let indexer = ChainIndexer::new(IndexerConfig {
        default_query_limit: 5,
        ..IndexerConfig::default()
    })
    .unwrap();
    indexer.index_blocks(&demo_blocks());

    let page = indexer.query_page_by_time_range(0.0, 10_000.0).unwrap();
    assert_eq!(page.items.len(), 5);
    assert_eq!(page.total_count, 12);
    assert!(page.has_more);
    assert_eq!(page.items[0].transaction.transaction_id, "genesis");
}

#[test]
fn export_round_trips_through_json() {
    let indexer = demo_indexer();
    let json: serde_json::Value = serde_json::from_str(&indexer.export_json().unwrap()).unwrap();

    assert_eq!(json["by_id"].as_array().map(Vec::len), Some(12));
    let senders: Vec<&str> = json["by_sender"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|entry| entry["key"].as_str())
        .collect();
    assert_eq!(senders, vec!["Alice", "Joao", "Maria", "Ricardo", "genesis"]);
}

#[test]
fn concurrent_readers_see_whole_blocks() {
    let indexer = ChainIndexer::with_defaults().unwrap();
    let blocks: Vec<LedgerBlock> = (0..50u64)
        .map(|n| LedgerBlock {
            index: n,
            transactions: (0..4)
                .map(|i| Transaction::transfer(format!("{n}-{i}"), "Alice", "Bob", 1.0, (n * 4 + i) as f64))
                .collect(),
        })
        .collect();

    let writer = {
        let indexer = indexer.clone();
        thread::spawn(move || {
            for block in &blocks {
                indexer.index_block(block);
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let indexer = indexer.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    let sent = indexer.query_by_sender("Alice").len();
                    assert_eq!(sent % 4, 0);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(indexer.query_by_receiver("Bob").len(), 200);
    indexer.check_invariants().unwrap();
}
