//! Multi-valued B-tree index
//!
//! An in-memory B-tree that keeps one entry per distinct key and aggregates
//! repeated inserts of a key into that entry's [`ValueSlot`]. It backs every
//! transaction index in this crate.
//!
//! # Insertion
//!
//! ```text
//! insert(k, v)
//!     ├─ root full? → new internal root, split old root (height + 1)
//!     └─ descend from root
//!          ├─ k present in node → append v to its slot
//!          ├─ leaf              → insert (k, v) in order
//!          └─ internal          → split target child if full, then recurse
//! ```
//!
//! Full nodes are split on the way down, so a node is never inserted into at
//! capacity and nothing has to propagate back up. The tree only grows at the
//! root, which keeps every leaf at the same depth. There is no deletion.

pub mod node;

pub use node::{Node, ValueSlot};

use crate::error::{IndexError, Result};
use std::borrow::Borrow;
use std::fmt::{self, Write as _};
use tracing::debug;

/// Node capacity used by [`BTree::default`]
pub const DEFAULT_MAX_KEYS: usize = 5;

/// Key/value pair borrowed from the tree
pub type Item<'a, K, V> = (&'a K, &'a ValueSlot<V>);

/// Multi-valued B-tree
#[derive(Debug, Clone)]
pub struct BTree<K, V> {
    root: Node<K, V>,
    max_keys: usize,
    min_keys: usize,
    /// Distinct keys stored
    key_count: usize,
    /// Values stored across all slots
    value_count: usize,
}

impl<K: Ord, V> Default for BTree<K, V> {
    fn default() -> Self {
        Self {
            root: Node::new(true),
            max_keys: DEFAULT_MAX_KEYS,
            min_keys: DEFAULT_MAX_KEYS / 2,
            key_count: 0,
            value_count: 0,
        }
    }
}

impl<K: Ord, V> BTree<K, V> {
    /// Create an empty tree holding at most `max_keys` keys per node
    pub fn new(max_keys: usize) -> Result<Self> {
        if max_keys < 2 {
            return Err(IndexError::InvalidCapacity(max_keys));
        }

        Ok(Self {
            root: Node::new(true),
            max_keys,
            min_keys: max_keys / 2,
            key_count: 0,
            value_count: 0,
        })
    }

    pub fn max_keys(&self) -> usize {
        self.max_keys
    }

    /// Lower occupancy bound. Informational: nothing is ever removed, so no
    /// rebalancing consumes it.
    pub fn min_keys(&self) -> usize {
        self.min_keys
    }

    pub fn root(&self) -> &Node<K, V> {
        &self.root
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.key_count
    }

    pub fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    /// Number of values across all keys
    pub fn value_count(&self) -> usize {
        self.value_count
    }

    /// Number of levels (1 for a lone root leaf)
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut node = &self.root;
        while !node.leaf {
            node = &node.children[0];
            height += 1;
        }
        height
    }

    /// Insert a key/value pair
    ///
    /// A key that is already present keeps its single entry; `value` is
    /// appended to that entry's slot.
    pub fn insert(&mut self, key: K, value: V) {
        if self.root.is_full(self.max_keys) {
            let old_root = std::mem::replace(&mut self.root, Node::new(false));
            self.root.children.push(old_root);
            Self::split_child(&mut self.root, 0, self.max_keys);
            debug!("B-tree root split, height now {}", self.height());
        }

        if Self::insert_non_full(&mut self.root, key, value, self.max_keys) {
            self.key_count += 1;
        }
        self.value_count += 1;
    }

    /// Insert into a node known to have room. Returns true if a new key was added.
    fn insert_non_full(node: &mut Node<K, V>, key: K, value: V, max_keys: usize) -> bool {
        let mut index = match node.keys.binary_search(&key) {
            Ok(index) => {
                node.values[index].push(value);
                return false;
            }
            Err(index) => index,
        };

        if node.leaf {
            node.keys.insert(index, key);
            node.values.insert(index, ValueSlot::Single(value));
            return true;
        }

        if node.children[index].is_full(max_keys) {
            Self::split_child(node, index, max_keys);

            // The promoted separator now sits at `index`.
            match key.cmp(&node.keys[index]) {
                std::cmp::Ordering::Equal => {
                    node.values[index].push(value);
                    return false;
                }
                std::cmp::Ordering::Greater => index += 1,
                std::cmp::Ordering::Less => {}
            }
        }

        Self::insert_non_full(&mut node.children[index], key, value, max_keys)
    }

    /// Split the full child at `index`, promoting its median into `parent`
    fn split_child(parent: &mut Node<K, V>, index: usize, max_keys: usize) {
        let (right, mid_key, mid_value) = parent.children[index].split(max_keys);

        parent.keys.insert(index, mid_key);
        parent.values.insert(index, mid_value);
        parent.children.insert(index + 1, right);
    }

    /// Look up the values stored under `key`
    pub fn search<Q>(&self, key: &Q) -> Option<&ValueSlot<V>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut node = &self.root;
        loop {
            match node.keys.binary_search_by(|probe| probe.borrow().cmp(key)) {
                Ok(index) => return Some(&node.values[index]),
                Err(_) if node.leaf => return None,
                Err(index) => node = &node.children[index],
            }
        }
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.search(key).is_some()
    }

    /// All entries with `min <= key <= max`, in ascending key order
    pub fn range_search<Q>(&self, min: &Q, max: &Q) -> Vec<Item<'_, K, V>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut results = Vec::new();
        if min <= max {
            Self::range_node(&self.root, min, max, &mut results);
        }
        results
    }

    fn range_node<'a, Q>(node: &'a Node<K, V>, min: &Q, max: &Q, results: &mut Vec<Item<'a, K, V>>)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        for (index, key) in node.keys.iter().enumerate() {
            let probe: &Q = key.borrow();

            // Everything left of `key` is smaller than it; skip subtrees below `min`.
            if !node.leaf && probe > min {
                Self::range_node(&node.children[index], min, max, results);
            }

            if probe > max {
                return;
            }

            if probe >= min {
                results.push((key, &node.values[index]));
            }
        }

        if let Some(last) = node.children.last() {
            Self::range_node(last, min, max, results);
        }
    }

    /// Every entry in ascending key order
    pub fn get_all_items(&self) -> Vec<Item<'_, K, V>> {
        let mut results = Vec::with_capacity(self.key_count);
        Self::inorder(&self.root, &mut results);
        results
    }

    fn inorder<'a>(node: &'a Node<K, V>, results: &mut Vec<Item<'a, K, V>>) {
        for (index, key) in node.keys.iter().enumerate() {
            if !node.leaf {
                Self::inorder(&node.children[index], results);
            }
            results.push((key, &node.values[index]));
        }

        if let Some(last) = node.children.last() {
            Self::inorder(last, results);
        }
    }

    /// Key slices of every node, grouped by level from the root down
    pub fn levels(&self) -> Vec<Vec<&[K]>> {
        let mut levels = Vec::new();
        let mut current = vec![&self.root];

        while !current.is_empty() {
            levels.push(current.iter().copied().map(Node::keys).collect());
            current = current
                .into_iter()
                .flat_map(|node| node.children.iter())
                .collect();
        }

        levels
    }

    /// Verify ordering, capacity, fan-out and balance of the whole tree
    pub fn check_invariants(&self) -> Result<()> {
        let mut leaf_depth = None;
        let mut keys = 0;
        let mut values = 0;
        self.check_node(&self.root, None, None, 0, &mut leaf_depth, &mut keys, &mut values)?;

        if keys != self.key_count || values != self.value_count {
            return Err(IndexError::CorruptTree(format!(
                "counted {} keys / {} values, tracked {} / {}",
                keys, values, self.key_count, self.value_count
            )));
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn check_node(
        &self,
        node: &Node<K, V>,
        lower: Option<&K>,
        upper: Option<&K>,
        depth: usize,
        leaf_depth: &mut Option<usize>,
        keys: &mut usize,
        values: &mut usize,
    ) -> Result<()> {
        let corrupt = |reason: &str| Err(IndexError::CorruptTree(format!("depth {}: {}", depth, reason)));

        if node.keys.len() > self.max_keys {
            return corrupt("node exceeds capacity");
        }
        if node.keys.len() != node.values.len() {
            return corrupt("keys and value slots differ in length");
        }
        if node.keys.windows(2).any(|pair| pair[0] >= pair[1]) {
            return corrupt("keys not strictly ascending");
        }
        if let (Some(lower), Some(first)) = (lower, node.keys.first()) {
            if first <= lower {
                return corrupt("key below parent separator");
            }
        }
        if let (Some(upper), Some(last)) = (upper, node.keys.last()) {
            if last >= upper {
                return corrupt("key above parent separator");
            }
        }
        if node.values.iter().any(|slot| slot.is_empty()) {
            return corrupt("empty value slot");
        }

        *keys += node.keys.len();
        *values += node.values.iter().map(ValueSlot::len).sum::<usize>();

        if node.leaf {
            if !node.children.is_empty() {
                return corrupt("leaf has children");
            }
            match *leaf_depth {
                None => *leaf_depth = Some(depth),
                Some(expected) if expected != depth => return corrupt("leaves at unequal depth"),
                Some(_) => {}
            }
            return Ok(());
        }

        if node.children.len() != node.keys.len() + 1 {
            return corrupt("internal node fan-out is not keys + 1");
        }

        for (index, child) in node.children.iter().enumerate() {
            let child_lower = if index == 0 { lower } else { node.keys.get(index - 1) };
            let child_upper = node.keys.get(index).or(upper);
            self.check_node(child, child_lower, child_upper, depth + 1, leaf_depth, keys, values)?;
        }
        Ok(())
    }
}

impl<K: Ord + fmt::Debug, V> BTree<K, V> {
    /// Render the per-level key layout, one line per level
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (depth, level) in self.levels().iter().enumerate() {
            let _ = write!(out, "{}level {}:", "  ".repeat(depth), depth);
            for keys in level {
                let _ = write!(out, " {:?}", keys);
            }
            out.push('\n');
        }
        out
    }
}
