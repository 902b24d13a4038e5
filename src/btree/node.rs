//! B-tree node storage
//!
//! A node holds a bounded, ordered slice of the key space: sorted unique keys,
//! a parallel vector of value slots and, for internal nodes, one more child
//! than keys. Duplicate inserts never add a key; they grow the key's slot.

use serde::{Deserialize, Serialize};

/// Values stored under one key
///
/// The first insert of a key produces `Single`; every further insert of the
/// same key appends, turning the slot into `Multiple` in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueSlot<V> {
    Single(V),
    Multiple(Vec<V>),
}

impl<V> ValueSlot<V> {
    /// Append a value, promoting a single value into a list
    pub fn push(&mut self, value: V) {
        match self {
            ValueSlot::Multiple(values) => values.push(value),
            ValueSlot::Single(_) => {
                let previous = std::mem::replace(self, ValueSlot::Multiple(Vec::with_capacity(2)));
                if let (ValueSlot::Single(first), ValueSlot::Multiple(values)) = (previous, self) {
                    values.push(first);
                    values.push(value);
                }
            }
        }
    }

    /// All values in insertion order; a single value is a one-element slice
    pub fn as_slice(&self) -> &[V] {
        match self {
            ValueSlot::Single(value) => std::slice::from_ref(value),
            ValueSlot::Multiple(values) => values,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, V> {
        self.as_slice().iter()
    }

    /// Number of values held
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, ValueSlot::Multiple(_))
    }

    /// First value inserted under the key
    pub fn first(&self) -> Option<&V> {
        self.as_slice().first()
    }

    /// Normalize into an ordered list
    pub fn into_vec(self) -> Vec<V> {
        match self {
            ValueSlot::Single(value) => vec![value],
            ValueSlot::Multiple(values) => values,
        }
    }
}

impl<'a, V> IntoIterator for &'a ValueSlot<V> {
    type Item = &'a V;
    type IntoIter = std::slice::Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// B-tree node
#[derive(Debug, Clone)]
pub struct Node<K, V> {
    /// Whether this node has no children
    pub(crate) leaf: bool,
    /// Sorted, unique keys
    pub(crate) keys: Vec<K>,
    /// Value slot for each key
    pub(crate) values: Vec<ValueSlot<V>>,
    /// Child nodes (`keys.len() + 1` of them when internal)
    pub(crate) children: Vec<Node<K, V>>,
}

impl<K: Ord, V> Node<K, V> {
    /// Create an empty node
    pub fn new(leaf: bool) -> Self {
        Self {
            leaf,
            keys: Vec::new(),
            values: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub fn values(&self) -> &[ValueSlot<V>] {
        &self.values
    }

    pub fn children(&self) -> &[Node<K, V>] {
        &self.children
    }

    /// Check whether the node has reached capacity
    pub fn is_full(&self, max_keys: usize) -> bool {
        self.keys.len() >= max_keys
    }

    /// Insert a key/value pair, keeping keys sorted
    ///
    /// An existing key keeps its position and gains `value` in its slot.
    /// Never splits; the tree splits full nodes before inserting into them.
    pub fn insert_key_value(&mut self, key: K, value: V) {
        match self.keys.binary_search(&key) {
            Ok(index) => self.values[index].push(value),
            Err(index) => {
                self.keys.insert(index, key);
                self.values.insert(index, ValueSlot::Single(value));
            }
        }
    }

    /// Split around `max_keys / 2`
    ///
    /// Entries after the midpoint move to the returned right node together
    /// with the children after `mid + 1`; the midpoint entry is removed and
    /// returned for promotion into the parent.
    ///
    /// # Panics
    /// Panics if the node holds `max_keys / 2` keys or fewer; callers only
    /// split full nodes.
    pub fn split(&mut self, max_keys: usize) -> (Node<K, V>, K, ValueSlot<V>) {
        let mid = max_keys / 2;

        let mut right = Node::new(self.leaf);
        right.keys = self.keys.split_off(mid + 1);
        right.values = self.values.split_off(mid + 1);

        if !self.leaf {
            right.children = self.children.split_off(mid + 1);
        }

        let mid_key = self.keys.remove(mid);
        let mid_value = self.values.remove(mid);

        (right, mid_key, mid_value)
    }
}
