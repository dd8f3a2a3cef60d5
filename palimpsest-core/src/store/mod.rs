//! Durable ordered key/value storage.
//!
//! A project persists through an [`OrderedStore`]: byte keys map to byte
//! values, prefix scans return entries in ascending key order, and a
//! [`WriteBatch`] is committed all-or-nothing. Every command commits exactly
//! one batch holding the command record and the entity records it changed.

pub mod keys;
mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::collections::btree_map::{self, BTreeMap};

use palimpsest_types::Encode;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put(Vec<u8>),
    Delete,
}

/// Staged writes. A later operation on a key replaces an earlier one.
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    ops: BTreeMap<Vec<u8>, WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.insert(key, WriteOp::Put(value));
    }

    pub fn put_record<T: Encode>(&mut self, key: Vec<u8>, record: &T) {
        self.put(key, record.to_bytes());
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.ops.insert(key, WriteOp::Delete);
    }

    pub fn get(&self, key: &[u8]) -> Option<&WriteOp> {
        self.ops.get(key)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Operations in ascending key order.
    pub fn iter(&self) -> btree_map::Iter<'_, Vec<u8>, WriteOp> {
        self.ops.iter()
    }
}

impl IntoIterator for WriteBatch {
    type Item = (Vec<u8>, WriteOp);
    type IntoIter = btree_map::IntoIter<Vec<u8>, WriteOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

pub trait OrderedStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// All entries whose key starts with `prefix`, in ascending key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Apply every operation in `batch` or none of them.
    fn commit(&mut self, batch: WriteBatch) -> Result<()>;

    fn close(self: Box<Self>) -> Result<()>;
}

/// Smallest key greater than every key starting with `prefix`, if any.
pub(crate) fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_ops_supersede_earlier() {
        let mut batch = WriteBatch::new();
        batch.put(b"a".to_vec(), b"1".to_vec());
        batch.delete(b"a".to_vec());
        batch.put(b"b".to_vec(), b"2".to_vec());
        batch.put(b"b".to_vec(), b"3".to_vec());
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.get(b"a"), Some(&WriteOp::Delete));
        assert_eq!(batch.get(b"b"), Some(&WriteOp::Put(b"3".to_vec())));
    }

    #[test]
    fn prefix_end_carries() {
        assert_eq!(prefix_end(b"track/"), Some(b"track0".to_vec()));
        assert_eq!(prefix_end(&[1, 0xff]), Some(vec![2]));
        assert_eq!(prefix_end(&[0xff, 0xff]), None);
    }
}
