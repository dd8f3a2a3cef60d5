use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{prefix_end, OrderedStore, WriteBatch, WriteOp};
use crate::error::{ProjectError, Result};

#[derive(Default)]
struct Inner {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    commits: usize,
    failing_commits: usize,
}

/// In-process store. Clones share the same entries, so a handle kept by a
/// test still sees what a project wrote after the project is closed.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make the next `count` commits fail without writing anything.
    pub fn fail_next_commits(&self, count: usize) {
        self.lock().failing_commits = count;
    }

    /// Number of successful commits.
    pub fn commit_count(&self) -> usize {
        self.lock().commits
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Copy of every entry, for comparing store contents.
    pub fn snapshot(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.lock().entries.clone()
    }

    /// Overwrite a raw entry outside any batch.
    pub fn poke(&self, key: &[u8], value: Vec<u8>) {
        self.lock().entries.insert(key.to_vec(), value);
    }
}

impl OrderedStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.lock().entries.get(key).cloned())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let inner = self.lock();
        let entries = match prefix_end(prefix) {
            Some(end) => inner
                .entries
                .range(prefix.to_vec()..end)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            None => inner
                .entries
                .range(prefix.to_vec()..)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        Ok(entries)
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<()> {
        let mut inner = self.lock();
        if inner.failing_commits > 0 {
            inner.failing_commits -= 1;
            log::warn!(target: "store", "memory store rejecting batch of {} writes", batch.len());
            return Err(ProjectError::FileAccess(io::Error::new(
                io::ErrorKind::Other,
                "simulated commit failure",
            )));
        }
        for (key, op) in batch {
            match op {
                WriteOp::Put(value) => {
                    inner.entries.insert(key, value);
                }
                WriteOp::Delete => {
                    inner.entries.remove(&key);
                }
            }
        }
        inner.commits += 1;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_commit_writes_nothing() {
        let mut store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put(b"k".to_vec(), b"v".to_vec());
        store.fail_next_commits(1);
        let err = store.commit(batch.clone()).unwrap_err();
        assert!(err.is_retryable());
        assert!(store.is_empty());

        store.commit(batch).unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn scan_is_prefix_bounded_and_ordered() {
        let mut store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        for key in [&b"track/b"[..], b"track/a", b"tracks", b"trace"] {
            batch.put(key.to_vec(), Vec::new());
        }
        store.commit(batch).unwrap();
        let keys: Vec<Vec<u8>> = store
            .scan_prefix(b"track/")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![b"track/a".to_vec(), b"track/b".to_vec()]);
    }
}
