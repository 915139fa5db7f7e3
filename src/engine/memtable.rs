//! SHELF - MemStore (In-Memory Sorted Map)
//! The default store placed behind a `Shelf`. Every key lives in memory;
//! durability comes entirely from the write-back engine.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::types::{BatchOp, Key, Value};

use super::store::{KvStore, StoreIter};

/// In-memory sorted key-value store backed by a BTreeMap.
/// Iteration yields keys in ascending byte order.
#[derive(Debug, Default)]
pub struct MemStore {
    entries: BTreeMap<Key, Value>,
}

impl MemStore {
    /// Create a new, empty MemStore.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a key-value pair. If the key already exists, the old value is replaced.
    pub fn insert(&mut self, key: Key, value: Value) {
        self.entries.insert(key, value);
    }

    pub fn lookup(&self, key: &[u8]) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Remove a key. Missing keys are not an error.
    pub fn remove(&mut self, key: &[u8]) {
        self.entries.remove(key);
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Value>> {
        Ok(self.lookup(key).cloned())
    }

    fn put(&mut self, key: Key, value: Value) -> Result<()> {
        self.insert(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.remove(key);
        Ok(())
    }

    fn batch(&mut self, ops: Vec<BatchOp>) -> Result<()> {
        for op in ops {
            match op {
                BatchOp::Put { key, value } => self.insert(key, value),
                BatchOp::Delete { key } => self.remove(&key),
            }
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }

    fn iter(&self) -> Result<StoreIter<'_>> {
        Ok(Box::new(
            self.entries.iter().map(|(k, v)| Ok((k.clone(), v.clone()))),
        ))
    }

    fn len(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}
