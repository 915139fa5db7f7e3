//! SHELF - Core Type Definitions
//! Defines fundamental types shared by the store, the snapshotter and the serializers.

use serde::{Deserialize, Serialize};

/// Key type for the storage engine.
/// Using Vec<u8> allows arbitrary binary keys.
pub type Key = Vec<u8>;

/// Value type for the storage engine.
pub type Value = Vec<u8>;

/// A single key-value pair as it appears in a snapshot and on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub key: Key,
    pub value: Value,
}

impl Entry {
    pub fn new(key: impl Into<Key>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Approximate footprint of the entry in bytes.
    pub fn size(&self) -> usize {
        self.key.len() + self.value.len()
    }
}

impl From<(Key, Value)> for Entry {
    fn from((key, value): (Key, Value)) -> Self {
        Self { key, value }
    }
}

/// One operation inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Key, value: Value },
    Delete { key: Key },
}

impl BatchOp {
    /// Create a PUT operation.
    pub fn put(key: impl Into<Key>, value: impl Into<Value>) -> Self {
        BatchOp::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a DELETE operation.
    pub fn delete(key: impl Into<Key>) -> Self {
        BatchOp::Delete { key: key.into() }
    }

    pub fn key(&self) -> &[u8] {
        match self {
            BatchOp::Put { key, .. } | BatchOp::Delete { key } => key,
        }
    }
}

impl From<Entry> for BatchOp {
    fn from(entry: Entry) -> Self {
        BatchOp::Put {
            key: entry.key,
            value: entry.value,
        }
    }
}
