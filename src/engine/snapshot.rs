//! SHELF - Snapshotter
//! Drains the underlying store into one ordered, immutable list of
//! entries. A snapshot is created and discarded inside a single flush.

use crate::error::{Result, ShelfError};
use crate::types::Entry;

use super::store::KvStore;

/// The full contents of a store captured at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<Entry>,
}

impl Snapshot {
    /// Walk the whole key space of `store`.
    ///
    /// The iterator is consumed to the end and dropped on both paths. The
    /// first iteration error aborts the capture; partial results are discarded.
    pub fn capture<S: KvStore + ?Sized>(store: &S) -> Result<Self> {
        let iter = store
            .iter()
            .map_err(|e| ShelfError::Iteration(e.to_string()))?;

        let mut entries = Vec::with_capacity(store.len().unwrap_or(0));
        for item in iter {
            let (key, value) = item.map_err(|e| ShelfError::Iteration(e.to_string()))?;
            entries.push(Entry { key, value });
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total key + value bytes held by the snapshot.
    pub fn payload_size(&self) -> usize {
        self.entries.iter().map(Entry::size).sum()
    }
}
