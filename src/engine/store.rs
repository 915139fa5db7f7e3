//! SHELF - Underlying Key-Value Store Boundary
//! The engine treats the store it fronts as an opaque mutable dataset:
//! it forwards mutations to it, snapshots it, and repopulates it on open.

use crate::error::Result;
use crate::types::{BatchOp, Key, Value};

/// Lazy, finite, fallible sequence of every key-value pair in a store.
/// Dropping it releases whatever resources the store attached to it.
pub type StoreIter<'a> = Box<dyn Iterator<Item = Result<(Key, Value)>> + 'a>;

/// A key-value store that can be placed behind a [`Shelf`](super::Shelf).
pub trait KvStore: Send + 'static {
    /// Called once before the persisted dataset is replayed into the store.
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once after the final flush.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Value>>;

    fn put(&mut self, key: Key, value: Value) -> Result<()>;

    fn delete(&mut self, key: &[u8]) -> Result<()>;

    /// Apply every operation, in order, as one unit.
    fn batch(&mut self, ops: Vec<BatchOp>) -> Result<()>;

    fn clear(&mut self) -> Result<()>;

    /// Start a fresh pass over the whole key space.
    fn iter(&self) -> Result<StoreIter<'_>>;

    /// Number of live keys, if cheaply known.
    fn len(&self) -> Option<usize> {
        None
    }
}
