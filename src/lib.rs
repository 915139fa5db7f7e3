//! SHELF - Write-Back File Persistence for Key-Value Stores
//!
//! Keeps a key-value dataset in memory and materializes all of it to a
//! single file, coalescing bursts of mutations into infrequent, atomic
//! rewrites.
//!
//! ## Features
//! - **Debounced flushes**: mutations within one delay window share a single write
//! - **Single-flight**: at most one flush touches the file set at any time
//! - **Atomic replacement**: staging file + rename, with an optional backup of the previous version
//! - **Synchronous mode**: `delay = 0` makes every mutation durable before it returns
//! - **Pluggable serializers**: JSON (text), CRC-framed bincode, gzip wrapper
//! - **Pluggable stores**: any [`engine::store::KvStore`], in-memory `MemStore` by default
//! - **Metrics**: lock-free atomic counters for flushes, failures and coalescing
//!
//! ## Example
//! ```no_run
//! use shelf::{config::Config, engine::Shelf};
//!
//! let config = Config::new("./data/db.json").with_delay_ms(0);
//! let shelf = Shelf::open(config).unwrap();
//!
//! shelf.put("key", "value").unwrap();
//! assert_eq!(shelf.get("key").unwrap(), Some(b"value".to_vec()));
//! shelf.close().unwrap();
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod types;

pub use config::Config;
pub use engine::Shelf;
pub use error::{Result, ShelfError};
pub use types::{BatchOp, Entry, Key, Value};
