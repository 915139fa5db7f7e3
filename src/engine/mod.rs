//! SHELF - Storage Engine Module
//! Top-level module for the write-back engine: lifecycle, mutation hooks
//! and the components a flush is made of.

pub mod flush;
pub mod memtable;
pub mod metrics;
pub mod paths;
pub mod serializer;
pub mod snapshot;
pub mod store;
pub mod writer;

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{Result, ShelfError};
use crate::types::{BatchOp, Entry, Key, Value};

use self::flush::{flusher_loop, WriteBack};
use self::memtable::MemStore;
use self::metrics::FlushMetrics;
use self::store::KvStore;
use self::writer::{write_file, DurableWriter, FileWriter};

/// A key-value store whose full contents are written back to one file.
///
/// Mutations go to the underlying store first, then schedule a flush.
/// With a zero delay every mutation returns only once its data is on
/// disk; otherwise bursts of mutations are coalesced into one background
/// flush, and `flush_now`/`close` force persistence.
///
/// All methods take `&self`; share a `Shelf` across threads with `Arc`.
pub struct Shelf<S: KvStore = MemStore> {
    engine: Arc<WriteBack<S>>,
    flusher: Mutex<Option<JoinHandle<()>>>,
}

impl Shelf<MemStore> {
    /// Open a store backed by an in-memory `MemStore`.
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with(config, MemStore::new())
    }
}

impl<S: KvStore> Shelf<S> {
    /// Open `store`, load the persisted dataset into it, and start write-back.
    ///
    /// Nothing is flushed before this returns successfully.
    pub fn open_with(config: Config, store: S) -> Result<Self> {
        let writer = DurableWriter::from_config(&config);
        Self::open_with_writer(config, store, writer)
    }

    /// Like `open_with`, but flushes go through `writer` instead of the
    /// `DurableWriter` built from `config`.
    pub fn open_with_writer<W>(config: Config, mut store: S, writer: W) -> Result<Self>
    where
        W: FileWriter + 'static,
    {
        config.validate()?;
        store.open()?;

        let entries = load_or_create(&config)?;
        let loaded = entries.len();
        store.batch(entries.into_iter().map(BatchOp::from).collect())?;

        let engine = Arc::new(WriteBack::with_writer(config, store, Box::new(writer)));
        engine.metrics.record_load(loaded);

        let flusher = if engine.config.is_synchronous() {
            None
        } else {
            let background = engine.clone();
            Some(
                thread::Builder::new()
                    .name("shelf-flusher".into())
                    .spawn(move || flusher_loop(background))?,
            )
        };

        log::info!(
            "Shelf opened at {:?} ({} entries loaded, delay {:?})",
            engine.config.location,
            loaded,
            engine.config.delay
        );

        Ok(Self {
            engine,
            flusher: Mutex::new(flusher),
        })
    }

    /// Insert or replace a key.
    pub fn put(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let (key, value) = (key.into(), value.into());
        self.mutate(move |store| store.put(key, value))
    }

    /// Remove a key. Removing a missing key is not an error.
    pub fn delete(&self, key: impl AsRef<[u8]>) -> Result<()> {
        self.mutate(|store| store.delete(key.as_ref()))
    }

    /// Apply several operations as one mutation.
    pub fn batch(&self, ops: Vec<BatchOp>) -> Result<()> {
        self.mutate(move |store| store.batch(ops))
    }

    /// Remove every key.
    pub fn clear(&self) -> Result<()> {
        self.mutate(|store| store.clear())
    }

    /// Run `op` against the store; only if it succeeds, request a flush.
    fn mutate<F>(&self, op: F) -> Result<()>
    where
        F: FnOnce(&mut S) -> Result<()>,
    {
        self.engine.apply(op)
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<Value>> {
        self.ensure_open()?;
        self.engine.store.lock().get(key.as_ref())
    }

    /// All key-value pairs in store iteration order.
    pub fn scan(&self) -> Result<Vec<(Key, Value)>> {
        self.ensure_open()?;
        let store = self.engine.store.lock();
        let iter = store.iter()?;
        iter.collect()
    }

    /// Number of live keys.
    pub fn len(&self) -> Result<usize> {
        self.ensure_open()?;
        let store = self.engine.store.lock();
        match store.len() {
            Some(n) => Ok(n),
            None => Ok(store.iter()?.count()),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Persist every mutation recorded so far, skipping the debounce delay.
    ///
    /// Waits for an in-flight flush instead of starting a second one, then
    /// flushes again only if mutations arrived meanwhile. Fails with
    /// `Closed` after `close`, even if the final flush failed.
    pub fn flush_now(&self) -> Result<()> {
        self.engine.request_flush(true)
    }

    /// Final flush, then stop the flusher and close the underlying store.
    ///
    /// The store is closed even when the flush fails; the flush error takes
    /// precedence over a close error.
    pub fn close(&self) -> Result<()> {
        let flushed = {
            let mut core = self.engine.core.lock();
            if core.closed {
                return Err(ShelfError::Closed);
            }
            core.closed = true;
            let seq = core.mutations;
            self.engine.flush_through(core, seq)
        };

        self.stop_flusher();
        let closed = self.engine.store.lock().close();

        match &flushed {
            Ok(()) => log::info!("Shelf at {:?} closed", self.engine.config.location),
            Err(err) => log::error!(
                "Final flush of {:?} failed: {}",
                self.engine.config.location,
                err
            ),
        }
        flushed.and(closed)
    }

    pub fn is_closed(&self) -> bool {
        self.engine.core.lock().closed
    }

    /// Message of the most recent failed flush, cleared by the next success.
    pub fn last_flush_error(&self) -> Option<String> {
        self.engine.core.lock().last_error.clone()
    }

    /// Mutations not yet covered by a successful flush.
    pub fn pending_mutations(&self) -> u64 {
        self.engine.core.lock().unflushed()
    }

    pub fn metrics(&self) -> &FlushMetrics {
        &self.engine.metrics
    }

    pub fn config(&self) -> &Config {
        &self.engine.config
    }

    pub fn location(&self) -> &Path {
        &self.engine.config.location
    }

    fn ensure_open(&self) -> Result<()> {
        if self.engine.core.lock().closed {
            Err(ShelfError::Closed)
        } else {
            Ok(())
        }
    }

    fn stop_flusher(&self) {
        let handle = self.flusher.lock().take();
        if let Some(handle) = handle {
            self.engine.shutdown();
            if handle.join().is_err() {
                log::error!("Flusher thread for {:?} panicked", self.location());
            }
        }
    }
}

impl<S: KvStore> Drop for Shelf<S> {
    fn drop(&mut self) {
        self.stop_flusher();
        let core = self.engine.core.lock();
        if !core.closed && core.unflushed() > 0 {
            log::warn!(
                "Shelf at {:?} dropped with {} unflushed mutations; call close() to persist them",
                self.engine.config.location,
                core.unflushed()
            );
        }
    }
}

/// Read the primary file, or create it with an empty dataset.
fn load_or_create(config: &Config) -> Result<Vec<Entry>> {
    let serializer = &config.serializer;

    let bytes = match fs::read(&config.location) {
        Ok(bytes) => {
            if config.error_if_exists {
                return Err(ShelfError::FileExists(config.location.clone()));
            }
            bytes
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            if !config.create_if_missing {
                return Err(ShelfError::FileMissing(config.location.clone()));
            }
            config.ensure_parent_dir()?;
            let empty = serializer.serialize(&[])?;
            write_file(&config.location, &empty, config.sync_writes)?;
            log::debug!("Created empty store file at {:?}", config.location);
            empty
        }
        Err(err) => return Err(err.into()),
    };

    if !serializer.uses_buffers() {
        std::str::from_utf8(&bytes)
            .map_err(|e| ShelfError::Corruption(format!("file is not UTF-8 text: {}", e)))?;
    }
    serializer.deserialize(&bytes)
}
