//! SHELF - Flush State Machine
//! Debounces mutations into flushes and guarantees that at most one
//! flush (snapshot -> serialize -> durable write) runs at any time.
//!
//! ## Sequencing
//! Every mutation gets a sequence number after it has been applied to the
//! store. A flush records the highest sequence number (`target`) *before*
//! it snapshots, so on success every mutation `<= target` is on disk and
//! `flushed` advances to `target`. A requester is satisfied once
//! `flushed >= seq`; until then it either waits for the in-flight flush or
//! runs the next one itself.
//!
//! ## Modes
//! - `delay == 0`: the mutating thread drives the flush and returns its outcome.
//! - `delay > 0`: a background flusher thread waits out the deadline, then
//!   flushes. Failures are logged, counted and kept in `last_error`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::config::Config;
use crate::error::{Result, ShelfError};

use super::metrics::FlushMetrics;
use super::snapshot::Snapshot;
use super::store::KvStore;
use super::writer::{DurableWriter, FileWriter};

/// Where the store is in its flush cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushState {
    /// Everything recorded so far has been handed to a flush.
    Idle,
    /// A flush is scheduled for `deadline`; further requests are absorbed.
    Queued { deadline: Instant },
    /// A flush is running. `dirty` is set when a mutation lands meanwhile.
    Flushing { dirty: bool },
}

impl FlushState {
    pub fn is_flushing(&self) -> bool {
        matches!(self, FlushState::Flushing { .. })
    }
}

/// Result of recording one mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    /// Sequence number of the mutation.
    pub seq: u64,
    /// A queued or in-flight flush already covers this request.
    pub absorbed: bool,
}

/// The state shared by every thread touching one store. Lives behind one mutex.
#[derive(Debug)]
pub struct FlushCore {
    pub state: FlushState,
    /// Sequence number of the latest recorded mutation.
    pub mutations: u64,
    /// Highest sequence number persisted by a successful flush.
    pub flushed: u64,
    pub last_error: Option<String>,
    /// No further mutations are accepted.
    pub closed: bool,
    /// The background flusher must exit.
    pub shutdown: bool,
}

impl FlushCore {
    pub fn new() -> Self {
        Self {
            state: FlushState::Idle,
            mutations: 0,
            flushed: 0,
            last_error: None,
            closed: false,
            shutdown: false,
        }
    }

    /// Record a mutation and schedule (or piggyback on) a flush for it.
    pub fn request(&mut self, delay: Duration) -> Request {
        self.mutations += 1;
        let absorbed = match self.state {
            FlushState::Idle => {
                self.state = FlushState::Queued {
                    deadline: Instant::now() + delay,
                };
                false
            }
            FlushState::Queued { .. } => true,
            FlushState::Flushing { .. } => {
                self.state = FlushState::Flushing { dirty: true };
                true
            }
        };
        Request {
            seq: self.mutations,
            absorbed,
        }
    }

    /// Move into `Flushing`, cancelling any pending deadline. Returns the flush target.
    pub fn begin(&mut self) -> u64 {
        debug_assert!(!self.state.is_flushing(), "flush already in flight");
        self.state = FlushState::Flushing { dirty: false };
        self.mutations
    }

    /// Leave `Flushing`. A mutation that raced the flush chains another cycle.
    pub fn finish(&mut self, target: u64, succeeded: bool, delay: Duration) {
        if succeeded {
            self.flushed = self.flushed.max(target);
        }
        self.state = match self.state {
            FlushState::Flushing { dirty: true } => FlushState::Queued {
                deadline: Instant::now() + delay,
            },
            _ => FlushState::Idle,
        };
    }

    pub fn is_covered(&self, seq: u64) -> bool {
        self.flushed >= seq
    }

    /// Mutations recorded but not yet persisted.
    pub fn unflushed(&self) -> u64 {
        self.mutations.saturating_sub(self.flushed)
    }
}

impl Default for FlushCore {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a flush needs, shared between callers and the flusher thread.
///
/// Lock order is `store` before `core`. A flush releases `core` before it
/// takes `store`.
pub struct WriteBack<S: KvStore> {
    pub(crate) store: Mutex<S>,
    pub(crate) core: Mutex<FlushCore>,
    /// Signalled on every state change (request, flush completion, shutdown).
    pub(crate) changed: Condvar,
    pub(crate) writer: Box<dyn FileWriter>,
    pub(crate) config: Config,
    pub(crate) metrics: FlushMetrics,
}

impl<S: KvStore> WriteBack<S> {
    pub fn new(config: Config, store: S) -> Self {
        let writer = DurableWriter::from_config(&config);
        Self::with_writer(config, store, Box::new(writer))
    }

    pub fn with_writer(config: Config, store: S, writer: Box<dyn FileWriter>) -> Self {
        Self {
            store: Mutex::new(store),
            core: Mutex::new(FlushCore::new()),
            changed: Condvar::new(),
            writer,
            config,
            metrics: FlushMetrics::new(),
        }
    }

    /// Apply `op` to the store and record it as one mutation.
    ///
    /// The closed check, the store operation and the sequence number are
    /// taken under both locks, so a mutation is either rejected with
    /// `Closed` or covered by the final flush of `close`. A failing `op`
    /// records nothing.
    pub fn apply<F>(&self, op: F) -> Result<()>
    where
        F: FnOnce(&mut S) -> Result<()>,
    {
        let mut store = self.store.lock();
        let core = self.core.lock();
        if core.closed {
            return Err(ShelfError::Closed);
        }
        op(&mut *store)?;
        drop(store);
        self.schedule(core)
    }

    /// Entry point of the state machine.
    ///
    /// `force == false` records one mutation that has already been applied
    /// to the store. `force == true` flushes everything recorded so far,
    /// skipping any pending debounce delay.
    pub fn request_flush(&self, force: bool) -> Result<()> {
        let core = self.core.lock();
        if core.closed {
            return Err(ShelfError::Closed);
        }
        if force {
            let seq = core.mutations;
            return self.flush_through(core, seq);
        }
        self.schedule(core)
    }

    fn schedule(&self, mut core: MutexGuard<'_, FlushCore>) -> Result<()> {
        let request = core.request(self.config.delay);
        self.metrics.record_mutation();
        if request.absorbed {
            self.metrics.record_coalesced();
        }

        if self.config.is_synchronous() {
            self.flush_through(core, request.seq)
        } else {
            if !request.absorbed {
                self.changed.notify_all();
            }
            Ok(())
        }
    }

    /// Block until mutation `seq` is persisted, running flushes on this thread as needed.
    ///
    /// Returns the outcome of the last flush this thread ran, or `Ok` when
    /// another thread's flush covered `seq`.
    pub(crate) fn flush_through(&self, mut core: MutexGuard<'_, FlushCore>, seq: u64) -> Result<()> {
        loop {
            if core.is_covered(seq) {
                return Ok(());
            }
            if core.state.is_flushing() {
                self.changed.wait(&mut core);
                continue;
            }

            let target = core.begin();
            let outcome = MutexGuard::unlocked(&mut core, || self.run_flush());
            self.complete(&mut core, target, &outcome);
            return outcome;
        }
    }

    /// Snapshot, serialize and write. Runs without the core lock held.
    fn run_flush(&self) -> Result<()> {
        let snapshot = {
            let store = self.store.lock();
            Snapshot::capture(&*store)?
        };
        let bytes = self.config.serializer.serialize(snapshot.entries())?;
        self.writer.write(&bytes)?;
        self.metrics.record_flush(bytes.len());

        log::debug!(
            "Flushed {} entries ({} bytes) to {:?}",
            snapshot.len(),
            bytes.len(),
            self.writer.location()
        );
        Ok(())
    }

    fn complete(&self, core: &mut FlushCore, target: u64, outcome: &Result<()>) {
        match outcome {
            Ok(()) => core.last_error = None,
            Err(err) => {
                self.metrics.record_failure();
                core.last_error = Some(err.to_string());
            }
        }
        core.finish(target, outcome.is_ok(), self.config.delay);
        self.changed.notify_all();
    }

    /// Ask the background flusher to exit at its next wake-up.
    pub(crate) fn shutdown(&self) {
        self.core.lock().shutdown = true;
        self.changed.notify_all();
    }
}

/// Body of the background flusher thread used when `delay > 0`.
pub(crate) fn flusher_loop<S: KvStore>(engine: Arc<WriteBack<S>>) {
    let mut core = engine.core.lock();
    while !core.shutdown {
        let state = core.state;
        match state {
            FlushState::Queued { deadline } if Instant::now() >= deadline => {
                let target = core.begin();
                let outcome = MutexGuard::unlocked(&mut core, || engine.run_flush());
                engine.complete(&mut core, target, &outcome);
                if let Err(err) = outcome {
                    log::error!(
                        "Background flush of {:?} failed; retrying on next mutation: {}",
                        engine.writer.location(),
                        err
                    );
                }
            }
            FlushState::Queued { deadline } => {
                engine.changed.wait_until(&mut core, deadline);
            }
            _ => engine.changed.wait(&mut core),
        }
    }
    log::trace!("Flusher for {:?} stopped", engine.writer.location());
}
