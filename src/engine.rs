//! Engine Module
//!
//! The key-value engine that ties a container to its command log.
//!
//! ## Responsibilities
//! - Replay the WAL into a fresh container on open
//! - Log every mutation before applying it
//! - Serve point reads, batched reads and pattern scans

use std::path::Path;

use parking_lot::RwLock;
use tracing::{debug, info, info_span, Span};

use crate::config::{is_memory_path, WalSyncStrategy};
use crate::error::{KvError, Result};
use crate::memtable::{Container, HashStore, OrderedStore};
use crate::pattern::ScanResult;
use crate::storage::Store;
use crate::wal::{Mutation, Record, RecoveryResult, WalWriter, DEL, FLUSHDB, SET};

/// Engine backed by a hash map
pub type MapEngine = KvEngine<HashStore>;

/// Engine backed by an ordered tree
pub type BTreeEngine = KvEngine<OrderedStore>;

/// A container plus an optional command log
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// One `RwLock` guards both the container and the WAL:
/// - **Writes** (set/pset/del/flushdb/close) hold the write lock across the
///   log write and the container mutation, so log order always equals
///   mutation order.
/// - **Reads** (get/pget/keys) share the read lock and never touch the log.
pub struct KvEngine<C: Container> {
    inner: RwLock<EngineInner<C>>,

    /// Logging context supplied by the owner
    span: Span,

    /// Replay statistics from open
    recovery: Option<RecoveryResult>,
}

struct EngineInner<C> {
    container: C,

    /// `None` when persistence is disabled
    wal: Option<WalWriter>,

    closed: bool,
}

impl<C> EngineInner<C> {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(KvError::Closed)
        } else {
            Ok(())
        }
    }
}

impl<C: Container> KvEngine<C> {
    /// Open an engine logging to `path` (`:memory:` disables the log)
    pub fn open(path: impl AsRef<Path>, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let span = info_span!("store", kind = %C::KIND);
        Self::open_with_span(path.as_ref(), sync_strategy, span)
    }

    /// Open an engine that emits its events inside `span`.
    ///
    /// The WAL is replayed to completion before this returns; a corrupt log
    /// fails the open.
    pub fn open_with_span(path: &Path, sync_strategy: WalSyncStrategy, span: Span) -> Result<Self> {
        if is_memory_path(path) {
            span.in_scope(|| info!("persistence disabled"));
            return Ok(Self::build(C::default(), None, span, None));
        }

        let mut container = C::default();
        let (wal, recovery) = span.in_scope(|| {
            WalWriter::open(path, sync_strategy, |record| {
                apply_record(&mut container, record);
                Ok(())
            })
        })?;

        span.in_scope(|| {
            if recovery.records_applied > 0 {
                info!(
                    "loaded {} commands in {:?}",
                    recovery.records_applied, recovery.elapsed
                );
            }
            debug!(path = %path.display(), keys = container.len(), "command log opened");
        });

        Ok(Self::build(container, Some(wal), span, Some(recovery)))
    }

    /// An engine with no command log
    pub fn in_memory() -> Self {
        let span = info_span!("store", kind = %C::KIND);
        Self::build(C::default(), None, span, None)
    }

    /// An empty engine writing through an existing WAL.
    ///
    /// Nothing is replayed; use this with custom `LogSink`s.
    pub fn with_wal(wal: WalWriter, span: Span) -> Self {
        Self::build(C::default(), Some(wal), span, None)
    }

    fn build(container: C, wal: Option<WalWriter>, span: Span, recovery: Option<RecoveryResult>) -> Self {
        Self {
            inner: RwLock::new(EngineInner {
                container,
                wal,
                closed: false,
            }),
            span,
            recovery,
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.inner.read().container.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether mutations are being logged
    pub fn is_persistent(&self) -> bool {
        self.inner.read().wal.is_some()
    }

    /// Bytes committed to the WAL, if any
    pub fn wal_size(&self) -> Option<u64> {
        self.inner.read().wal.as_ref().map(WalWriter::size)
    }

    /// What replay did at open time
    pub fn recovery(&self) -> Option<&RecoveryResult> {
        self.recovery.as_ref()
    }
}

/// Apply one replayed record. Unknown or short records are ignored.
fn apply_record<C: Container>(container: &mut C, record: &Record) {
    match record.mutation() {
        Some(Mutation::Set { key, value }) => container.insert(key, value),
        Some(Mutation::Del { key }) => {
            container.remove(key);
        }
        Some(Mutation::FlushDb) => *container = C::default(),
        None => {}
    }
}

impl<C: Container> Store for KvEngine<C> {
    fn name(&self) -> &'static str {
        C::KIND.as_str()
    }

    fn close(&self) -> Result<()> {
        let mut inner = self.inner.write();
        inner.closed = true;
        if let Some(wal) = inner.wal.as_mut() {
            wal.close()?;
            self.span.in_scope(|| debug!("command log closed"));
        }
        Ok(())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        inner.ensure_open()?;
        if let Some(wal) = inner.wal.as_mut() {
            wal.write(&[SET, key, value])?;
        }
        inner.container.insert(key, value);
        Ok(())
    }

    fn pset(&self, keys: &[&[u8]], values: &[&[u8]]) -> Result<()> {
        if keys.len() != values.len() {
            return Err(KvError::InvalidArgument(format!(
                "pset got {} keys but {} values",
                keys.len(),
                values.len()
            )));
        }

        let mut guard = self.inner.write();
        let inner = &mut *guard;
        inner.ensure_open()?;
        if let Some(wal) = inner.wal.as_mut() {
            wal.begin_batch();
            for (&key, &value) in keys.iter().zip(values) {
                wal.append_to_batch(&[SET, key, value]);
            }
            wal.commit_batch()?;
        }
        for (&key, &value) in keys.iter().zip(values) {
            inner.container.insert(key, value);
        }
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.read();
        inner.ensure_open()?;
        Ok(inner.container.get(key).map(<[u8]>::to_vec))
    }

    fn pget(&self, keys: &[&[u8]]) -> Result<Vec<Option<Vec<u8>>>> {
        let inner = self.inner.read();
        inner.ensure_open()?;
        Ok(keys
            .iter()
            .map(|key| inner.container.get(key).map(<[u8]>::to_vec))
            .collect())
    }

    fn del(&self, key: &[u8]) -> Result<bool> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        inner.ensure_open()?;
        if !inner.container.contains_key(key) {
            return Ok(false);
        }
        if let Some(wal) = inner.wal.as_mut() {
            wal.write(&[DEL, key])?;
        }
        inner.container.remove(key);
        Ok(true)
    }

    fn keys(&self, pattern: &[u8], limit: Option<usize>, with_values: bool) -> Result<ScanResult> {
        let inner = self.inner.read();
        inner.ensure_open()?;
        Ok(inner.container.scan(pattern, limit, with_values))
    }

    fn flushdb(&self) -> Result<()> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        inner.ensure_open()?;
        if let Some(wal) = inner.wal.as_mut() {
            wal.write(&[FLUSHDB])?;
        }
        inner.container = C::default();
        Ok(())
    }
}
