//! Storage Module
//!
//! The capability set every store backend exposes to the network layer.
//!
//! ## Backends
//! - `map`: hash-map engine with a command log
//! - `btree`: ordered-tree engine with a command log and pruned scans
//!
//! Engines wrapping an embedded database implement the same trait from
//! outside this crate.

use std::sync::Arc;

use tracing::info_span;

use crate::config::{Config, StoreKind};
use crate::engine::{BTreeEngine, MapEngine};
use crate::error::Result;
use crate::pattern::ScanResult;

/// Operations a store backend must support
///
/// Missing keys are not errors: `get` and `pget` return `None` entries and
/// `del` returns `false`.
pub trait Store: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &'static str;

    /// Release the backend; later calls fail
    fn close(&self) -> Result<()>;

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Set several pairs atomically with respect to the log.
    ///
    /// `keys` and `values` must have the same length.
    fn pset(&self, keys: &[&[u8]], values: &[&[u8]]) -> Result<()>;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// One entry per key, in the same order
    fn pget(&self, keys: &[&[u8]]) -> Result<Vec<Option<Vec<u8>>>>;

    /// Returns whether the key existed
    fn del(&self, key: &[u8]) -> Result<bool>;

    /// Keys matching a glob pattern, at most `limit` of them (`None` = all)
    fn keys(&self, pattern: &[u8], limit: Option<usize>, with_values: bool) -> Result<ScanResult>;

    /// Drop every key
    fn flushdb(&self) -> Result<()>;
}

/// Open the backend selected by `config`
pub fn open(config: &Config) -> Result<Arc<dyn Store>> {
    let path = config
        .log_path()
        .unwrap_or_else(|| crate::config::MEMORY_PATH.into());
    let span = info_span!("store", kind = %config.store);
    let strategy = config.wal_sync_strategy;

    let store: Arc<dyn Store> = match config.store {
        StoreKind::Map => Arc::new(MapEngine::open_with_span(&path, strategy, span)?),
        StoreKind::BTree => Arc::new(BTreeEngine::open_with_span(&path, strategy, span)?),
    };
    Ok(store)
}
