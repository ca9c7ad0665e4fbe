//! MemTable Module
//!
//! In-memory containers that hold the live key space of an engine.
//!
//! ## Responsibilities
//! - Point reads and upserts
//! - Deletes that report whether the key existed
//! - Pattern scans in the container's natural order
//!
//! ## Data Structure Choice
//! - `HashStore`: `HashMap`, O(1) point operations, scans visit every key
//! - `OrderedStore`: `BTreeMap`, lexicographic order, scans pruned by the
//!   pattern's literal prefix
//!
//! Containers are not synchronized; the engine wraps them in its lock.

mod hashed;
mod table;

pub use hashed::HashStore;
pub use table::OrderedStore;

use crate::config::StoreKind;
use crate::pattern::ScanResult;

/// Operations an engine needs from its container
pub trait Container: Default + Send + Sync + 'static {
    /// Which store variant this container backs
    const KIND: StoreKind;

    fn get(&self, key: &[u8]) -> Option<&[u8]>;

    fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace
    fn insert(&mut self, key: &[u8], value: &[u8]);

    /// Remove a key, returning whether it was present
    fn remove(&mut self, key: &[u8]) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collect keys matching a glob pattern
    fn scan(&self, pattern: &[u8], limit: Option<usize>, with_values: bool) -> ScanResult;
}
