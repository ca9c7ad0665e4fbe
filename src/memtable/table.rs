//! Ordered container
//!
//! BTreeMap-based store with ascending iteration from any pivot key.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::config::StoreKind;
use crate::pattern::{self, ScanResult};
use super::Container;

/// Sorted key → value mapping
#[derive(Debug, Clone, Default)]
pub struct OrderedStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,

    /// Approximate payload size (keys + values) in bytes
    size: usize,
}

impl OrderedStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace, returning the previous value
    pub fn replace(&mut self, key: Vec<u8>, value: Vec<u8>) -> Option<Vec<u8>> {
        let added = key.len() + value.len();
        let key_len = key.len();
        let old = self.data.insert(key, value);
        self.size += added;
        if let Some(old) = &old {
            self.size -= key_len + old.len();
        }
        old
    }

    /// Remove a key, returning its value
    pub fn delete(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        let old = self.data.remove(key)?;
        self.size -= key.len() + old.len();
        Some(old)
    }

    /// Entries with key `>= pivot`, ascending
    pub fn ascend_from<'a>(
        &'a self,
        pivot: &[u8],
    ) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        self.data
            .range::<[u8], _>((Bound::Included(pivot), Bound::Unbounded))
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// All entries, ascending
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        self.data.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Approximate size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.size = 0;
    }
}

impl Container for OrderedStore {
    const KIND: StoreKind = StoreKind::BTree;

    fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.data.get(key).map(Vec::as_slice)
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) {
        self.replace(key.to_vec(), value.to_vec());
    }

    fn remove(&mut self, key: &[u8]) -> bool {
        self.delete(key).is_some()
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn scan(&self, pattern: &[u8], limit: Option<usize>, with_values: bool) -> ScanResult {
        let bounds = pattern::bounds(pattern);
        if !bounds.prunes() {
            return pattern::scan(self.iter(), pattern, None, limit, with_values);
        }
        pattern::scan(
            self.ascend_from(&bounds.min),
            pattern,
            bounds.max.as_deref(),
            limit,
            with_values,
        )
    }
}
