//! Hash container
//!
//! HashMap-based store; scans visit every key in arbitrary order.

use std::collections::HashMap;

use crate::config::StoreKind;
use crate::pattern::{self, ScanResult};
use super::Container;

#[derive(Debug, Clone, Default)]
pub struct HashStore {
    data: HashMap<Vec<u8>, Vec<u8>>,
}

impl HashStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        self.data.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}

impl Container for HashStore {
    const KIND: StoreKind = StoreKind::Map;

    fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.data.get(key).map(Vec::as_slice)
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) {
        match self.data.get_mut(key) {
            Some(existing) => {
                existing.clear();
                existing.extend_from_slice(value);
            }
            None => {
                self.data.insert(key.to_vec(), value.to_vec());
            }
        }
    }

    fn remove(&mut self, key: &[u8]) -> bool {
        self.data.remove(key).is_some()
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn scan(&self, pattern: &[u8], limit: Option<usize>, with_values: bool) -> ScanResult {
        pattern::scan(self.iter(), pattern, None, limit, with_values)
    }
}
