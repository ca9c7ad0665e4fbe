//! WAL Reader
//!
//! Handles reading records from the WAL file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{KvError, Result};
use super::{decode_record, Record};

/// Reads records from a WAL stream
pub struct WalReader<R> {
    reader: R,

    /// Records decoded so far (used to locate corruption)
    records_read: u64,
}

impl WalReader<BufReader<File>> {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> WalReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            records_read: 0,
        }
    }

    /// Read the next record from the WAL
    ///
    /// `Ok(None)` marks a clean end of log.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        match decode_record(&mut self.reader) {
            Ok(Some(record)) => {
                self.records_read += 1;
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(KvError::WalCorruption(msg)) => Err(KvError::WalCorruption(format!(
                "record {}: {}",
                self.records_read + 1,
                msg
            ))),
            Err(e) => Err(e),
        }
    }

    /// Number of records decoded so far
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Iterate over all records; stops after the first error
    pub fn records(self) -> WalIterator<R> {
        WalIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over WAL records
pub struct WalIterator<R> {
    reader: WalReader<R>,
    done: bool,
}

impl<R: BufRead> Iterator for WalIterator<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
