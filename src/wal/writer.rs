//! WAL Writer
//!
//! Handles appending records to the WAL file.
//!
//! Records are encoded into an owned scratch buffer and written with a single
//! call per commit, so a batch of N records costs one write (and at most one
//! fsync) instead of N.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Write};
use std::path::Path;

use tracing::error;

use crate::config::WalSyncStrategy;
use crate::error::{KvError, Result};
use super::{encode_record, RecoveryResult, Record, WalRecovery};

/// Destination for committed log bytes
pub trait LogSink: Send + Sync {
    /// Write the whole buffer
    fn append(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Force previously appended bytes to stable storage
    fn sync(&mut self) -> io::Result<()>;

    /// Cut the log back to `len` bytes
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl LogSink for File {
    fn append(&mut self, buf: &[u8]) -> io::Result<()> {
        self.write_all(buf)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Appends records to the WAL
pub struct WalWriter {
    /// `None` once closed
    sink: Option<Box<dyn LogSink>>,

    sync_strategy: WalSyncStrategy,

    /// Encoded records of the batch in progress
    buf: Vec<u8>,

    /// Records appended since `begin_batch`
    batch_len: usize,

    /// Bytes committed so far
    size: u64,

    /// Set when a rollback failed; every later commit is refused
    poisoned: bool,
}

impl WalWriter {
    /// Open or create a WAL file, replaying it into `apply`.
    ///
    /// Every record is handed to `apply` in file order before this returns.
    /// A corrupt log fails the open; nothing is truncated or repaired.
    pub fn open<F>(
        path: &Path,
        sync_strategy: WalSyncStrategy,
        apply: F,
    ) -> Result<(Self, RecoveryResult)>
    where
        F: FnMut(&Record) -> Result<()>,
    {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;

        let mut recovery = WalRecovery::replay(BufReader::new(&file), apply)?;
        let size = file.metadata()?.len();
        recovery.bytes_replayed = size;

        Ok((Self::from_sink(Box::new(file), sync_strategy, size), recovery))
    }

    /// Wrap an already positioned sink holding `size` committed bytes
    pub fn from_sink(sink: Box<dyn LogSink>, sync_strategy: WalSyncStrategy, size: u64) -> Self {
        Self {
            sink: Some(sink),
            sync_strategy,
            buf: Vec::new(),
            batch_len: 0,
            size,
            poisoned: false,
        }
    }

    /// Start a new batch, discarding anything uncommitted
    pub fn begin_batch(&mut self) {
        self.buf.clear();
        self.batch_len = 0;
    }

    /// Encode one record into the current batch
    pub fn append_to_batch<A: AsRef<[u8]>>(&mut self, args: &[A]) {
        encode_record(&mut self.buf, args);
        self.batch_len += 1;
    }

    /// Write the batch in one call and sync it if the strategy asks for it.
    ///
    /// On failure the file is cut back to the last committed length so a torn
    /// record never reaches the next replay. If that cut fails too the writer
    /// is poisoned and refuses every later commit.
    pub fn commit_batch(&mut self) -> Result<()> {
        let sink = self.sink.as_mut().ok_or(KvError::Closed)?;
        if self.poisoned {
            self.begin_batch();
            return Err(KvError::WalPoisoned);
        }
        if self.buf.is_empty() {
            return Ok(());
        }

        let mut outcome = sink.append(&self.buf);
        if outcome.is_ok() && self.sync_strategy == WalSyncStrategy::EveryWrite {
            outcome = sink.sync();
        }

        if let Err(e) = outcome {
            if let Err(trunc_err) = sink.truncate(self.size) {
                error!(
                    "failed to roll back WAL to {} bytes after write error: {}; refusing further writes",
                    self.size, trunc_err
                );
                self.poisoned = true;
            }
            self.begin_batch();
            return Err(KvError::Io(e));
        }

        self.size += self.buf.len() as u64;
        self.begin_batch();
        Ok(())
    }

    /// Append and commit a single record
    pub fn write<A: AsRef<[u8]>>(&mut self, args: &[A]) -> Result<()> {
        self.begin_batch();
        self.append_to_batch(args);
        self.commit_batch()
    }

    /// Force committed data to disk regardless of strategy
    pub fn sync(&mut self) -> Result<()> {
        let sink = self.sink.as_mut().ok_or(KvError::Closed)?;
        sink.sync()?;
        Ok(())
    }

    /// Sync and release the file. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        self.begin_batch();
        match self.sink.take() {
            Some(mut sink) => {
                sink.sync()?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sink.is_none()
    }

    /// True once a failed rollback left the log tail in an unknown state
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Bytes committed to the log
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Records waiting in the current batch
    pub fn pending_records(&self) -> usize {
        self.batch_len
    }
}
