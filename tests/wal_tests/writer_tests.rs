//! Tests for WAL Writer
//!
//! These tests verify:
//! - Creating and appending to log files
//! - Batched commits (one write per batch)
//! - Rollback of a failed commit
//! - Refusing writes after a failed rollback
//! - Close semantics

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use kvbench::config::WalSyncStrategy;
use kvbench::error::KvError;
use kvbench::wal::{encode_record, LogSink, Record, WalReader, WalWriter};
use parking_lot::Mutex;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.db");
    (temp_dir, wal_path)
}

fn open_writer(path: &PathBuf) -> WalWriter {
    let (writer, _) = WalWriter::open(path, WalSyncStrategy::EveryWrite, |_| Ok(())).unwrap();
    writer
}

fn read_all(path: &PathBuf) -> Vec<Record> {
    WalReader::open(path)
        .unwrap()
        .records()
        .map(Result::unwrap)
        .collect()
}

/// Sink that records every call and can be told to fail
#[derive(Default)]
struct SinkState {
    data: Vec<u8>,
    appends: usize,
    syncs: usize,
    truncated_to: Option<u64>,
    fail_append: bool,
    fail_sync: bool,
    fail_truncate: bool,
}

#[derive(Clone, Default)]
struct MockSink(Arc<Mutex<SinkState>>);

impl LogSink for MockSink {
    fn append(&mut self, buf: &[u8]) -> io::Result<()> {
        let mut state = self.0.lock();
        if state.fail_append {
            // A short write reaches the file before the error
            let half = buf.len() / 2;
            state.data.extend_from_slice(&buf[..half]);
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        state.appends += 1;
        state.data.extend_from_slice(buf);
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        let mut state = self.0.lock();
        if state.fail_sync {
            return Err(io::Error::new(io::ErrorKind::Other, "sync failed"));
        }
        state.syncs += 1;
        Ok(())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        let mut state = self.0.lock();
        if state.fail_truncate {
            return Err(io::Error::new(io::ErrorKind::Other, "truncate failed"));
        }
        state.data.truncate(len as usize);
        state.truncated_to = Some(len);
        Ok(())
    }
}

// =============================================================================
// File Tests
// =============================================================================

#[test]
fn test_open_creates_file() {
    let (_temp, wal_path) = setup_temp_wal();
    let writer = open_writer(&wal_path);

    assert!(wal_path.exists());
    assert_eq!(writer.size(), 0);
    assert!(!writer.is_closed());
}

#[test]
fn test_write_single_record() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = open_writer(&wal_path);

    writer.write(&["set", "k", "v"]).unwrap();

    let expected = b"*3\r\n$3\r\nset\r\n$1\r\nk\r\n$1\r\nv\r\n";
    assert_eq!(fs::read(&wal_path).unwrap(), expected);
    assert_eq!(writer.size(), expected.len() as u64);
}

#[test]
fn test_reopen_appends() {
    let (_temp, wal_path) = setup_temp_wal();
    {
        let mut writer = open_writer(&wal_path);
        writer.write(&["set", "a", "1"]).unwrap();
        writer.close().unwrap();
    }

    let mut replayed = Vec::new();
    let (mut writer, recovery) = WalWriter::open(&wal_path, WalSyncStrategy::OsBuffered, |r| {
        replayed.push(r.clone());
        Ok(())
    })
    .unwrap();
    assert_eq!(recovery.records_applied, 1);
    assert_eq!(recovery.bytes_replayed, writer.size());
    assert_eq!(replayed, vec![Record::from_args(&["set", "a", "1"])]);

    writer.write(&["set", "b", "2"]).unwrap();
    writer.close().unwrap();

    let records = read_all(&wal_path);
    assert_eq!(records.len(), 2);
    assert_eq!(records[1], Record::from_args(&["set", "b", "2"]));
}

// =============================================================================
// Batch Tests
// =============================================================================

#[test]
fn test_batch_is_one_write_and_one_sync() {
    let sink = MockSink::default();
    let mut writer = WalWriter::from_sink(Box::new(sink.clone()), WalSyncStrategy::EveryWrite, 0);

    writer.begin_batch();
    for i in 0..100 {
        let key = format!("k{}", i);
        writer.append_to_batch(&["set", key.as_str(), "v"]);
    }
    assert_eq!(writer.pending_records(), 100);
    writer.commit_batch().unwrap();

    let state = sink.0.lock();
    assert_eq!(state.appends, 1);
    assert_eq!(state.syncs, 1);
    assert_eq!(writer.size(), state.data.len() as u64);
    assert_eq!(writer.pending_records(), 0);
}

#[test]
fn test_os_buffered_never_syncs_on_commit() {
    let sink = MockSink::default();
    let mut writer = WalWriter::from_sink(Box::new(sink.clone()), WalSyncStrategy::OsBuffered, 0);

    writer.write(&["set", "k", "v"]).unwrap();
    writer.write(&["del", "k"]).unwrap();

    let state = sink.0.lock();
    assert_eq!(state.appends, 2);
    assert_eq!(state.syncs, 0);
}

#[test]
fn test_empty_commit_writes_nothing() {
    let sink = MockSink::default();
    let mut writer = WalWriter::from_sink(Box::new(sink.clone()), WalSyncStrategy::EveryWrite, 0);

    writer.begin_batch();
    writer.commit_batch().unwrap();

    assert_eq!(sink.0.lock().appends, 0);
    assert_eq!(writer.size(), 0);
}

#[test]
fn test_begin_batch_discards_uncommitted() {
    let sink = MockSink::default();
    let mut writer = WalWriter::from_sink(Box::new(sink.clone()), WalSyncStrategy::EveryWrite, 0);

    writer.begin_batch();
    writer.append_to_batch(&["set", "lost", "x"]);
    writer.begin_batch();
    writer.append_to_batch(&["set", "kept", "y"]);
    writer.commit_batch().unwrap();

    let mut expected = Vec::new();
    encode_record(&mut expected, &["set", "kept", "y"]);
    assert_eq!(sink.0.lock().data, expected);
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_failed_append_rolls_back() {
    let sink = MockSink::default();
    let mut writer = WalWriter::from_sink(Box::new(sink.clone()), WalSyncStrategy::EveryWrite, 0);
    writer.write(&["set", "a", "1"]).unwrap();
    let committed = writer.size();

    sink.0.lock().fail_append = true;
    let result = writer.write(&["set", "b", "2"]);
    assert!(matches!(result, Err(KvError::Io(_))));

    let state = sink.0.lock();
    assert_eq!(state.truncated_to, Some(committed));
    assert_eq!(state.data.len() as u64, committed);
    assert_eq!(writer.size(), committed);
}

#[test]
fn test_failed_sync_rolls_back() {
    let sink = MockSink::default();
    let mut writer = WalWriter::from_sink(Box::new(sink.clone()), WalSyncStrategy::EveryWrite, 0);

    sink.0.lock().fail_sync = true;
    assert!(writer.write(&["set", "a", "1"]).is_err());

    let state = sink.0.lock();
    assert_eq!(state.truncated_to, Some(0));
    assert!(state.data.is_empty());
    assert_eq!(writer.size(), 0);
}

#[test]
fn test_failed_rollback_poisons_writer() {
    let sink = MockSink::default();
    let mut writer = WalWriter::from_sink(Box::new(sink.clone()), WalSyncStrategy::EveryWrite, 0);
    writer.write(&["set", "a", "1"]).unwrap();
    let committed = writer.size();

    {
        let mut state = sink.0.lock();
        state.fail_append = true;
        state.fail_truncate = true;
    }
    assert!(matches!(writer.write(&["set", "b", "2"]), Err(KvError::Io(_))));
    assert!(writer.is_poisoned());

    // The torn half record is still in the sink
    let torn_len = sink.0.lock().data.len();
    assert!(torn_len as u64 > committed);

    // The device recovers, but nothing may land after the torn bytes
    {
        let mut state = sink.0.lock();
        state.fail_append = false;
        state.fail_truncate = false;
    }
    assert!(matches!(writer.write(&["set", "c", "3"]), Err(KvError::WalPoisoned)));
    assert!(matches!(writer.write(&["set", "c", "3"]), Err(KvError::WalPoisoned)));

    let state = sink.0.lock();
    assert_eq!(state.data.len(), torn_len);
    assert_eq!(state.appends, 1);
    assert_eq!(writer.size(), committed);
    assert_eq!(writer.pending_records(), 0);
}

#[test]
fn test_successful_rollback_does_not_poison() {
    let sink = MockSink::default();
    let mut writer = WalWriter::from_sink(Box::new(sink.clone()), WalSyncStrategy::EveryWrite, 0);

    sink.0.lock().fail_append = true;
    assert!(writer.write(&["set", "a", "1"]).is_err());
    assert!(!writer.is_poisoned());

    sink.0.lock().fail_append = false;
    writer.write(&["set", "b", "2"]).unwrap();

    let mut expected = Vec::new();
    encode_record(&mut expected, &["set", "b", "2"]);
    assert_eq!(sink.0.lock().data, expected);
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_close_twice_is_harmless() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = open_writer(&wal_path);

    writer.close().unwrap();
    writer.close().unwrap();
    assert!(writer.is_closed());
}

#[test]
fn test_write_after_close_fails() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = open_writer(&wal_path);
    writer.close().unwrap();

    assert!(matches!(writer.write(&["set", "k", "v"]), Err(KvError::Closed)));
    assert!(matches!(writer.sync(), Err(KvError::Closed)));
}
