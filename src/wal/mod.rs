//! Write-Ahead Log (WAL) Module
//!
//! Provides durability by logging every mutation before it is applied.
//!
//! ## Responsibilities
//! - Encode mutations as command records
//! - Batch several records into one write (and one fsync)
//! - Replay the log into a fresh store on open
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Record 1                                │
//! │   *3\r\n                                │
//! │   $3\r\nset\r\n                         │
//! │   $3\r\nkey\r\n                         │
//! │   $5\r\nvalue\r\n                       │
//! ├─────────────────────────────────────────┤
//! │ Record 2                                │
//! │   *2\r\n$3\r\ndel\r\n$3\r\nkey\r\n      │
//! └─────────────────────────────────────────┘
//! ```
//! The log is never compacted; `FLUSHDB` is logged like any other command.

mod entry;
mod codec;
mod writer;
mod reader;
mod recovery;

pub use entry::{Mutation, Record, DEL, FLUSHDB, SET};
pub use codec::{decode_record, encode_record, encoded_len};
pub use writer::{LogSink, WalWriter};
pub use reader::{WalIterator, WalReader};
pub use recovery::{RecoveryResult, WalRecovery};
