//! # kvbench
//!
//! A RESP-speaking key-value server with:
//! - An append-only command log replayed at startup
//! - Hash-map and ordered-tree stores behind one `Store` trait
//! - Glob pattern scans, pruned to a key range on the ordered store
//! - Pipelined `GET`/`SET` runs batched into one store call
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │               (thread per connection)                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Request Batcher                             │
//! │          (GET run → pget, SET run → pset)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     KvEngine                                 │
//! │            (Single Writer / Multi Reader)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │  Container  │
//!   │  (Append)   │          │ (map/btree) │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod memtable;
pub mod pattern;
pub mod storage;
pub mod engine;
pub mod protocol;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::Config;
pub use engine::{BTreeEngine, KvEngine, MapEngine};
pub use storage::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of kvbench
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
