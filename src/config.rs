//! Configuration for kvbench
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::KvError;

/// Path sentinel that disables the command log entirely.
pub const MEMORY_PATH: &str = ":memory:";

/// Main configuration for a kvbench instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Which in-memory container backs the store
    pub store: StoreKind,

    /// Command log file. Empty means `<store>.db`, `:memory:` means no log.
    pub path: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: whether each commit is forced to disk
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every commit (safest, slowest)
    EveryWrite,

    /// Leave flushing to the OS page cache
    OsBuffered,
}

impl WalSyncStrategy {
    /// Map the server's `--fsync` flag onto a strategy
    pub fn from_fsync(fsync: bool) -> Self {
        if fsync {
            WalSyncStrategy::EveryWrite
        } else {
            WalSyncStrategy::OsBuffered
        }
    }
}

/// The self-contained store variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Hash map, unordered iteration
    Map,

    /// Ordered tree, lexicographic iteration and pruned pattern scans
    BTree,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Map => "map",
            StoreKind::BTree => "btree",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreKind {
    type Err = KvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "map" => Ok(StoreKind::Map),
            "btree" => Ok(StoreKind::BTree),
            other => Err(KvError::Config(format!("unknown store type: {}", other))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreKind::Map,
            path: PathBuf::new(),
            wal_sync_strategy: WalSyncStrategy::EveryWrite,
            listen_addr: "127.0.0.1:6380".to_string(),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// The log path after applying the per-store default.
    ///
    /// Returns `None` for the in-memory sentinel.
    pub fn log_path(&self) -> Option<PathBuf> {
        if is_memory_path(&self.path) {
            None
        } else if self.path.as_os_str().is_empty() {
            Some(PathBuf::from(format!("{}.db", self.store)))
        } else {
            Some(self.path.clone())
        }
    }
}

/// True when `path` is the `:memory:` sentinel
pub fn is_memory_path(path: &Path) -> bool {
    path.as_os_str() == MEMORY_PATH
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the store variant
    pub fn store(mut self, kind: StoreKind) -> Self {
        self.config.store = kind;
        self
    }

    /// Set the command log path (`:memory:` disables persistence)
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Disable the command log
    pub fn in_memory(self) -> Self {
        self.path(MEMORY_PATH)
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
