//! kvbench Server Binary
//!
//! Opens the configured store and serves it over TCP.

use clap::Parser;
use kvbench::config::{StoreKind, WalSyncStrategy};
use kvbench::network::Server;
use kvbench::{storage, Config};
use tracing_subscriber::{fmt, EnvFilter};

/// kvbench Server
#[derive(Parser, Debug)]
#[command(name = "kvbench-server")]
#[command(about = "RESP key-value server with an append-only command log")]
#[command(version)]
struct Args {
    /// TCP port
    #[arg(short, long, default_value = "6380")]
    port: u16,

    /// Listen host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Store type: map or btree
    #[arg(long, default_value = "map")]
    store: StoreKind,

    /// fsync after every command log write
    #[arg(long, default_value = "true", action = clap::ArgAction::Set)]
    fsync: bool,

    /// Command log path (empty: <store>.db, ":memory:": no log)
    #[arg(long, default_value = "")]
    path: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kvbench=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .store(args.store)
        .path(&args.path)
        .wal_sync_strategy(WalSyncStrategy::from_fsync(args.fsync))
        .listen_addr(format!("{}:{}", args.host, args.port))
        .max_connections(args.max_connections)
        .build();

    tracing::info!("kvbench server v{}", kvbench::VERSION);
    tracing::info!(
        "store: {}, fsync: {}, log: {}",
        config.store,
        args.fsync,
        config
            .log_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "none".to_string())
    );

    let store = match storage::open(&config) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    let server = match Server::bind(config, store.clone()) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = store.close() {
        tracing::error!("Failed to close store: {}", e);
        std::process::exit(1);
    }
}
