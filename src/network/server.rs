//! TCP Server
//!
//! Accepts connections and runs each one on its own thread.

use std::collections::HashMap;
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::sync::WaitGroup;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::protocol::{encode_reply, Reply};
use crate::storage::Store;
use super::Connection;

/// How long the acceptor sleeps when no connection is waiting
const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// Clones of every live client stream, so shutdown can unblock their reads
type Registry = Arc<Mutex<HashMap<u64, TcpStream>>>;

/// Cloneable handle that can stop a running server
#[derive(Debug, Clone, Default)]
pub struct ServerHandle {
    shutdown: Arc<AtomicBool>,
}

impl ServerHandle {
    /// Ask the server to stop accepting and close its connections
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// TCP server for kvbench
pub struct Server {
    config: Config,
    store: Arc<dyn Store>,
    listener: TcpListener,
    handle: ServerHandle,
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, store: Arc<dyn Store>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            config,
            store,
            listener,
            handle: ServerHandle::default(),
        })
    }

    /// The bound address (useful when listening on port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    /// Serve until shut down (blocking)
    ///
    /// Returns once every connection thread has finished.
    pub fn run(&self) -> Result<()> {
        info!(
            "server started on {} ({} store)",
            self.local_addr()?,
            self.store.name()
        );

        let wait_group = WaitGroup::new();
        let registry: Registry = Arc::new(Mutex::new(HashMap::new()));
        let mut next_id: u64 = 0;

        while !self.handle.is_shutdown() {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    next_id += 1;
                    if let Err(e) = self.spawn_connection(next_id, stream, &registry, &wait_group) {
                        warn!("failed to start connection from {}: {}", addr, e);
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL);
                }
                Err(e) => {
                    warn!("accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL);
                }
            }
        }

        {
            let live = registry.lock();
            info!("shutting down, closing {} connections", live.len());
            for stream in live.values() {
                let _ = stream.shutdown(Shutdown::Both);
            }
        }
        wait_group.wait();
        info!("server stopped");
        Ok(())
    }

    fn spawn_connection(
        &self,
        id: u64,
        mut stream: TcpStream,
        registry: &Registry,
        wait_group: &WaitGroup,
    ) -> Result<()> {
        stream.set_nonblocking(false)?;

        {
            let mut live = registry.lock();
            if live.len() >= self.config.max_connections {
                drop(live);
                debug!("rejecting connection {}: too many clients", id);
                let mut out = Vec::new();
                encode_reply(&Reply::error("ERR max number of clients reached"), &mut out);
                let _ = stream.write_all(&out);
                return Ok(());
            }
            live.insert(id, stream.try_clone()?);
        }

        let store = Arc::clone(&self.store);
        let handle = self.handle.clone();
        let registry_for_thread = Arc::clone(registry);
        let wait_group = wait_group.clone();
        let (read_ms, write_ms) = (self.config.read_timeout_ms, self.config.write_timeout_ms);

        let spawned = thread::Builder::new()
            .name(format!("conn-{}", id))
            .spawn(move || {
                let _wait_group = wait_group;
                let result = Connection::new(stream, store, handle).and_then(|mut conn| {
                    conn.set_timeouts(read_ms, write_ms)?;
                    conn.handle()
                });
                if let Err(e) = result {
                    warn!("connection {} ended with error: {}", id, e);
                }
                registry_for_thread.lock().remove(&id);
            });

        if let Err(e) = spawned {
            registry.lock().remove(&id);
            return Err(e.into());
        }
        Ok(())
    }
}
