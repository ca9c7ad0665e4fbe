//! Connection Handler
//!
//! Handles individual client connections.
//!
//! Each read drains every complete request in the buffer into a pipeline
//! window before any of them runs, so back-to-back `GET`s or `SET`s sent
//! without waiting for replies can be folded into one batched store call.
//! Replies are written in request order and flushed once per read.

use std::collections::VecDeque;
use std::io::{BufWriter, Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};

use crate::error::{KvError, Result};
use crate::protocol::{encode_reply, parse_command, Command, CommandKind, Reply};
use crate::storage::Store;
use super::pipeline::{coalesce, Batch};
use super::server::ServerHandle;

/// Bytes requested from the socket per read
const READ_CHUNK: usize = 16 * 1024;

/// Whether to keep serving after a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader
    reader: TcpStream,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Bytes received but not yet parsed
    buf: BytesMut,

    /// Parsed requests waiting to run
    pending: VecDeque<Command>,

    /// Shared store backend
    store: Arc<dyn Store>,

    /// Used by `SHUTDOWN`
    server: ServerHandle,

    /// Peer address for logging
    peer_addr: String,

    /// Reply encode buffer, reused across requests
    out: Vec<u8>,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, store: Arc<dyn Store>, server: ServerHandle) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: read_stream,
            writer: BufWriter::new(stream),
            buf: BytesMut::with_capacity(READ_CHUNK),
            pending: VecDeque::new(),
            store,
            server,
            peer_addr,
            out: Vec::new(),
        })
    }

    /// Configure connection timeouts (0 leaves a direction unbounded)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Peer disconnects and timeouts end the connection quietly.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        match self.serve() {
            Err(e) if e.is_disconnect() => {
                tracing::debug!("Client {} disconnected: {}", self.peer_addr, e);
                Ok(())
            }
            Err(e) if e.is_timeout() => {
                tracing::debug!("Timeout for client {}", self.peer_addr);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Error on connection {}: {}", self.peer_addr, e);
                Err(e)
            }
            Ok(()) => {
                tracing::debug!("Connection {} closed", self.peer_addr);
                Ok(())
            }
        }
    }

    fn serve(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let mut protocol_error = None;
            loop {
                match parse_command(&mut self.buf) {
                    Ok(Some(command)) => self.pending.push_back(command),
                    Ok(None) => break,
                    Err(e) => {
                        protocol_error = Some(e);
                        break;
                    }
                }
            }

            while let Some(command) = self.pending.pop_front() {
                if self.dispatch(command)? == Flow::Close {
                    self.writer.flush()?;
                    return Ok(());
                }
            }

            if let Some(e) = protocol_error {
                tracing::debug!("Protocol error from {}: {}", self.peer_addr, e);
                self.send(&Reply::error(format!("ERR {}", e)))?;
                self.writer.flush()?;
                return Ok(());
            }

            self.writer.flush()?;

            let n = self.reader.read(&mut chunk)?;
            if n == 0 {
                return Ok(());
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Run one request, folding followers from the window into it if possible
    fn dispatch(&mut self, command: Command) -> Result<Flow> {
        tracing::trace!("Received command from {}: {:?}", self.peer_addr, command);

        if let Some(batch) = coalesce(&command, &mut self.pending) {
            self.execute_batch(batch)?;
            return Ok(Flow::Continue);
        }

        let (reply, flow) = self.execute(&command);
        self.send(&reply)?;
        Ok(flow)
    }

    /// Run a batch and write one reply per original request
    fn execute_batch(&mut self, batch: Batch) -> Result<()> {
        let count = batch.len();
        tracing::trace!("Batched {} requests from {}", count, self.peer_addr);

        match batch {
            Batch::Get { keys } => {
                let keys: Vec<&[u8]> = keys.iter().map(|k| &k[..]).collect();
                match self.store.pget(&keys) {
                    Ok(values) => {
                        for value in values {
                            self.send(&Reply::from_value(value))?;
                        }
                    }
                    Err(e) => self.send_repeated(&store_error(&e), count)?,
                }
            }
            Batch::Set { keys, values } => {
                let keys: Vec<&[u8]> = keys.iter().map(|k| &k[..]).collect();
                let values: Vec<&[u8]> = values.iter().map(|v| &v[..]).collect();
                match self.store.pset(&keys, &values) {
                    Ok(()) => self.send_repeated(&Reply::ok(), count)?,
                    Err(e) => self.send_repeated(&store_error(&e), count)?,
                }
            }
        }
        Ok(())
    }

    /// Execute a command and return its reply
    fn execute(&self, command: &Command) -> (Reply, Flow) {
        let args = command.args();
        let reply = match command.kind() {
            CommandKind::Ping => match args.len() {
                1 => Reply::pong(),
                2 => Reply::Bulk(args[1].to_vec()),
                _ => wrong_args(command),
            },
            CommandKind::Quit => return (Reply::ok(), Flow::Close),
            CommandKind::Shutdown => {
                tracing::info!("Shutdown requested by {}", self.peer_addr);
                self.server.shutdown();
                return (Reply::ok(), Flow::Close);
            }
            CommandKind::Set => {
                if args.len() != 3 {
                    wrong_args(command)
                } else {
                    match self.store.set(&args[1], &args[2]) {
                        Ok(()) => Reply::ok(),
                        Err(e) => store_error(&e),
                    }
                }
            }
            CommandKind::Get => {
                if args.len() != 2 {
                    wrong_args(command)
                } else {
                    match self.store.get(&args[1]) {
                        Ok(value) => Reply::from_value(value),
                        Err(e) => store_error(&e),
                    }
                }
            }
            CommandKind::Del => {
                if args.len() != 2 {
                    wrong_args(command)
                } else {
                    match self.store.del(&args[1]) {
                        Ok(existed) => Reply::Integer(existed as i64),
                        Err(e) => store_error(&e),
                    }
                }
            }
            CommandKind::FlushDb => {
                if args.len() != 1 {
                    wrong_args(command)
                } else {
                    match self.store.flushdb() {
                        Ok(()) => Reply::ok(),
                        Err(e) => store_error(&e),
                    }
                }
            }
            CommandKind::Keys => {
                if args.len() < 2 {
                    wrong_args(command)
                } else {
                    self.execute_keys(&args[1], &args[2..])
                }
            }
            CommandKind::Unknown => {
                Reply::error(format!("ERR unknown command '{}'", command.name_lossy()))
            }
        };
        (reply, Flow::Continue)
    }

    fn execute_keys(&self, pattern: &[u8], options: &[Bytes]) -> Reply {
        let (with_values, limit) = match parse_keys_options(options) {
            Some(parsed) => parsed,
            None => return Reply::syntax_error(),
        };

        match self.store.keys(pattern, limit, with_values) {
            Ok(result) => {
                let mut items = Vec::with_capacity(result.len() * if with_values { 2 } else { 1 });
                if with_values {
                    for (key, value) in result.keys.into_iter().zip(result.values) {
                        items.push(Reply::Bulk(key));
                        items.push(Reply::Bulk(value));
                    }
                } else {
                    items.extend(result.keys.into_iter().map(Reply::Bulk));
                }
                Reply::Array(items)
            }
            Err(e) => store_error(&e),
        }
    }

    /// Encode a reply into the write buffer
    fn send(&mut self, reply: &Reply) -> Result<()> {
        self.out.clear();
        encode_reply(reply, &mut self.out);
        self.writer.write_all(&self.out)?;
        Ok(())
    }

    fn send_repeated(&mut self, reply: &Reply, count: usize) -> Result<()> {
        self.out.clear();
        for _ in 0..count {
            encode_reply(reply, &mut self.out);
        }
        self.writer.write_all(&self.out)?;
        Ok(())
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// Parse `[WITHVALUES] [LIMIT n]` in any order. Unrecognized words are
/// skipped. `None` means a bad or missing LIMIT count.
fn parse_keys_options(options: &[Bytes]) -> Option<(bool, Option<usize>)> {
    let mut with_values = false;
    let mut limit = None;
    let mut i = 0;
    while i < options.len() {
        let option = &options[i];
        if option.eq_ignore_ascii_case(b"withvalues") {
            with_values = true;
            i += 1;
        } else if option.eq_ignore_ascii_case(b"limit") {
            let n = options.get(i + 1)?;
            let n = std::str::from_utf8(n).ok()?.parse::<usize>().ok()?;
            limit = Some(n);
            i += 2;
        } else {
            i += 1;
        }
    }
    Some((with_values, limit))
}

fn wrong_args(command: &Command) -> Reply {
    Reply::wrong_args(&command.name_lossy().to_lowercase())
}

fn store_error(e: &KvError) -> Reply {
    Reply::error(format!("ERR {}", e))
}
