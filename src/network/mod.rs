//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One thread per connection
//! - Pipelined `GET`/`SET` runs folded into batched store calls

mod server;
mod connection;
mod client;
pub mod pipeline;

pub use server::{Server, ServerHandle};
pub use connection::Connection;
pub use client::Client;
pub use pipeline::{coalesce, Batch};
