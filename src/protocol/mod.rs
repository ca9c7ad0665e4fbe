//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (RESP)
//!
//! Requests are arrays of bulk strings; the first element names the command.
//! The framing is the same one the WAL uses for its records.
//!
//! ```text
//! *3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$5\r\nvalue\r\n
//! ```
//!
//! ### Commands
//! - `PING [message]`
//! - `QUIT`
//! - `SHUTDOWN`
//! - `SET key value`
//! - `GET key`
//! - `DEL key`
//! - `FLUSHDB`
//! - `KEYS pattern [WITHVALUES] [LIMIT n]`
//!
//! ### Reply Markers
//! - `+` status
//! - `-` error
//! - `:` integer
//! - `$` bulk (`$-1` for null)
//! - `*` array

mod command;
mod response;
mod codec;

pub use command::{Command, CommandKind};
pub use response::Reply;
pub use codec::{
    encode_command, encode_reply, parse_command, read_reply, write_command,
    MAX_BULK_LEN, MAX_INLINE_LEN, MAX_MULTIBULK_LEN,
};
