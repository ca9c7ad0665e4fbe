//! Command definitions
//!
//! Represents commands from clients.

use std::borrow::Cow;

use bytes::Bytes;

/// Command types the server understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Ping,
    Quit,
    Shutdown,
    Set,
    Get,
    Del,
    FlushDb,
    Keys,
    Unknown,
}

impl CommandKind {
    /// Classify a command name, ignoring ASCII case
    pub fn parse(name: &[u8]) -> Self {
        if name.eq_ignore_ascii_case(b"get") {
            CommandKind::Get
        } else if name.eq_ignore_ascii_case(b"set") {
            CommandKind::Set
        } else if name.eq_ignore_ascii_case(b"del") {
            CommandKind::Del
        } else if name.eq_ignore_ascii_case(b"keys") {
            CommandKind::Keys
        } else if name.eq_ignore_ascii_case(b"ping") {
            CommandKind::Ping
        } else if name.eq_ignore_ascii_case(b"quit") {
            CommandKind::Quit
        } else if name.eq_ignore_ascii_case(b"flushdb") {
            CommandKind::FlushDb
        } else if name.eq_ignore_ascii_case(b"shutdown") {
            CommandKind::Shutdown
        } else {
            CommandKind::Unknown
        }
    }
}

/// A parsed request: the command name followed by its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    args: Vec<Bytes>,
}

impl Command {
    pub fn new(args: Vec<Bytes>) -> Self {
        Self { args }
    }

    /// Build a command by copying borrowed arguments
    pub fn from_args<A: AsRef<[u8]>>(args: &[A]) -> Self {
        Self {
            args: args
                .iter()
                .map(|a| Bytes::copy_from_slice(a.as_ref()))
                .collect(),
        }
    }

    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&Bytes> {
        self.args.get(index)
    }

    /// Number of elements including the name
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn name(&self) -> &[u8] {
        self.args.first().map(|b| &b[..]).unwrap_or_default()
    }

    /// Name for error messages
    pub fn name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name())
    }

    pub fn kind(&self) -> CommandKind {
        CommandKind::parse(self.name())
    }
}
