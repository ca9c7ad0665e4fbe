//! Reply definitions
//!
//! Represents replies sent to clients.

/// A RESP reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+<text>`
    Status(String),

    /// `-<message>`
    Error(String),

    /// `:<n>`
    Integer(i64),

    /// `$<len>` followed by the bytes
    Bulk(Vec<u8>),

    /// `$-1`, a missing value
    Null,

    /// `*<n>` followed by n replies
    Array(Vec<Reply>),
}

impl Reply {
    /// `+OK`
    pub fn ok() -> Self {
        Reply::Status("OK".to_string())
    }

    /// `+PONG`
    pub fn pong() -> Self {
        Reply::Status("PONG".to_string())
    }

    /// An error reply; the message should carry its own `ERR` prefix
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(message.into())
    }

    /// Bulk for a found value, null otherwise
    pub fn from_value(value: Option<Vec<u8>>) -> Self {
        value.map(Reply::Bulk).unwrap_or(Reply::Null)
    }

    /// `-ERR wrong number of arguments for '<name>' command`
    pub fn wrong_args(name: &str) -> Self {
        Reply::Error(format!(
            "ERR wrong number of arguments for '{}' command",
            name
        ))
    }

    /// `-ERR syntax error`
    pub fn syntax_error() -> Self {
        Reply::Error("ERR syntax error".to_string())
    }

    /// True for `-` replies; the CLI exits non-zero on these
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}
