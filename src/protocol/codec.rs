//! Protocol codec
//!
//! Encoding and decoding functions for the RESP wire protocol.
//!
//! ## Wire Format
//!
//! ### Request Format
//! ```text
//! *<argc>\r\n
//! $<len>\r\n<arg>\r\n        (repeated argc times)
//! ```
//! Inline requests (`GET key\r\n`) are accepted too.
//!
//! ### Reply Format
//! ```text
//! +OK\r\n              status
//! -ERR message\r\n     error
//! :42\r\n              integer
//! $5\r\nvalue\r\n      bulk
//! $-1\r\n              null
//! *2\r\n...            array
//! ```

use std::io::{BufRead, Read, Write};
use std::ops::Range;

use bytes::{Buf, BytesMut};

use crate::error::{KvError, Result};
use crate::wal::encode_record;
use super::{Command, Reply};

/// Maximum bulk argument size (512 MB)
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Maximum number of arguments in one request
pub const MAX_MULTIBULK_LEN: usize = 1024 * 1024;

/// Maximum length of an inline request or header line (64 KB)
pub const MAX_INLINE_LEN: usize = 64 * 1024;

// =============================================================================
// Request Decoding (server side)
// =============================================================================

/// Parse the next complete request from the front of `buf`.
///
/// Consumed bytes are split off `buf`; the returned arguments share that
/// allocation. Returns `Ok(None)` when more bytes are needed. Empty requests
/// (blank inline lines, `*0`) are skipped.
pub fn parse_command(buf: &mut BytesMut) -> Result<Option<Command>> {
    loop {
        if buf.is_empty() {
            return Ok(None);
        }
        let parsed = if buf[0] == b'*' {
            parse_multibulk(buf)?
        } else {
            parse_inline(buf)?
        };
        match parsed {
            Some(cmd) if cmd.is_empty() => continue,
            other => return Ok(other),
        }
    }
}

fn parse_multibulk(buf: &mut BytesMut) -> Result<Option<Command>> {
    let (argc, mut pos) = match read_header(buf, 0)? {
        Some(header) => header,
        None => return Ok(None),
    };
    if argc <= 0 {
        buf.advance(pos);
        return Ok(Some(Command::new(Vec::new())));
    }
    let argc = argc as usize;
    if argc > MAX_MULTIBULK_LEN {
        return Err(KvError::Protocol("invalid multibulk length".to_string()));
    }

    let mut ranges: Vec<Range<usize>> = Vec::with_capacity(argc.min(64));
    for _ in 0..argc {
        if pos >= buf.len() {
            return Ok(None);
        }
        if buf[pos] != b'$' {
            return Err(KvError::Protocol(format!(
                "expected '$', got '{}'",
                buf[pos] as char
            )));
        }
        let (len, start) = match read_header(buf, pos)? {
            Some(header) => header,
            None => return Ok(None),
        };
        if len < 0 || len as usize > MAX_BULK_LEN {
            return Err(KvError::Protocol("invalid bulk length".to_string()));
        }
        let end = start + len as usize;
        if buf.len() < end + 2 {
            return Ok(None);
        }
        if &buf[end..end + 2] != b"\r\n" {
            return Err(KvError::Protocol("bulk is not terminated by CRLF".to_string()));
        }
        ranges.push(start..end);
        pos = end + 2;
    }

    let frame = buf.split_to(pos).freeze();
    Ok(Some(Command::new(
        ranges.into_iter().map(|r| frame.slice(r)).collect(),
    )))
}

/// Parse `<marker><signed int>\r\n` at `at`, returning the value and the
/// offset just past the line.
fn read_header(buf: &[u8], at: usize) -> Result<Option<(i64, usize)>> {
    let line_end = match find_crlf(&buf[at..]) {
        Some(offset) => at + offset,
        None => {
            if buf.len() - at > MAX_INLINE_LEN {
                return Err(KvError::Protocol("too big header line".to_string()));
            }
            return Ok(None);
        }
    };
    let digits = &buf[at + 1..line_end];
    let value = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            KvError::Protocol(format!(
                "invalid length '{}'",
                String::from_utf8_lossy(digits)
            ))
        })?;
    Ok(Some((value, line_end + 2)))
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

fn parse_inline(buf: &mut BytesMut) -> Result<Option<Command>> {
    let newline = match buf.iter().position(|&b| b == b'\n') {
        Some(i) => i,
        None => {
            if buf.len() > MAX_INLINE_LEN {
                return Err(KvError::Protocol("too big inline request".to_string()));
            }
            return Ok(None);
        }
    };

    let line_len = if newline > 0 && buf[newline - 1] == b'\r' {
        newline - 1
    } else {
        newline
    };

    let mut ranges = Vec::new();
    let mut start = None;
    for (i, &b) in buf[..line_len].iter().enumerate() {
        match (b.is_ascii_whitespace(), start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                ranges.push(s..i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        ranges.push(s..line_len);
    }

    let frame = buf.split_to(newline + 1).freeze();
    Ok(Some(Command::new(
        ranges.into_iter().map(|r| frame.slice(r)).collect(),
    )))
}

// =============================================================================
// Request Encoding (client side)
// =============================================================================

/// Encode a command as a RESP multi-bulk request.
///
/// Requests share their framing with WAL records.
pub fn encode_command(command: &Command, out: &mut Vec<u8>) {
    encode_record(out, command.args());
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let mut bytes = Vec::new();
    encode_command(command, &mut bytes);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Reply Encoding (server side)
// =============================================================================

/// Append the wire form of `reply` to `out`
pub fn encode_reply(reply: &Reply, out: &mut Vec<u8>) {
    match reply {
        Reply::Status(text) => {
            out.push(b'+');
            push_line_text(out, text);
        }
        Reply::Error(message) => {
            out.push(b'-');
            push_line_text(out, message);
        }
        Reply::Integer(n) => {
            out.push(b':');
            out.extend_from_slice(n.to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        Reply::Bulk(bytes) => {
            out.push(b'$');
            out.extend_from_slice(bytes.len().to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(bytes);
            out.extend_from_slice(b"\r\n");
        }
        Reply::Null => out.extend_from_slice(b"$-1\r\n"),
        Reply::Array(items) => {
            out.push(b'*');
            out.extend_from_slice(items.len().to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
            for item in items {
                encode_reply(item, out);
            }
        }
    }
}

/// Status and error lines cannot carry CR or LF
fn push_line_text(out: &mut Vec<u8>, text: &str) {
    out.extend(
        text.bytes()
            .map(|b| if b == b'\r' || b == b'\n' { b' ' } else { b }),
    );
    out.extend_from_slice(b"\r\n");
}

// =============================================================================
// Reply Decoding (client side)
// =============================================================================

/// Read one complete reply from a stream.
///
/// Blocks until the reply is complete; end of stream is an I/O error.
pub fn read_reply<R: BufRead>(reader: &mut R) -> Result<Reply> {
    let line = read_line(reader)?;
    let (marker, rest) = match line.split_first() {
        Some((marker, rest)) => (*marker, rest),
        None => return Err(KvError::Protocol("empty reply line".to_string())),
    };

    match marker {
        b'+' => Ok(Reply::Status(String::from_utf8_lossy(rest).into_owned())),
        b'-' => Ok(Reply::Error(String::from_utf8_lossy(rest).into_owned())),
        b':' => Ok(Reply::Integer(parse_int(rest)?)),
        b'$' => {
            let len = parse_int(rest)?;
            if len < 0 {
                return Ok(Reply::Null);
            }
            let len = len as usize;
            if len > MAX_BULK_LEN {
                return Err(KvError::Protocol("invalid bulk length".to_string()));
            }
            let mut bytes = vec![0u8; len + 2];
            reader.read_exact(&mut bytes)?;
            if &bytes[len..] != b"\r\n" {
                return Err(KvError::Protocol("bulk is not terminated by CRLF".to_string()));
            }
            bytes.truncate(len);
            Ok(Reply::Bulk(bytes))
        }
        b'*' => {
            let count = parse_int(rest)?;
            if count < 0 {
                return Ok(Reply::Null);
            }
            let mut items = Vec::with_capacity((count as usize).min(1024));
            for _ in 0..count {
                items.push(read_reply(reader)?);
            }
            Ok(Reply::Array(items))
        }
        other => Err(KvError::Protocol(format!(
            "unexpected reply marker '{}'",
            other as char
        ))),
    }
}

/// Read a CRLF-terminated line, without the terminator
fn read_line<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    let read = reader.read_until(b'\n', &mut line)?;
    if read == 0 {
        return Err(KvError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed",
        )));
    }
    if !line.ends_with(b"\r\n") {
        return Err(KvError::Protocol("reply line is not terminated by CRLF".to_string()));
    }
    line.truncate(line.len() - 2);
    Ok(line)
}

fn parse_int(digits: &[u8]) -> Result<i64> {
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            KvError::Protocol(format!(
                "invalid integer '{}'",
                String::from_utf8_lossy(digits)
            ))
        })
}
