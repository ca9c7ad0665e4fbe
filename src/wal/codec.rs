//! WAL record codec
//!
//! Encoding and decoding of a single command record.
//!
//! ## Format
//! ```text
//! *<count>\r\n
//! $<len>\r\n<bytes>\r\n      (repeated <count> times)
//! ```
//! Counts and lengths are unsigned decimal ASCII.

use std::io::{BufRead, Read};

use crate::error::{KvError, Result};
use super::Record;

/// Number of bytes `encode_record` appends for `args`
pub fn encoded_len<A: AsRef<[u8]>>(args: &[A]) -> usize {
    let mut len = 1 + decimal_width(args.len()) + 2;
    for arg in args {
        let arg = arg.as_ref();
        len += 1 + decimal_width(arg.len()) + 2 + arg.len() + 2;
    }
    len
}

/// Append one record to `buf`
pub fn encode_record<A: AsRef<[u8]>>(buf: &mut Vec<u8>, args: &[A]) {
    buf.reserve(encoded_len(args));
    buf.push(b'*');
    push_decimal(buf, args.len());
    buf.extend_from_slice(b"\r\n");
    for arg in args {
        let arg = arg.as_ref();
        buf.push(b'$');
        push_decimal(buf, arg.len());
        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(arg);
        buf.extend_from_slice(b"\r\n");
    }
}

/// Decode the next record from `reader`.
///
/// Returns `Ok(None)` when the input ends cleanly between records. Any
/// structural problem, including input ending inside a record, is a
/// `WalCorruption` error.
pub fn decode_record<R: BufRead>(reader: &mut R) -> Result<Option<Record>> {
    match read_byte(reader)? {
        None => return Ok(None),
        Some(b'*') => {}
        Some(other) => return Err(unexpected_marker(b'*', other)),
    }

    let count = read_length_line(reader, "element count")?;
    // Don't trust the count for preallocation; a corrupt header could be huge.
    let mut args = Vec::with_capacity(count.min(64));

    for _ in 0..count {
        match read_byte(reader)? {
            Some(b'$') => {}
            Some(other) => return Err(unexpected_marker(b'$', other)),
            None => return Err(truncated()),
        }
        let len = read_length_line(reader, "element length")?;

        let mut arg = Vec::with_capacity(len.min(64 * 1024));
        let read = reader.by_ref().take(len as u64).read_to_end(&mut arg)?;
        if read != len {
            return Err(truncated());
        }

        for expected in [b'\r', b'\n'] {
            match read_byte(reader)? {
                Some(c) if c == expected => {}
                Some(_) => {
                    return Err(KvError::WalCorruption(
                        "element is not terminated by CRLF".to_string(),
                    ))
                }
                None => return Err(truncated()),
            }
        }

        args.push(arg);
    }

    Ok(Some(Record::new(args)))
}

// =============================================================================
// Helpers
// =============================================================================

fn read_byte<R: BufRead>(reader: &mut R) -> Result<Option<u8>> {
    let byte = match reader.fill_buf()? {
        [] => None,
        [first, ..] => Some(*first),
    };
    if byte.is_some() {
        reader.consume(1);
    }
    Ok(byte)
}

/// Read `<digits>\r\n` and parse the digits
fn read_length_line<R: BufRead>(reader: &mut R, what: &str) -> Result<usize> {
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;

    if line.last() != Some(&b'\n') {
        return Err(truncated());
    }
    if line.len() < 2 || line[line.len() - 2] != b'\r' {
        return Err(KvError::WalCorruption(format!(
            "{} line is not terminated by CRLF",
            what
        )));
    }

    let digits = &line[..line.len() - 2];
    parse_decimal(digits).ok_or_else(|| {
        KvError::WalCorruption(format!(
            "invalid {}: {:?}",
            what,
            String::from_utf8_lossy(digits)
        ))
    })
}

fn parse_decimal(digits: &[u8]) -> Option<usize> {
    if digits.is_empty() {
        return None;
    }
    digits.iter().try_fold(0usize, |acc, &d| {
        if !d.is_ascii_digit() {
            return None;
        }
        acc.checked_mul(10)?.checked_add((d - b'0') as usize)
    })
}

fn push_decimal(buf: &mut Vec<u8>, mut n: usize) {
    let mut digits = [0u8; 20];
    let mut i = digits.len();
    loop {
        i -= 1;
        digits[i] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    buf.extend_from_slice(&digits[i..]);
}

fn decimal_width(mut n: usize) -> usize {
    let mut width = 1;
    while n >= 10 {
        n /= 10;
        width += 1;
    }
    width
}

fn unexpected_marker(expected: u8, found: u8) -> KvError {
    KvError::WalCorruption(format!(
        "expected '{}', found byte 0x{:02x}",
        expected as char, found
    ))
}

fn truncated() -> KvError {
    KvError::WalCorruption("unexpected end of log inside a record".to_string())
}
