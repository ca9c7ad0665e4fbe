//! Glob pattern matching and pruned key scans
//!
//! Patterns use `*` for any run of characters and `?` for exactly one
//! character; every other byte matches itself. On an ordered container the
//! literal prefix in front of the first wildcard bounds the scan to the
//! half-open range `[min, max)`, and each key inside the range is still
//! checked with the full matcher.

/// Keys (and optionally values) produced by a scan, index aligned
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub keys: Vec<Vec<u8>>,
    pub values: Vec<Vec<u8>>,
}

impl ScanResult {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Range of keys that can possibly match a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bounds {
    /// Literal prefix; every match sorts at or above it
    pub min: Vec<u8>,

    /// Every match sorts strictly below this. `None` means no upper bound.
    pub max: Option<Vec<u8>>,
}

impl Bounds {
    /// Whether the bounds narrow anything at all
    pub fn prunes(&self) -> bool {
        !self.min.is_empty()
    }
}

/// Derive scan bounds from the literal prefix of `pattern`
pub fn bounds(pattern: &[u8]) -> Bounds {
    let prefix_len = pattern
        .iter()
        .position(|&c| is_wildcard(c))
        .unwrap_or(pattern.len());
    let min = pattern[..prefix_len].to_vec();
    let max = successor(&min);
    Bounds { min, max }
}

/// Smallest byte string greater than every string starting with `prefix`
fn successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut max = prefix.to_vec();
    while let Some(last) = max.pop() {
        if last < u8::MAX {
            max.push(last + 1);
            return Some(max);
        }
    }
    None
}

fn is_wildcard(c: u8) -> bool {
    c == b'*' || c == b'?'
}

/// Full glob match of `key` against `pattern`
pub fn glob_match(key: &[u8], pattern: &[u8]) -> bool {
    let (mut k, mut p) = (0, 0);
    // Pattern index just past the last `*`, and the key index it is anchored at.
    let mut star: Option<(usize, usize)> = None;

    while k < key.len() {
        if p < pattern.len() {
            match pattern[p] {
                b'*' => {
                    star = Some((p + 1, k));
                    p += 1;
                    continue;
                }
                b'?' => {
                    k += char_width(&key[k..]);
                    p += 1;
                    continue;
                }
                c if c == key[k] => {
                    k += 1;
                    p += 1;
                    continue;
                }
                _ => {}
            }
        }
        match star {
            Some((after_star, anchor)) => {
                // `*` swallows whole characters, never half of one
                let next = anchor + char_width(&key[anchor..]);
                star = Some((after_star, next));
                p = after_star;
                k = next;
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}

/// Width of the character at the start of `bytes`: one UTF-8 scalar when the
/// bytes form one, otherwise a single byte.
fn char_width(bytes: &[u8]) -> usize {
    let width = match bytes.first() {
        Some(&b) if b < 0x80 => return 1,
        Some(&b) if b & 0xE0 == 0xC0 => 2,
        Some(&b) if b & 0xF0 == 0xE0 => 3,
        Some(&b) if b & 0xF8 == 0xF0 => 4,
        _ => return 1,
    };
    match bytes.get(..width) {
        Some(seq) if std::str::from_utf8(seq).is_ok() => width,
        _ => 1,
    }
}

/// Collect matches from `entries`, which must be in the container's natural
/// order. Iteration stops at the first key `>= upper` when an upper bound is
/// given, or once `limit` matches have been collected.
pub fn scan<'a, I>(
    entries: I,
    pattern: &[u8],
    upper: Option<&[u8]>,
    limit: Option<usize>,
    with_values: bool,
) -> ScanResult
where
    I: Iterator<Item = (&'a [u8], &'a [u8])>,
{
    let mut result = ScanResult::default();
    for (key, value) in entries {
        if limit.map_or(false, |limit| result.keys.len() >= limit) {
            break;
        }
        if upper.map_or(false, |upper| key >= upper) {
            break;
        }
        if glob_match(key, pattern) {
            result.keys.push(key.to_vec());
            if with_values {
                result.values.push(value.to_vec());
            }
        }
    }
    result
}
