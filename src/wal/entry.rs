//! WAL record definitions
//!
//! A record is one logged command: its name followed by its arguments.

/// Name written for a logged SET
pub const SET: &[u8] = b"set";

/// Name written for a logged DEL
pub const DEL: &[u8] = b"del";

/// Name written for a logged FLUSHDB
pub const FLUSHDB: &[u8] = b"flushdb";

/// A single command record in the WAL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    args: Vec<Vec<u8>>,
}

/// A record interpreted as a store mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation<'a> {
    /// Upsert a key
    Set { key: &'a [u8], value: &'a [u8] },

    /// Remove a key
    Del { key: &'a [u8] },

    /// Drop every key
    FlushDb,
}

impl Record {
    pub fn new(args: Vec<Vec<u8>>) -> Self {
        Self { args }
    }

    /// Build a record by copying borrowed arguments
    pub fn from_args<A: AsRef<[u8]>>(args: &[A]) -> Self {
        Self {
            args: args.iter().map(|a| a.as_ref().to_vec()).collect(),
        }
    }

    pub fn args(&self) -> &[Vec<u8>] {
        &self.args
    }

    /// The command name, if the record has any elements
    pub fn name(&self) -> Option<&[u8]> {
        self.args.first().map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Interpret the record as a mutation.
    ///
    /// Names match case-insensitively and extra trailing arguments are
    /// ignored. Returns `None` for unknown commands and for records that are
    /// too short to carry their operands.
    pub fn mutation(&self) -> Option<Mutation<'_>> {
        let name = self.name()?;
        if name.eq_ignore_ascii_case(SET) {
            match self.args.as_slice() {
                [_, key, value, ..] => Some(Mutation::Set { key, value }),
                _ => None,
            }
        } else if name.eq_ignore_ascii_case(DEL) {
            match self.args.as_slice() {
                [_, key, ..] => Some(Mutation::Del { key }),
                _ => None,
            }
        } else if name.eq_ignore_ascii_case(FLUSHDB) {
            Some(Mutation::FlushDb)
        } else {
            None
        }
    }
}

impl From<Vec<Vec<u8>>> for Record {
    fn from(args: Vec<Vec<u8>>) -> Self {
        Self::new(args)
    }
}
