//! Request batching
//!
//! Coalesces a run of pipelined single-key `GET` or `SET` requests into one
//! `pget`/`pset` call so a burst of writes costs one log commit.

use std::collections::VecDeque;

use bytes::Bytes;

use crate::protocol::{Command, CommandKind};

/// A coalesced run of requests, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Batch {
    Get { keys: Vec<Bytes> },
    Set { keys: Vec<Bytes>, values: Vec<Bytes> },
}

impl Batch {
    /// Number of original requests folded into this batch
    pub fn len(&self) -> usize {
        match self {
            Batch::Get { keys } => keys.len(),
            Batch::Set { keys, .. } => keys.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Argument count a request must have to join a batch of its kind
fn batch_arity(kind: CommandKind) -> Option<usize> {
    match kind {
        CommandKind::Get => Some(2),
        CommandKind::Set => Some(3),
        _ => None,
    }
}

/// Try to fold `first` and the requests queued behind it into a batch.
///
/// Requests are taken from the front of `window` while they have the same
/// kind and argument count as `first`; the first mismatch ends the run.
/// Returns `None`, leaving `window` untouched, when `first` is not batchable
/// or nothing follows it.
pub fn coalesce(first: &Command, window: &mut VecDeque<Command>) -> Option<Batch> {
    let kind = first.kind();
    let arity = batch_arity(kind)?;
    if first.len() != arity {
        return None;
    }

    let run = window
        .iter()
        .take_while(|cmd| cmd.len() == arity && cmd.kind() == kind)
        .count();
    if run == 0 {
        return None;
    }

    let followers = window.drain(..run);
    let mut keys = Vec::with_capacity(run + 1);
    keys.push(first.args()[1].clone());

    match kind {
        CommandKind::Get => {
            keys.extend(followers.map(|cmd| cmd.args()[1].clone()));
            Some(Batch::Get { keys })
        }
        _ => {
            let mut values = Vec::with_capacity(run + 1);
            values.push(first.args()[2].clone());
            for cmd in followers {
                keys.push(cmd.args()[1].clone());
                values.push(cmd.args()[2].clone());
            }
            Some(Batch::Set { keys, values })
        }
    }
}
