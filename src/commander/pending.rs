//! Identity-keyed pending command table with epoch-based cancellation.

use crate::observer::{Session, TopicRoute};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Identity of a pending command: one slot per session or per route.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum CommandKey {
    Session(Session),
    Route(Session, TopicRoute),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CommandOp {
    CreateSession,
    DeleteSession,
    CreateTopicRoute,
    DeleteTopicRoute,
}

impl CommandOp {
    pub(crate) fn is_create(self) -> bool {
        matches!(self, CommandOp::CreateSession | CommandOp::CreateTopicRoute)
    }
}

struct PendingEntry {
    op: CommandOp,
    epoch: u64,
}

struct PendingState {
    next_epoch: u64,
    entries: HashMap<CommandKey, PendingEntry>,
}

/// At most one pending command exists per identity. Replacing an entry bumps
/// the epoch; a retry task whose epoch no longer matches the table is stale
/// and must drop itself without side effects.
pub(crate) struct PendingCommands {
    state: Mutex<PendingState>,
}

impl PendingCommands {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(PendingState {
                next_epoch: 0,
                entries: HashMap::new(),
            }),
        }
    }

    /// Registers `op` for `key`, superseding any outstanding command, and
    /// returns the epoch owned by the new retry task.
    pub(crate) fn begin(&self, key: CommandKey, op: CommandOp) -> u64 {
        let mut state = self.state.lock().expect("pending table poisoned");
        let epoch = state.next_epoch;
        state.next_epoch += 1;
        if let Some(superseded) = state.entries.insert(key, PendingEntry { op, epoch }) {
            debug!(new = ?op, superseded = ?superseded.op, "pending command superseded");
        }
        epoch
    }

    pub(crate) fn is_current(&self, key: &CommandKey, epoch: u64) -> bool {
        self.state
            .lock()
            .expect("pending table poisoned")
            .entries
            .get(key)
            .map(|entry| entry.epoch == epoch)
            .unwrap_or(false)
    }

    /// Removes the entry when it still belongs to `epoch`. A stale success
    /// (the entry was superseded while the send was in flight) leaves the
    /// table untouched and returns `false`.
    pub(crate) fn complete_if_current(&self, key: &CommandKey, epoch: u64) -> bool {
        let mut state = self.state.lock().expect("pending table poisoned");
        match state.entries.get(key) {
            Some(entry) if entry.epoch == epoch => {
                state.entries.remove(key);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.state
            .lock()
            .expect("pending table poisoned")
            .entries
            .len()
    }
}
