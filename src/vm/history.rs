//! Trailing execution trace.
//!
//! Keeps the last [`HISTORY_CAPACITY`] rows the engine executed together
//! with the write each one made. Purely diagnostic: a fatal
//! [`TapeError`](crate::vm::TapeError) carries a copy for postmortems.

use std::collections::VecDeque;
use std::fmt;
use crate::vm::decode::Row;
use serde::{Serialize, Deserialize};

/// Number of rows retained.
pub const HISTORY_CAPACITY: usize = 9;

/// Cells stored by one instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteEffect {
    pub address: usize,
    pub bytes: Vec<u8>,
}

/// One executed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub ip: usize,
    pub row: Row,
    pub write: Option<WriteEffect>,
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04} {}", self.ip, self.row)?;
        if let Some(write) = &self.write {
            write!(f, "  [{:04}] <- {:?}", write.address, write.bytes)?;
        }
        Ok(())
    }
}

/// Bounded FIFO of executed rows, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Append a freshly fetched row, evicting the oldest entry when full.
    pub fn record(&mut self, ip: usize, row: Row) {
        if self.entries.len() == HISTORY_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry { ip, row, write: None });
    }

    /// Attach a write to the newest entry.
    pub fn attach_write(&mut self, effect: WriteEffect) {
        if let Some(entry) = self.entries.back_mut() {
            entry.write = Some(effect);
        }
    }

    /// Most recently executed row.
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Number of entries held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Copy of the entries, oldest first.
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }
}
