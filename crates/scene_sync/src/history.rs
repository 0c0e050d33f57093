// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history of whole-scene snapshots.
//!
//! Each command records the serialized scene before and after it ran.
//! Undo restores `before`, redo restores `after`.

use crate::engine::CommandSource;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Commands kept for undo
const MAX_HISTORY: usize = 100;

/// Undo/redo failures
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// Snapshot could not be encoded or decoded
    #[error("Snapshot encoding failed: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Result alias for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Serialized scene state (copy-on-write payload)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    data: Vec<u8>,
}

impl StateSnapshot {
    /// Capture a serializable value
    pub fn from_value<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self {
            data: bincode::serialize(value)?,
        })
    }

    /// Restore the captured value
    pub fn to_value<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        Ok(bincode::deserialize(&self.data)?)
    }

    /// Encoded length in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// One undoable command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Label shown in the edit menu
    pub description: String,
    /// Who issued the command
    pub source: CommandSource,
    /// State before the command
    pub before: StateSnapshot,
    /// State after the command
    pub after: StateSnapshot,
}

impl Operation {
    /// Memory held by this operation
    pub fn memory_size(&self) -> usize {
        self.before.size() + self.after.size()
    }
}

/// Bounded undo and redo stacks
#[derive(Debug)]
pub struct History {
    undo_stack: VecDeque<Operation>,
    redo_stack: VecDeque<Operation>,
    max_depth: usize,
    memory_used: usize,
}

impl History {
    /// Empty history with the default depth
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// Empty history keeping at most `max_depth` commands
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_depth,
            memory_used: 0,
        }
    }

    /// Record a finished command
    pub fn commit(&mut self, operation: Operation) {
        if operation.before == operation.after {
            return;
        }

        self.redo_stack.clear();
        self.memory_used += operation.memory_size();
        self.undo_stack.push_back(operation);

        while self.undo_stack.len() > self.max_depth {
            if let Some(old) = self.undo_stack.pop_front() {
                self.memory_used = self.memory_used.saturating_sub(old.memory_size());
            }
        }
    }

    /// Pop the last command for undoing
    pub fn undo(&mut self) -> Result<&Operation> {
        let operation = self.undo_stack.pop_back().ok_or(HistoryError::NothingToUndo)?;
        self.memory_used = self.memory_used.saturating_sub(operation.memory_size());
        self.redo_stack.push_back(operation);
        self.redo_stack.back().ok_or(HistoryError::NothingToUndo)
    }

    /// Pop the last undone command for redoing
    pub fn redo(&mut self) -> Result<&Operation> {
        let operation = self.redo_stack.pop_back().ok_or(HistoryError::NothingToRedo)?;
        self.memory_used += operation.memory_size();
        self.undo_stack.push_back(operation);
        self.undo_stack.back().ok_or(HistoryError::NothingToRedo)
    }

    /// Whether an undo is possible
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Whether a redo is possible
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Description of the next undo
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|op| op.description.as_str())
    }

    /// Description of the next redo
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|op| op.description.as_str())
    }

    /// Bytes held by the undo stack
    pub fn memory_used(&self) -> usize {
        self.memory_used
    }

    /// Forget every recorded command
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.memory_used = 0;
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
