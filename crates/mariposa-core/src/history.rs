//! Undo/redo history of position and size changes.

use crate::config::HISTORY_CAPACITY;
use crate::item::ItemId;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

/// What kind of change a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Move,
    Resize,
    /// Reserved: deletes are not undoable yet, so no entry carries this kind.
    Delete,
    /// Reserved: pastes and duplicates are not undoable yet.
    Create,
}

/// Geometry of one item at one moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: ItemId,
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
}

impl Snapshot {
    pub fn position(id: ItemId, position: Point) -> Self {
        Self { id, position, size: None }
    }

    pub fn with_size(id: ItemId, position: Point, size: Size) -> Self {
        Self {
            id,
            position,
            size: Some(size),
        }
    }
}

/// A reversible record of a batch of geometry changes.
///
/// `before` and `after` are index-aligned by id. Entries are never mutated
/// once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub kind: HistoryKind,
    pub description: String,
    pub before: Vec<Snapshot>,
    pub after: Vec<Snapshot>,
}

impl HistoryEntry {
    pub fn new(kind: HistoryKind, description: impl Into<String>, before: Vec<Snapshot>, after: Vec<Snapshot>) -> Self {
        debug_assert_eq!(before.len(), after.len(), "history snapshots must be index-aligned");
        debug_assert!(
            before.iter().zip(&after).all(|(b, a)| b.id == a.id),
            "history snapshots must be index-aligned"
        );
        Self {
            kind,
            description: description.into(),
            before,
            after,
        }
    }

    /// True when applying the entry would change nothing.
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }

    /// Ids touched by this entry.
    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.after.iter().map(|s| &s.id)
    }
}

/// A batch being accumulated between `start_batch` and `end_batch`.
#[derive(Debug, Clone)]
struct PendingBatch {
    kind: HistoryKind,
    description: String,
    before: Vec<Snapshot>,
}

/// Linear undo/redo stacks with a fixed capacity.
#[derive(Debug, Clone)]
pub struct History {
    /// Undoable entries (most recent last).
    past: Vec<HistoryEntry>,
    /// Redoable entries (most recent last).
    future: Vec<HistoryEntry>,
    capacity: usize,
    batch: Option<PendingBatch>,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            past: Vec::new(),
            future: Vec::new(),
            capacity: capacity.max(1),
            batch: None,
        }
    }

    /// Record a new entry. Clears the redo stack and drops the oldest entry
    /// past capacity. No-op entries are rejected; returns whether it was kept.
    pub fn push(&mut self, entry: HistoryEntry) -> bool {
        if entry.is_noop() {
            log::debug!("Skipping no-op history entry: {}", entry.description);
            return false;
        }

        self.past.push(entry);
        self.future.clear();

        while self.past.len() > self.capacity {
            self.past.remove(0);
        }
        true
    }

    /// Step back. The caller applies the returned entry's `before` snapshots.
    pub fn undo(&mut self) -> Option<HistoryEntry> {
        let entry = self.past.pop()?;
        self.future.push(entry.clone());
        Some(entry)
    }

    /// Step forward. The caller applies the returned entry's `after` snapshots.
    pub fn redo(&mut self) -> Option<HistoryEntry> {
        let entry = self.future.pop()?;
        self.past.push(entry.clone());
        Some(entry)
    }

    /// Begin a batch; `before` is the state prior to the batched changes.
    /// A batch already in progress is discarded.
    pub fn start_batch(&mut self, kind: HistoryKind, description: impl Into<String>, before: Vec<Snapshot>) {
        if self.batch.is_some() {
            log::warn!("Starting a history batch while another is open; discarding the old one");
        }
        self.batch = Some(PendingBatch {
            kind,
            description: description.into(),
            before,
        });
    }

    /// Finish the open batch with the final state of the same ids, in the
    /// same order. Ids missing from either side are dropped.
    /// Returns true if an entry was pushed.
    pub fn end_batch(&mut self, after: Vec<Snapshot>) -> bool {
        let Some(batch) = self.batch.take() else {
            return false;
        };
        let before: Vec<Snapshot> = batch
            .before
            .into_iter()
            .filter(|b| after.iter().any(|a| a.id == b.id))
            .collect();
        let after: Vec<Snapshot> = after
            .into_iter()
            .filter(|a| before.iter().any(|b| b.id == a.id))
            .collect();
        if before.is_empty() {
            return false;
        }
        self.push(HistoryEntry::new(batch.kind, batch.description, before, after))
    }

    /// Drop the open batch without recording anything.
    pub fn cancel_batch(&mut self) {
        self.batch = None;
    }

    pub fn in_batch(&self) -> bool {
        self.batch.is_some()
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.past.len()
    }

    pub fn redo_count(&self) -> usize {
        self.future.len()
    }

    /// Description of the entry `undo` would revert.
    pub fn peek_undo(&self) -> Option<&HistoryEntry> {
        self.past.last()
    }

    /// Description of the entry `redo` would re-apply.
    pub fn peek_redo(&self) -> Option<&HistoryEntry> {
        self.future.last()
    }

    /// Clear all history.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
        self.batch = None;
    }
}
