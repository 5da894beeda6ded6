//! Per-item debounce window for text edits.
//!
//! Every keystroke restarts the item's window and replaces the pending
//! value, so only the latest text is persisted once the user pauses.

use crate::config::EngineConfig;
use crate::input::Instant;
use crate::item::ItemId;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Pending<T> {
    value: T,
    deadline: Instant,
}

/// Collects values per item and releases each one after a quiet period.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    window: Duration,
    pending: HashMap<ItemId, Pending<T>>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.text_debounce())
    }

    /// Get the debounce window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Queue `value` for `id`, replacing any pending value and restarting
    /// the window.
    pub fn schedule(&mut self, id: ItemId, value: T, now: Instant) {
        let deadline = now + self.window;
        self.pending.insert(id, Pending { value, deadline });
    }

    /// Remove and return every value whose window has elapsed.
    pub fn take_due(&mut self, now: Instant) -> Vec<(ItemId, T)> {
        let due: Vec<ItemId> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();
        due.into_iter()
            .filter_map(|id| self.pending.remove(&id).map(|p| (id, p.value)))
            .collect()
    }

    /// Remove and return everything pending, due or not.
    pub fn take_all(&mut self) -> Vec<(ItemId, T)> {
        self.pending.drain().map(|(id, p)| (id, p.value)).collect()
    }

    /// Drop the pending value for `id` (e.g. the item was deleted).
    pub fn cancel(&mut self, id: &ItemId) -> Option<T> {
        self.pending.remove(id).map(|p| p.value)
    }

    /// The earliest deadline, for hosts that want to arm a single timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    pub fn is_pending(&self, id: &ItemId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
