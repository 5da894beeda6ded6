//! Async glue between the engine, the item store and the system clipboard.
//!
//! Engine calls are optimistic: the in-memory state changes first and the
//! resulting mutations are persisted afterwards. A failed store call is
//! logged and the affected kinds are reloaded from the store; nothing is
//! retried.

use crate::align::AlignEdge;
use crate::clipboard::{self, PasteSource, SystemClipboard};
use crate::debounce::Debouncer;
use crate::drag::MembershipChange;
use crate::engine::{CanvasEngine, Mutation};
use crate::input::Instant;
use crate::item::{Item, ItemId, ItemKind};
use crate::store::{ItemFilter, ItemStore, StoreResult};
use kurbo::{Point, Size};

/// An engine bound to its store and clipboard.
pub struct CanvasSession<S: ItemStore, C: SystemClipboard> {
    engine: CanvasEngine,
    store: S,
    system: C,
    text: Debouncer<String>,
}

impl<S: ItemStore, C: SystemClipboard> CanvasSession<S, C> {
    pub fn new(engine: CanvasEngine, store: S, system: C) -> Self {
        let text = Debouncer::from_config(engine.config());
        Self {
            engine,
            store,
            system,
            text,
        }
    }

    pub fn engine(&self) -> &CanvasEngine {
        &self.engine
    }

    /// Direct access for transient input (pointer moves, touches, selection).
    pub fn engine_mut(&mut self) -> &mut CanvasEngine {
        &mut self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn system_clipboard(&self) -> &C {
        &self.system
    }

    /// Load every item from the store.
    pub async fn refresh(&mut self) -> StoreResult<()> {
        let items = self.store.list(ItemFilter::all()).await?;
        self.engine.load_items(items);
        Ok(())
    }

    /// Reload the given kinds from the store. Failures are logged.
    pub async fn resync(&mut self, kinds: &[ItemKind]) {
        for &kind in kinds {
            match self.store.list(ItemFilter::kind(kind)).await {
                Ok(items) => {
                    log::warn!("Resynced {} items after a failed update", kind);
                    self.engine.replace_kind(kind, items);
                }
                Err(e) => log::warn!("Failed to resync {} items: {}", kind, e),
            }
        }
    }

    /// Persist mutations. Returns false if any call failed, in which case
    /// the kinds involved have been resynced.
    pub async fn commit(&mut self, mutations: Vec<Mutation>) -> bool {
        let mut failed: Vec<ItemKind> = Vec::new();
        for mutation in &mutations {
            let result = match mutation {
                Mutation::Position { id, position } => self.store.update_position(id, *position).await,
                Mutation::Size { id, size } => self.store.update_size(id, *size).await,
            };
            if let Err(e) = result {
                log::warn!("Failed to persist change to {}: {}", mutation.id(), e);
                if let Some(item) = self.engine.item(mutation.id()) {
                    if !failed.contains(&item.kind) {
                        failed.push(item.kind);
                    }
                }
            }
        }
        if failed.is_empty() {
            return true;
        }
        self.resync(&failed).await;
        false
    }

    // --- Committed operations ---

    /// Finish a pointer drag and persist the moves.
    pub async fn pointer_up(&mut self) -> Option<MembershipChange> {
        let stopped = self.engine.pointer_up();
        self.commit(stopped.mutations).await;
        stopped.membership
    }

    pub async fn align(&mut self, edge: AlignEdge) -> bool {
        let mutations = self.engine.align_selection(edge);
        self.commit(mutations).await
    }

    pub async fn tidy_up(&mut self) -> bool {
        let mutations = self.engine.tidy_up_selection();
        self.commit(mutations).await
    }

    pub async fn resize(&mut self, id: &ItemId, size: Size) -> bool {
        let mutations = self.engine.resize(id, size);
        self.commit(mutations).await
    }

    pub async fn undo(&mut self) -> bool {
        let mutations = self.engine.undo();
        self.commit(mutations).await
    }

    pub async fn redo(&mut self) -> bool {
        let mutations = self.engine.redo();
        self.commit(mutations).await
    }

    // --- Text ---

    /// Apply a text edit locally and queue it for persistence.
    pub fn set_text(&mut self, id: &ItemId, text: &str, now: Instant) {
        if self.engine.set_text(id, text) {
            self.text.schedule(id.clone(), text.to_string(), now);
        }
    }

    /// Persist text edits whose debounce window has elapsed.
    pub async fn flush_due(&mut self, now: Instant) -> usize {
        let due = self.text.take_due(now);
        self.persist_text(due).await
    }

    /// Persist every pending text edit immediately.
    pub async fn flush_all(&mut self) -> usize {
        let pending = self.text.take_all();
        self.persist_text(pending).await
    }

    pub fn next_text_deadline(&self) -> Option<Instant> {
        self.text.next_deadline()
    }

    async fn persist_text(&mut self, edits: Vec<(ItemId, String)>) -> usize {
        let mut written = 0;
        let mut failed = Vec::new();
        for (id, text) in edits {
            match self.store.update_text(&id, &text).await {
                Ok(()) => written += 1,
                Err(e) => {
                    log::warn!("Failed to save text of {}: {}", id, e);
                    if let Some(item) = self.engine.item(&id) {
                        if !failed.contains(&item.kind) {
                            failed.push(item.kind);
                        }
                    }
                }
            }
        }
        if !failed.is_empty() {
            self.resync(&failed).await;
        }
        written
    }

    // --- Clipboard ---

    /// Copy the selection to the system clipboard and the local slot.
    pub async fn copy(&mut self) -> bool {
        let Some(payload) = self.engine.copy_selection() else {
            return false;
        };
        let count = payload.items.len();
        clipboard::write_payload(&self.system, self.engine.local_clipboard_mut(), payload).await;
        log::info!("Copied {} items", count);
        true
    }

    /// Paste from the best available source. `target` defaults to the last
    /// context menu point. Returns the number of items created.
    pub async fn paste(&mut self, target: Option<Point>) -> usize {
        let source = clipboard::read_paste_source(&self.system, self.engine.local_clipboard()).await;
        match source {
            Some(PasteSource::Image(image)) => {
                let position = target
                    .or_else(|| self.engine.last_context_point())
                    .unwrap_or(Point::ZERO);
                match self.store.create(ItemKind::Image, position, image.to_item_data()).await {
                    Ok(item) => {
                        log::info!("Pasted {}x{} image", image.width, image.height);
                        self.engine.insert_items(vec![item]);
                        1
                    }
                    Err(e) => {
                        log::warn!("Failed to create pasted image: {}", e);
                        self.resync(&[ItemKind::Image]).await;
                        0
                    }
                }
            }
            Some(PasteSource::Items(payload)) => {
                let target = target.unwrap_or_else(|| self.engine.paste_target(&payload));
                let requests = self.engine.plan_paste(&payload, target);
                let created = self.run_duplicates(requests).await;
                log::info!("Pasted {} items", created);
                created
            }
            None => {
                log::debug!("Nothing to paste");
                0
            }
        }
    }

    /// Duplicate the selection in place, offset slightly.
    pub async fn duplicate_selection(&mut self) -> usize {
        let requests = self.engine.duplicate_selection();
        self.run_duplicates(requests).await
    }

    async fn run_duplicates(&mut self, requests: Vec<clipboard::DuplicateRequest>) -> usize {
        let mut created: Vec<Item> = Vec::new();
        let mut failed = Vec::new();
        for request in requests {
            match self.store.duplicate(&request.source, request.position).await {
                Ok(Some(item)) => created.push(item),
                Ok(None) => log::debug!("Duplicate source {} no longer exists", request.source),
                Err(e) => {
                    log::warn!("Failed to duplicate {}: {}", request.source, e);
                    if !failed.contains(&request.kind) {
                        failed.push(request.kind);
                    }
                }
            }
        }
        let count = created.len();
        self.engine.insert_items(created);
        if !failed.is_empty() {
            self.resync(&failed).await;
        }
        count
    }

    /// Delete the selection. On failure the removed kinds are reloaded.
    pub async fn delete_selection(&mut self) -> bool {
        let (ids, kinds) = self.engine.delete_selection();
        if ids.is_empty() {
            return true;
        }
        for id in &ids {
            self.text.cancel(id);
        }
        match self.store.delete(&ids).await {
            Ok(()) => {
                log::info!("Deleted {} items", ids.len());
                true
            }
            Err(e) => {
                log::warn!("Failed to delete {} items: {}", ids.len(), e);
                self.resync(&kinds).await;
                false
            }
        }
    }
}
