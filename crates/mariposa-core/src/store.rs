//! Persistence collaborator abstraction.
//!
//! The engine never owns item content. It reads items through
//! [`ItemStore::list`] and pushes geometry, text, duplicate and delete
//! requests back through the other methods.

use crate::item::{Item, ItemId, ItemKind};
use kurbo::{Point, Size};
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Item not found: {0}")]
    NotFound(ItemId),
    #[error("Request rejected: {0}")]
    Rejected(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Store error: {0}")]
    Other(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Which items a `list` call returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub kind: Option<ItemKind>,
}

impl ItemFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn kind(kind: ItemKind) -> Self {
        Self { kind: Some(kind) }
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.kind.map_or(true, |k| k == item.kind)
    }
}

/// Trait for item persistence backends.
///
/// The engine is single-threaded, so implementations need not be `Send`.
pub trait ItemStore {
    /// List items matching the filter.
    fn list(&self, filter: ItemFilter) -> BoxFuture<'_, StoreResult<Vec<Item>>>;

    /// Persist a new top-left position.
    fn update_position(&self, id: &ItemId, position: Point) -> BoxFuture<'_, StoreResult<()>>;

    /// Persist a new size.
    fn update_size(&self, id: &ItemId, size: Size) -> BoxFuture<'_, StoreResult<()>>;

    /// Persist new text content.
    fn update_text(&self, id: &ItemId, text: &str) -> BoxFuture<'_, StoreResult<()>>;

    /// Create a new item.
    fn create(&self, kind: ItemKind, position: Point, data: serde_json::Value) -> BoxFuture<'_, StoreResult<Item>>;

    /// Re-create an item under a fresh id at `position`.
    /// `Ok(None)` when the source no longer exists.
    fn duplicate(&self, id: &ItemId, position: Point) -> BoxFuture<'_, StoreResult<Option<Item>>>;

    /// Delete a batch of items.
    fn delete(&self, ids: &[ItemId]) -> BoxFuture<'_, StoreResult<()>>;
}

/// In-memory store for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<Vec<Item>>,
    /// Number of upcoming mutating calls that will fail.
    failures: AtomicUsize,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<Item>) -> Self {
        Self {
            items: RwLock::new(items),
            failures: AtomicUsize::new(0),
        }
    }

    /// Make the next `count` mutating calls fail with `Rejected`.
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Snapshot of the stored items (synchronous, for hosts and tests).
    pub fn snapshot(&self) -> Vec<Item> {
        self.items.read().map(|items| items.clone()).unwrap_or_default()
    }

    fn check_failure(&self) -> StoreResult<()> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Rejected("injected failure".to_string()));
        }
        Ok(())
    }

    fn with_item<T>(&self, id: &ItemId, f: impl FnOnce(&mut Item) -> T) -> StoreResult<T> {
        self.check_failure()?;
        let mut items = self
            .items
            .write()
            .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))?;
        let item = items
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(f(item))
    }
}

impl ItemStore for MemoryStore {
    fn list(&self, filter: ItemFilter) -> BoxFuture<'_, StoreResult<Vec<Item>>> {
        Box::pin(async move {
            let items = self
                .items
                .read()
                .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))?;
            Ok(items.iter().filter(|item| filter.matches(item)).cloned().collect())
        })
    }

    fn update_position(&self, id: &ItemId, position: Point) -> BoxFuture<'_, StoreResult<()>> {
        let id = id.clone();
        Box::pin(async move { self.with_item(&id, |item| item.position = position) })
    }

    fn update_size(&self, id: &ItemId, size: Size) -> BoxFuture<'_, StoreResult<()>> {
        let id = id.clone();
        Box::pin(async move { self.with_item(&id, |item| item.size = Some(size)) })
    }

    fn update_text(&self, id: &ItemId, text: &str) -> BoxFuture<'_, StoreResult<()>> {
        let id = id.clone();
        let text = text.to_string();
        Box::pin(async move {
            self.with_item(&id, |item| {
                if !item.data.is_object() {
                    item.data = serde_json::json!({});
                }
                item.data["text"] = serde_json::Value::String(text);
            })
        })
    }

    fn create(&self, kind: ItemKind, position: Point, data: serde_json::Value) -> BoxFuture<'_, StoreResult<Item>> {
        Box::pin(async move {
            self.check_failure()?;
            let item = Item::new(ItemId::generate(), kind, position).with_data(data);
            let mut items = self
                .items
                .write()
                .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))?;
            items.push(item.clone());
            Ok(item)
        })
    }

    fn duplicate(&self, id: &ItemId, position: Point) -> BoxFuture<'_, StoreResult<Option<Item>>> {
        let id = id.clone();
        Box::pin(async move {
            self.check_failure()?;
            let mut items = self
                .items
                .write()
                .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))?;
            let Some(source) = items.iter().find(|item| item.id == id) else {
                return Ok(None);
            };
            let mut copy = source.clone();
            copy.id = ItemId::generate();
            copy.position = position;
            copy.selected = false;
            items.push(copy.clone());
            Ok(Some(copy))
        })
    }

    fn delete(&self, ids: &[ItemId]) -> BoxFuture<'_, StoreResult<()>> {
        let ids = ids.to_vec();
        Box::pin(async move {
            self.check_failure()?;
            let mut items = self
                .items
                .write()
                .map_err(|e| StoreError::Other(format!("Lock error: {}", e)))?;
            items.retain(|item| !ids.contains(&item.id));
            Ok(())
        })
    }
}
