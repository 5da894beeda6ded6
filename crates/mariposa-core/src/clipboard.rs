//! Copy/paste protocol for canvas items.
//!
//! Copying serializes the selection to a [`ClipboardPayload`] and writes it
//! both to the system clipboard (best effort) and to a [`LocalClipboard`]
//! slot owned by the engine. Pasting never copies item content directly:
//! it plans one [`DuplicateRequest`] per copied item and the persistence
//! collaborator re-creates each item under a fresh id.

use crate::item::{Item, ItemId, ItemKind};
use crate::store::BoxFuture;
use base64::Engine as _;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Clipboard errors.
#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("Clipboard is empty")]
    Empty,
    #[error("Malformed clipboard payload: {0}")]
    Malformed(String),
    #[error("Unrecognized clipboard payload kind: {0}")]
    UnknownKind(String),
}

/// Result type for clipboard operations.
pub type ClipboardResult<T> = Result<T, ClipboardError>;

/// Marker written into every payload so foreign clipboard text is ignored.
pub const PAYLOAD_KIND: &str = "canvas-items";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadKind {
    #[serde(rename = "canvas-items")]
    CanvasItems,
}

/// One copied item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardItem {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub position: Point,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Portable description of a copied selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardPayload {
    pub kind: PayloadKind,
    pub items: Vec<ClipboardItem>,
    /// Top-left of the copied items' positions at copy time.
    pub origin: Point,
}

impl ClipboardPayload {
    /// Build a payload from the selected items. `None` when nothing is selected.
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a Item>) -> Option<Self> {
        let items: Vec<ClipboardItem> = items
            .into_iter()
            .map(|item| ClipboardItem {
                id: item.id.clone(),
                kind: item.kind,
                position: item.position,
                data: item.data.clone(),
            })
            .collect();
        if items.is_empty() {
            return None;
        }
        let origin = items.iter().fold(Point::new(f64::INFINITY, f64::INFINITY), |acc, item| {
            Point::new(acc.x.min(item.position.x), acc.y.min(item.position.y))
        });
        Some(Self {
            kind: PayloadKind::CanvasItems,
            items,
            origin,
        })
    }

    /// Serialize to the clipboard text form.
    pub fn to_text(&self) -> ClipboardResult<String> {
        serde_json::to_string(self).map_err(|e| ClipboardError::Malformed(e.to_string()))
    }

    /// Parse clipboard text. Anything that is not JSON, or JSON with a
    /// different `kind`, is rejected.
    pub fn parse(text: &str) -> ClipboardResult<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| ClipboardError::Malformed(e.to_string()))?;
        match value.get("kind").and_then(|k| k.as_str()) {
            Some(PAYLOAD_KIND) => {}
            Some(other) => return Err(ClipboardError::UnknownKind(other.to_string())),
            None => return Err(ClipboardError::UnknownKind("<missing>".to_string())),
        }
        serde_json::from_value(value).map_err(|e| ClipboardError::Malformed(e.to_string()))
    }
}

/// A request to duplicate one item at a new position.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateRequest {
    pub source: ItemId,
    pub kind: ItemKind,
    pub position: Point,
}

/// Plan a paste of `payload` so its origin lands on `target`.
pub fn plan_paste(payload: &ClipboardPayload, target: Point) -> Vec<DuplicateRequest> {
    let offset: Vec2 = target - payload.origin;
    payload
        .items
        .iter()
        .map(|item| DuplicateRequest {
            source: item.id.clone(),
            kind: item.kind,
            position: item.position + offset,
        })
        .collect()
}

/// Process-local fallback clipboard. Owned by one engine, so two canvases in
/// the same process never see each other's copies.
#[derive(Debug, Clone, Default)]
pub struct LocalClipboard {
    slot: Option<ClipboardPayload>,
    /// The last system write failed, so any payload the system clipboard
    /// holds is older than `slot`.
    system_stale: bool,
}

impl LocalClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, payload: ClipboardPayload) {
        self.slot = Some(payload);
    }

    pub fn get(&self) -> Option<&ClipboardPayload> {
        self.slot.as_ref()
    }

    pub fn clear(&mut self) {
        self.slot = None;
        self.system_stale = false;
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    /// True when the system clipboard missed the latest copy.
    pub fn is_system_stale(&self) -> bool {
        self.system_stale
    }
}

/// A raster image read from the system clipboard, PNG encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipboardImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl ClipboardImage {
    /// Item data for an image created from this clipboard image.
    pub fn to_item_data(&self) -> serde_json::Value {
        serde_json::json!({
            "format": "png",
            "width": self.width,
            "height": self.height,
            "data": base64::engine::general_purpose::STANDARD.encode(&self.png),
        })
    }
}

/// Platform clipboard access. Platform clipboard APIs are promise based, so
/// every call is async.
pub trait SystemClipboard {
    /// Replace the clipboard text.
    fn write_text(&self, text: String) -> BoxFuture<'_, ClipboardResult<()>>;

    /// Read the clipboard text.
    fn read_text(&self) -> BoxFuture<'_, ClipboardResult<String>>;

    /// Read an image, `Ok(None)` when the clipboard holds no image.
    fn read_image(&self) -> BoxFuture<'_, ClipboardResult<Option<ClipboardImage>>>;
}

/// A system clipboard that is never available, e.g. a restricted mobile
/// context. Only the local fallback slot is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSystemClipboard;

impl SystemClipboard for NoSystemClipboard {
    fn write_text(&self, _text: String) -> BoxFuture<'_, ClipboardResult<()>> {
        Box::pin(async { Err(ClipboardError::Unavailable("no system clipboard".to_string())) })
    }

    fn read_text(&self) -> BoxFuture<'_, ClipboardResult<String>> {
        Box::pin(async { Err(ClipboardError::Unavailable("no system clipboard".to_string())) })
    }

    fn read_image(&self) -> BoxFuture<'_, ClipboardResult<Option<ClipboardImage>>> {
        Box::pin(async { Err(ClipboardError::Unavailable("no system clipboard".to_string())) })
    }
}

/// What a paste resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum PasteSource {
    Image(ClipboardImage),
    Items(ClipboardPayload),
}

/// Write a payload to the local slot and, best effort, to the system clipboard.
pub async fn write_payload(system: &dyn SystemClipboard, local: &mut LocalClipboard, payload: ClipboardPayload) {
    let written = match payload.to_text() {
        Ok(text) => match system.write_text(text).await {
            Ok(()) => true,
            Err(e) => {
                log::debug!("System clipboard write failed, keeping local copy only: {}", e);
                false
            }
        },
        Err(e) => {
            log::warn!("Failed to serialize clipboard payload: {}", e);
            false
        }
    };
    local.set(payload);
    local.system_stale = !written;
}

/// Resolve what to paste: a system image, then a payload in the system
/// text, then the local fallback. Malformed or foreign data falls through.
/// A canvas payload in the system text loses to the local slot when the
/// last system write failed, since it predates the local copy.
pub async fn read_paste_source(system: &dyn SystemClipboard, local: &LocalClipboard) -> Option<PasteSource> {
    match system.read_image().await {
        Ok(Some(image)) => return Some(PasteSource::Image(image)),
        Ok(None) => {}
        Err(e) => log::debug!("No clipboard image: {}", e),
    }

    match system.read_text().await {
        Ok(text) => match ClipboardPayload::parse(&text) {
            Ok(payload) if local.system_stale && local.slot.as_ref().is_some_and(|newer| newer != &payload) => {
                log::debug!("System clipboard payload is older than the local copy");
            }
            Ok(payload) => return Some(PasteSource::Items(payload)),
            Err(e) => log::debug!("Ignoring clipboard text: {}", e),
        },
        Err(e) => log::debug!("No clipboard text: {}", e),
    }

    local.get().cloned().map(PasteSource::Items)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;

    pub(crate) fn block_on<F: std::future::Future>(f: F) -> F::Output {
        // Simple blocking executor for tests
        use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

        fn dummy_raw_waker() -> RawWaker {
            fn no_op(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                dummy_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }

        let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
        let mut cx = Context::from_waker(&waker);
        let mut f = std::pin::pin!(f);

        loop {
            match f.as_mut().poll(&mut cx) {
                Poll::Ready(result) => return result,
                Poll::Pending => {}
            }
        }
    }

    /// In-memory stand-in for the platform clipboard.
    #[derive(Default)]
    pub(crate) struct FakeClipboard {
        pub text: RefCell<Option<String>>,
        pub image: RefCell<Option<ClipboardImage>>,
    }

    impl SystemClipboard for FakeClipboard {
        fn write_text(&self, text: String) -> BoxFuture<'_, ClipboardResult<()>> {
            *self.text.borrow_mut() = Some(text);
            Box::pin(async { Ok(()) })
        }

        fn read_text(&self) -> BoxFuture<'_, ClipboardResult<String>> {
            let text = self.text.borrow().clone();
            Box::pin(async move { text.ok_or(ClipboardError::Empty) })
        }

        fn read_image(&self) -> BoxFuture<'_, ClipboardResult<Option<ClipboardImage>>> {
            let image = self.image.borrow().clone();
            Box::pin(async move { Ok(image) })
        }
    }

    /// Accepts the first write and refuses every later one.
    #[derive(Default)]
    struct WriteOnceClipboard {
        inner: FakeClipboard,
        writes: std::cell::Cell<usize>,
    }

    impl SystemClipboard for WriteOnceClipboard {
        fn write_text(&self, text: String) -> BoxFuture<'_, ClipboardResult<()>> {
            let n = self.writes.get();
            self.writes.set(n + 1);
            if n == 0 {
                return self.inner.write_text(text);
            }
            Box::pin(async { Err(ClipboardError::Unavailable("write denied".to_string())) })
        }

        fn read_text(&self) -> BoxFuture<'_, ClipboardResult<String>> {
            self.inner.read_text()
        }

        fn read_image(&self) -> BoxFuture<'_, ClipboardResult<Option<ClipboardImage>>> {
            self.inner.read_image()
        }
    }

    fn item(id: &str, x: f64, y: f64) -> Item {
        Item::new(id, ItemKind::Card, Point::new(x, y))
    }

    #[test]
    fn test_origin_is_min_corner() {
        let items = [item("a", 30.0, 10.0), item("b", 10.0, 40.0)];
        let payload = ClipboardPayload::from_items(&items).unwrap();
        assert_eq!(payload.origin, Point::new(10.0, 10.0));
        assert_eq!(payload.items.len(), 2);
    }

    #[test]
    fn test_empty_selection_has_no_payload() {
        assert!(ClipboardPayload::from_items(std::iter::empty::<&Item>()).is_none());
    }

    #[test]
    fn test_paste_offsets_every_item() {
        let items = [item("a", 10.0, 10.0), item("b", 50.0, 20.0), item("c", 10.0, 90.0)];
        let payload = ClipboardPayload::from_items(&items).unwrap();
        let requests = plan_paste(&payload, Point::new(110.0, 60.0));

        assert_eq!(requests.len(), 3);
        for (request, original) in requests.iter().zip(&items) {
            assert_eq!(request.source, original.id);
            assert_eq!(request.position - original.position, Vec2::new(100.0, 50.0));
        }
    }

    #[test]
    fn test_text_format() {
        let items = [item("a", 1.0, 2.0)];
        let text = ClipboardPayload::from_items(&items).unwrap().to_text().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["kind"], "canvas-items");
        assert_eq!(value["items"][0]["type"], "card");
        assert_eq!(value["origin"]["x"], 1.0);
        assert_eq!(ClipboardPayload::parse(&text).unwrap().items[0].id, ItemId::from("a"));
    }

    #[test]
    fn test_parse_rejects_foreign_text() {
        assert!(matches!(ClipboardPayload::parse("hello"), Err(ClipboardError::Malformed(_))));
        assert!(matches!(
            ClipboardPayload::parse(r#"{"kind":"shapes","items":[]}"#),
            Err(ClipboardError::UnknownKind(_))
        ));
        assert!(matches!(ClipboardPayload::parse(r#"{"items":[]}"#), Err(ClipboardError::UnknownKind(_))));
    }

    #[test]
    fn test_write_payload_fills_both_slots() {
        let system = FakeClipboard::default();
        let mut local = LocalClipboard::new();
        let payload = ClipboardPayload::from_items(&[item("a", 0.0, 0.0)]).unwrap();
        block_on(write_payload(&system, &mut local, payload.clone()));

        assert_eq!(local.get(), Some(&payload));
        let text = system.text.borrow().clone().unwrap();
        assert_eq!(ClipboardPayload::parse(&text).unwrap(), payload);
    }

    #[test]
    fn test_write_survives_unavailable_system_clipboard() {
        let mut local = LocalClipboard::new();
        let payload = ClipboardPayload::from_items(&[item("a", 0.0, 0.0)]).unwrap();
        block_on(write_payload(&NoSystemClipboard, &mut local, payload));
        assert!(!local.is_empty());
    }

    #[test]
    fn test_image_takes_priority() {
        let system = FakeClipboard::default();
        let payload = ClipboardPayload::from_items(&[item("a", 0.0, 0.0)]).unwrap();
        *system.text.borrow_mut() = Some(payload.to_text().unwrap());
        let image = ClipboardImage { width: 2, height: 2, png: vec![1, 2, 3] };
        *system.image.borrow_mut() = Some(image.clone());

        let source = block_on(read_paste_source(&system, &LocalClipboard::new()));
        assert_eq!(source, Some(PasteSource::Image(image)));
    }

    #[test]
    fn test_system_text_before_local_fallback() {
        let system = FakeClipboard::default();
        let from_system = ClipboardPayload::from_items(&[item("sys", 0.0, 0.0)]).unwrap();
        *system.text.borrow_mut() = Some(from_system.to_text().unwrap());
        let mut local = LocalClipboard::new();
        local.set(ClipboardPayload::from_items(&[item("local", 0.0, 0.0)]).unwrap());

        let source = block_on(read_paste_source(&system, &local));
        assert_eq!(source, Some(PasteSource::Items(from_system)));
    }

    #[test]
    fn test_malformed_text_falls_back_to_local() {
        let system = FakeClipboard::default();
        *system.text.borrow_mut() = Some("{ broken".to_string());
        let mut local = LocalClipboard::new();
        let payload = ClipboardPayload::from_items(&[item("local", 0.0, 0.0)]).unwrap();
        local.set(payload.clone());

        let source = block_on(read_paste_source(&system, &local));
        assert_eq!(source, Some(PasteSource::Items(payload)));
    }

    #[test]
    fn test_nothing_to_paste() {
        let source = block_on(read_paste_source(&NoSystemClipboard, &LocalClipboard::new()));
        assert!(source.is_none());
    }

    #[test]
    fn test_image_item_data_is_base64() {
        let image = ClipboardImage { width: 4, height: 3, png: b"png".to_vec() };
        let data = image.to_item_data();
        assert_eq!(data["width"], 4);
        assert_eq!(data["data"], "cG5n");
    }

    #[test]
    fn test_failed_write_prefers_newer_local_copy() {
        let system = WriteOnceClipboard::default();
        let mut local = LocalClipboard::new();
        let first = ClipboardPayload::from_items(&[item("first", 0.0, 0.0)]).unwrap();
        let second = ClipboardPayload::from_items(&[item("second", 0.0, 0.0)]).unwrap();

        block_on(write_payload(&system, &mut local, first));
        assert!(!local.is_system_stale());
        block_on(write_payload(&system, &mut local, second.clone()));
        assert!(local.is_system_stale());

        let source = block_on(read_paste_source(&system, &local));
        assert_eq!(source, Some(PasteSource::Items(second)));
    }

    #[test]
    fn test_successful_write_clears_stale_flag() {
        let system = FakeClipboard::default();
        let mut local = LocalClipboard::new();
        block_on(write_payload(&NoSystemClipboard, &mut local, ClipboardPayload::from_items(&[item("a", 0.0, 0.0)]).unwrap()));
        assert!(local.is_system_stale());
        block_on(write_payload(&system, &mut local, ClipboardPayload::from_items(&[item("b", 0.0, 0.0)]).unwrap()));
        assert!(!local.is_system_stale());
    }
}
