//! Mariposa Canvas Core
//!
//! Platform-agnostic interaction engine for a freeform canvas of cards,
//! images, containers and labels: geometry, snapping, layout, history,
//! clipboard, drag and touch handling.

pub mod align;
pub mod clipboard;
pub mod config;
pub mod containment;
pub mod debounce;
pub mod drag;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod history;
pub mod input;
pub mod item;
pub mod session;
pub mod snap;
pub mod store;

pub use align::{AlignEdge, LayoutPlan};
pub use clipboard::{ClipboardImage, ClipboardPayload, LocalClipboard, NoSystemClipboard, SystemClipboard};
pub use config::EngineConfig;
pub use engine::{CanvasEngine, ContextMenuRequest, ContextTarget, DragStopped, Mutation};
pub use error::{Error, Result};
pub use geometry::{Bounds, bounds};
pub use history::{History, HistoryEntry, HistoryKind, Snapshot};
pub use input::{Instant, Modifiers, MouseButton, TouchPoint};
pub use item::{Item, ItemId, ItemKind};
pub use session::CanvasSession;
pub use snap::{GuideLine, SnapMode, SnapResult, calculate_snap, snap_to_grid, GRID_SIZE};
pub use store::{BoxFuture, ItemFilter, ItemStore, MemoryStore, StoreError};
