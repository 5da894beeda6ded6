//! Canvas item data model.

use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, stable identifier of an item on the canvas.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The closed set of item kinds the canvas knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A note card.
    Card,
    /// A raster image.
    Image,
    /// A frame that visually groups whatever lies inside it.
    Container,
    /// A short free-floating text label.
    Label,
}

impl ItemKind {
    pub const ALL: [ItemKind; 4] = [
        ItemKind::Card,
        ItemKind::Image,
        ItemKind::Container,
        ItemKind::Label,
    ];

    pub fn is_container(self) -> bool {
        self == ItemKind::Container
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Card => "card",
            ItemKind::Image => "image",
            ItemKind::Container => "container",
            ItemKind::Label => "label",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed spatial entity placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub kind: ItemKind,
    /// Top-left corner in world coordinates.
    pub position: Point,
    /// Explicit size; `None` falls back to the kind's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    /// Transient UI flag, never persisted.
    #[serde(skip)]
    pub selected: bool,
    /// Opaque content owned by the persistence collaborator.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, kind: ItemKind, position: Point) -> Self {
        Self {
            id: id.into(),
            kind,
            position,
            size: None,
            selected: false,
            data: serde_json::Value::Null,
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.size = Some(Size::new(width, height));
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }

    /// Position and size must be finite for the item to take part in geometry.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.size.map_or(true, |s| s.is_finite())
    }
}
