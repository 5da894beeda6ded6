//! Axis-aligned bounds of canvas items.
//!
//! Every other module asks this one how big an item is, so snapping,
//! alignment and containment never disagree about extents.

use crate::item::{Item, ItemKind};
use kurbo::{Point, Rect, Size};

/// Fallback size of a card.
pub const CARD_SIZE: Size = Size::new(200.0, 283.0);
/// Fallback size of an image.
pub const IMAGE_SIZE: Size = Size::new(240.0, 180.0);
/// Fallback size of a container.
pub const CONTAINER_SIZE: Size = Size::new(400.0, 300.0);
/// Fallback size of a label.
pub const LABEL_SIZE: Size = Size::new(160.0, 40.0);

/// Size used for an item of `kind` that has no explicit size.
pub fn default_size(kind: ItemKind) -> Size {
    match kind {
        ItemKind::Card => CARD_SIZE,
        ItemKind::Image => IMAGE_SIZE,
        ItemKind::Container => CONTAINER_SIZE,
        ItemKind::Label => LABEL_SIZE,
    }
}

/// Effective size of an item.
pub fn item_size(item: &Item) -> Size {
    item.size.unwrap_or_else(|| default_size(item.kind))
}

/// Edges and center of an item in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub center_x: f64,
    pub center_y: f64,
}

impl Bounds {
    /// Bounds of a box with the given top-left corner and size.
    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self {
            left: origin.x,
            right: origin.x + size.width,
            top: origin.y,
            bottom: origin.y + size.height,
            center_x: origin.x + size.width / 2.0,
            center_y: origin.y + size.height / 2.0,
        }
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self::from_origin_size(rect.origin(), rect.size())
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.right, self.bottom)
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Point {
        Point::new(self.center_x, self.center_y)
    }

    /// Inclusive on every edge.
    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.top && point.y <= self.bottom
    }

    /// The same box moved so its top-left sits at `origin`.
    pub fn moved_to(&self, origin: Point) -> Self {
        Self::from_origin_size(origin, Size::new(self.width(), self.height()))
    }
}

/// Bounds of an item from its position and effective size.
pub fn bounds(item: &Item) -> Bounds {
    Bounds::from_origin_size(item.position, item_size(item))
}

/// Bounding box of a set of items, `None` when empty.
pub fn union_bounds<'a>(items: impl IntoIterator<Item = &'a Item>) -> Option<Bounds> {
    let mut result: Option<Rect> = None;
    for item in items {
        let rect = bounds(item).to_rect();
        result = Some(match result {
            Some(r) => r.union(rect),
            None => rect,
        });
    }
    result.map(Bounds::from_rect)
}
