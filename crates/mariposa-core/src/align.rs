//! Batch layout of a multi-item selection: edge alignment and tidy-up.
//!
//! Functions here are pure. They return a [`LayoutPlan`] listing the new
//! top-left of every item that actually moves; the engine turns a plan into
//! one history entry and the matching position mutations.

use crate::geometry::{self, Bounds};
use crate::item::{Item, ItemId};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Edge or center line that a selection can be aligned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignEdge {
    Left,
    Right,
    Top,
    Bottom,
    /// Share the union box's vertical center line (x axis moves).
    CenterHorizontal,
    /// Share the union box's horizontal center line (y axis moves).
    CenterVertical,
}

impl AlignEdge {
    pub fn description(self) -> &'static str {
        match self {
            AlignEdge::Left => "Align left",
            AlignEdge::Right => "Align right",
            AlignEdge::Top => "Align top",
            AlignEdge::Bottom => "Align bottom",
            AlignEdge::CenterHorizontal => "Align centers horizontally",
            AlignEdge::CenterVertical => "Align centers vertically",
        }
    }
}

/// New positions for the items that move.
pub type LayoutPlan = Vec<(ItemId, Point)>;

/// Align every item to the shared edge of the selection.
/// Selections of fewer than two items produce an empty plan.
pub fn align(items: &[&Item], edge: AlignEdge) -> LayoutPlan {
    if items.len() < 2 {
        return Vec::new();
    }
    let all: Vec<Bounds> = items.iter().map(|item| geometry::bounds(item)).collect();
    let Some(union) = geometry::union_bounds(items.iter().copied()) else {
        return Vec::new();
    };

    let mut plan = Vec::new();
    for (item, b) in items.iter().zip(&all) {
        let target = match edge {
            AlignEdge::Left => Point::new(union.left, b.top),
            AlignEdge::Right => Point::new(union.right - b.width(), b.top),
            AlignEdge::Top => Point::new(b.left, union.top),
            AlignEdge::Bottom => Point::new(b.left, union.bottom - b.height()),
            AlignEdge::CenterHorizontal => Point::new(union.center_x - b.width() / 2.0, b.top),
            AlignEdge::CenterVertical => Point::new(b.left, union.center_y - b.height() / 2.0),
        };
        if target != item.position {
            plan.push((item.id.clone(), target));
        }
    }
    plan
}

/// Reflow the selection into a grid inside its current bounding box.
///
/// Items are ordered by coarse row bucket (`floor(y / row_bucket)`) then by
/// x. Column pitch is the widest item plus `gap`; each row is as tall as its
/// tallest item so rows never overlap.
pub fn tidy_up(items: &[&Item], gap: f64, row_bucket: f64) -> LayoutPlan {
    if items.len() < 2 {
        return Vec::new();
    }
    let Some(union) = geometry::union_bounds(items.iter().copied()) else {
        return Vec::new();
    };

    let mut ordered: Vec<(&Item, Bounds)> = items.iter().map(|item| (*item, geometry::bounds(item))).collect();
    ordered.sort_by(|(a, ab), (b, bb)| {
        let row_a = (a.position.y / row_bucket).floor();
        let row_b = (b.position.y / row_bucket).floor();
        row_a.total_cmp(&row_b).then(ab.left.total_cmp(&bb.left))
    });

    let max_width = ordered.iter().map(|(_, b)| b.width()).fold(0.0, f64::max);
    let columns = (((union.width() + gap) / (max_width + gap)).floor() as usize).max(1);

    let mut plan = Vec::new();
    let mut row_top = union.top;
    for row in ordered.chunks(columns) {
        let row_height = row.iter().map(|(_, b)| b.height()).fold(0.0, f64::max);
        for (col, (item, _)) in row.iter().enumerate() {
            let target = Point::new(union.left + col as f64 * (max_width + gap), row_top);
            if target != item.position {
                plan.push((item.id.clone(), target));
            }
        }
        row_top += row_height + gap;
    }
    plan
}
