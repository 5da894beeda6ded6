//! Snap functionality for aligning a dragged item to its neighbours and to the grid.

use crate::geometry::{self, Bounds};
use crate::item::{Item, ItemId};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Grid size for snapping (matches the visual grid).
pub const GRID_SIZE: f64 = 20.0;

/// Snap mode for aligning items to the grid or to other items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SnapMode {
    /// No snapping.
    None,
    /// Snap edges and centers to other items, showing guide lines.
    #[default]
    Guides,
    /// Snap the top-left corner to grid intersections.
    Grid,
    /// Guides first, grid on whichever axis guides left alone.
    All,
}

impl SnapMode {
    /// Cycle to the next snap mode.
    pub fn next(self) -> Self {
        match self {
            SnapMode::None => SnapMode::Guides,
            SnapMode::Guides => SnapMode::Grid,
            SnapMode::Grid => SnapMode::All,
            SnapMode::All => SnapMode::None,
        }
    }

    /// Check if grid snapping is enabled.
    pub fn snaps_to_grid(self) -> bool {
        matches!(self, SnapMode::Grid | SnapMode::All)
    }

    /// Check if guide snapping is enabled.
    pub fn snaps_to_guides(self) -> bool {
        matches!(self, SnapMode::Guides | SnapMode::All)
    }

    /// Check if any snapping is enabled.
    pub fn is_enabled(self) -> bool {
        self != SnapMode::None
    }
}

/// Direction of a guide line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Constant x, drawn from `start` to `end` along y.
    Vertical,
    /// Constant y, drawn from `start` to `end` along x.
    Horizontal,
}

/// An alignment line shown while a snap is active. World coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuideLine {
    pub orientation: Orientation,
    /// x for vertical guides, y for horizontal ones.
    pub position: f64,
    pub start: f64,
    pub end: f64,
}

/// Result of a snap operation.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapResult {
    /// The snapped top-left position.
    pub position: Point,
    /// Guides explaining the snap, at most one per axis.
    pub guides: Vec<GuideLine>,
    /// Whether the X coordinate was snapped.
    pub snapped_x: bool,
    /// Whether the Y coordinate was snapped.
    pub snapped_y: bool,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(position: Point) -> Self {
        Self {
            position,
            guides: Vec::new(),
            snapped_x: false,
            snapped_y: false,
        }
    }

    /// Check if any snapping occurred.
    pub fn is_snapped(&self) -> bool {
        self.snapped_x || self.snapped_y
    }
}

/// One axis of a box: low edge, high edge, center.
#[derive(Clone, Copy)]
struct Span {
    lo: f64,
    hi: f64,
    center: f64,
}

/// An axis match: new low edge for the moving box and where the guide sits.
#[derive(Clone, Copy)]
struct AxisMatch {
    origin: f64,
    line: f64,
    other: Bounds,
}

/// Edge pairs in priority order: lo-lo, hi-hi, lo-hi, hi-lo, center-center.
fn match_axis(moving: Span, other: Span, threshold: f64) -> Option<(f64, f64)> {
    let size = moving.hi - moving.lo;
    let pairs = [
        (moving.lo, other.lo, other.lo),
        (moving.hi, other.hi, other.hi - size),
        (moving.lo, other.hi, other.hi),
        (moving.hi, other.lo, other.lo - size),
        (moving.center, other.center, other.center - size / 2.0),
    ];
    pairs
        .into_iter()
        .find(|(m, o, _)| (m - o).abs() < threshold)
        .map(|(_, line, origin)| (origin, line))
}

fn x_span(b: &Bounds) -> Span {
    Span { lo: b.left, hi: b.right, center: b.center_x }
}

fn y_span(b: &Bounds) -> Span {
    Span { lo: b.top, hi: b.bottom, center: b.center_y }
}

/// Snap a box (the moving item's bounds at its proposed position) against
/// other items. `moving_id` is skipped if it shows up among `others`.
///
/// Candidates are visited in order and the first match on each axis wins.
pub fn snap_bounds<'a>(
    moving: Bounds,
    moving_id: &ItemId,
    others: impl IntoIterator<Item = &'a Item>,
    threshold: f64,
    margin: f64,
) -> SnapResult {
    let mut x_match: Option<AxisMatch> = None;
    let mut y_match: Option<AxisMatch> = None;

    for other in others {
        if &other.id == moving_id {
            continue;
        }
        let ob = geometry::bounds(other);
        if x_match.is_none() {
            if let Some((origin, line)) = match_axis(x_span(&moving), x_span(&ob), threshold) {
                x_match = Some(AxisMatch { origin, line, other: ob });
            }
        }
        if y_match.is_none() {
            if let Some((origin, line)) = match_axis(y_span(&moving), y_span(&ob), threshold) {
                y_match = Some(AxisMatch { origin, line, other: ob });
            }
        }
        if x_match.is_some() && y_match.is_some() {
            break;
        }
    }

    let position = Point::new(
        x_match.map_or(moving.left, |m| m.origin),
        y_match.map_or(moving.top, |m| m.origin),
    );
    let snapped = moving.moved_to(position);

    let mut guides = Vec::with_capacity(2);
    if let Some(m) = x_match {
        guides.push(GuideLine {
            orientation: Orientation::Vertical,
            position: m.line,
            start: snapped.top.min(m.other.top) - margin,
            end: snapped.bottom.max(m.other.bottom) + margin,
        });
    }
    if let Some(m) = y_match {
        guides.push(GuideLine {
            orientation: Orientation::Horizontal,
            position: m.line,
            start: snapped.left.min(m.other.left) - margin,
            end: snapped.right.max(m.other.right) + margin,
        });
    }

    SnapResult {
        position,
        guides,
        snapped_x: x_match.is_some(),
        snapped_y: y_match.is_some(),
    }
}

/// Snap `moving` (at its current position) against `others`.
pub fn calculate_snap<'a>(
    moving: &Item,
    others: impl IntoIterator<Item = &'a Item>,
    threshold: f64,
    margin: f64,
) -> SnapResult {
    snap_bounds(geometry::bounds(moving), &moving.id, others, threshold, margin)
}

/// Snap a point to the nearest grid intersection. A grid size that is not
/// positive and finite disables grid snapping.
pub fn snap_to_grid(point: Point, grid_size: f64) -> SnapResult {
    if !(grid_size.is_finite() && grid_size > 0.0) {
        return SnapResult::none(point);
    }
    let snapped_x = (point.x / grid_size).round() * grid_size;
    let snapped_y = (point.y / grid_size).round() * grid_size;

    SnapResult {
        position: Point::new(snapped_x, snapped_y),
        guides: Vec::new(),
        snapped_x: true,
        snapped_y: true,
    }
}

/// Snap a moving box according to `mode`.
pub fn snap_with_mode<'a>(
    mode: SnapMode,
    moving: Bounds,
    moving_id: &ItemId,
    others: impl IntoIterator<Item = &'a Item>,
    threshold: f64,
    margin: f64,
    grid_size: f64,
) -> SnapResult {
    let origin = Point::new(moving.left, moving.top);
    match mode {
        SnapMode::None => SnapResult::none(origin),
        SnapMode::Guides => snap_bounds(moving, moving_id, others, threshold, margin),
        SnapMode::Grid => snap_to_grid(origin, grid_size),
        SnapMode::All => {
            // Guides take priority; the grid fills in the other axis
            let mut result = snap_bounds(moving, moving_id, others, threshold, margin);
            let grid = snap_to_grid(origin, grid_size);
            if !result.snapped_x && grid.snapped_x {
                result.position.x = grid.position.x;
                result.snapped_x = true;
            }
            if !result.snapped_y && grid.snapped_y {
                result.position.y = grid.position.y;
                result.snapped_y = true;
            }
            result
        }
    }
}
