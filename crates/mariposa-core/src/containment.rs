//! Containment and hit-testing.
//!
//! Containment is never stored. An item belongs to a container while its
//! center lies inside the container's bounds, so moving a container only has
//! to move whatever it currently covers.

use crate::geometry;
use crate::item::{Item, ItemId};
use kurbo::Point;

/// Whether `item` is inside `container`: the item is not itself a container,
/// is a different item, and its center lies within the container's bounds
/// (edges inclusive).
pub fn contains(container: &Item, item: &Item) -> bool {
    container.is_container()
        && !item.is_container()
        && item.id != container.id
        && geometry::bounds(container).contains_point(geometry::bounds(item).center())
}

/// Ids of every item inside `container`, in input order.
pub fn contained_ids<'a>(container: &Item, items: impl IntoIterator<Item = &'a Item>) -> Vec<ItemId> {
    items
        .into_iter()
        .filter(|item| contains(container, item))
        .map(|item| item.id.clone())
        .collect()
}

/// The topmost container holding `item`, if any. Later items are on top.
pub fn container_of<'a>(item: &Item, items: impl DoubleEndedIterator<Item = &'a Item>) -> Option<&'a Item> {
    items.rev().find(|candidate| contains(candidate, item))
}

/// Topmost item under a world point. Containers render behind everything
/// else, so they are only hit when no other item is.
pub fn hit_test<'a>(point: Point, items: &'a [Item]) -> Option<&'a Item> {
    let hit = |item: &&Item| geometry::bounds(item).contains_point(point);
    items
        .iter()
        .rev()
        .filter(|item| !item.is_container())
        .find(hit)
        .or_else(|| items.iter().rev().filter(|item| item.is_container()).find(hit))
}
