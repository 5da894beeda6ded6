//! Pointer drag state machine.
//!
//! `Idle -> Dragging -> Idle`. While dragging, item positions are updated
//! in place on every pointer move; nothing is committed until `stop`.

use crate::config::EngineConfig;
use crate::containment;
use crate::geometry;
use crate::history::Snapshot;
use crate::input::Modifiers;
use crate::item::{Item, ItemId};
use crate::snap::{self, GuideLine};
use kurbo::{Point, Vec2};

/// A plain item ended a drag in a different container than it started in.
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipChange {
    pub item: ItemId,
    pub from: Option<ItemId>,
    pub to: Option<ItemId>,
}

/// Result of a completed drag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DragOutcome {
    /// Start positions of the items that moved.
    pub before: Vec<Snapshot>,
    /// Final positions of the same items, index-aligned with `before`.
    pub after: Vec<Snapshot>,
    pub membership: Option<MembershipChange>,
}

impl DragOutcome {
    pub fn is_empty(&self) -> bool {
        self.after.is_empty()
    }
}

/// An active drag.
#[derive(Debug, Clone)]
struct ActiveDrag {
    primary: ItemId,
    start_pointer: Point,
    /// Every moving item with its pre-drag position. The primary is first.
    origins: Vec<(ItemId, Point)>,
    from_container: Option<ItemId>,
}

/// Drives a pointer drag over a slice of items.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    active: Option<ActiveDrag>,
    guides: Vec<GuideLine>,
}

fn find<'a>(items: &'a [Item], id: &ItemId) -> Option<&'a Item> {
    items.iter().find(|item| &item.id == id)
}

fn find_mut<'a>(items: &'a mut [Item], id: &ItemId) -> Option<&'a mut Item> {
    items.iter_mut().find(|item| &item.id == id)
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// Guide lines for the current pointer position.
    pub fn guides(&self) -> &[GuideLine] {
        &self.guides
    }

    /// Ids of the items moving with the current drag.
    pub fn moving_ids(&self) -> impl Iterator<Item = &ItemId> {
        self.active.iter().flat_map(|drag| drag.origins.iter().map(|(id, _)| id))
    }

    /// Begin dragging `id` from a world-space pointer position.
    ///
    /// Updates selection: an unselected item without a multi-select modifier
    /// becomes the only selected item. Returns false if `id` is unknown.
    pub fn start(&mut self, items: &mut [Item], id: &ItemId, pointer: Point, modifiers: Modifiers) -> bool {
        let Some(index) = items.iter().position(|item| &item.id == id) else {
            log::debug!("Drag start on unknown item {}", id);
            return false;
        };

        if !items[index].selected {
            if !modifiers.multi_select() {
                for item in items.iter_mut() {
                    item.selected = false;
                }
            }
            items[index].selected = true;
        }

        let primary = &items[index];
        let selected_count = items.iter().filter(|item| item.selected).count();

        let mut moving: Vec<ItemId> = vec![primary.id.clone()];
        if selected_count > 1 {
            moving.extend(
                items
                    .iter()
                    .filter(|item| item.selected && &item.id != id)
                    .map(|item| item.id.clone()),
            );
        }

        // Containers carry whatever they cover at drag start
        let containers: Vec<&Item> = moving
            .iter()
            .filter_map(|mid| find(items, mid))
            .filter(|item| item.is_container())
            .collect();
        let mut carried = Vec::new();
        for container in containers {
            for child in containment::contained_ids(container, items.iter()) {
                if !moving.contains(&child) && !carried.contains(&child) {
                    carried.push(child);
                }
            }
        }
        moving.extend(carried);

        let from_container = if primary.is_container() {
            None
        } else {
            containment::container_of(primary, items.iter()).map(|c| c.id.clone())
        };

        let origins = moving
            .into_iter()
            .filter_map(|mid| find(items, &mid).map(|item| (mid, item.position)))
            .collect::<Vec<_>>();

        log::debug!("Drag start on {} moving {} item(s)", id, origins.len());
        self.active = Some(ActiveDrag {
            primary: id.clone(),
            start_pointer: pointer,
            origins,
            from_container,
        });
        self.guides.clear();
        true
    }

    /// Move the drag to a new pointer position. The primary item is snapped
    /// against every non-moving item and the rest follow with the same
    /// effective delta.
    pub fn update(&mut self, items: &mut [Item], pointer: Point, config: &EngineConfig) {
        let Some(drag) = &self.active else {
            return;
        };
        let Some((_, primary_origin)) = drag.origins.first() else {
            return;
        };
        let Some(primary) = find(items, &drag.primary) else {
            return;
        };

        let delta = pointer - drag.start_pointer;
        let proposed = *primary_origin + delta;

        let result = if config.snap_mode.is_enabled() {
            let moving_bounds = geometry::bounds(primary).moved_to(proposed);
            let others = items
                .iter()
                .filter(|item| !drag.origins.iter().any(|(id, _)| id == &item.id));
            snap::snap_with_mode(
                config.snap_mode,
                moving_bounds,
                &drag.primary,
                others,
                config.snap_threshold,
                config.guide_margin,
                config.grid_size,
            )
        } else {
            snap::SnapResult::none(proposed)
        };

        let effective: Vec2 = result.position - *primary_origin;
        for (id, origin) in &drag.origins {
            if let Some(item) = find_mut(items, id) {
                item.position = *origin + effective;
            }
        }
        self.guides = result.guides;
    }

    /// Finish the drag. Returns the positions that changed and any
    /// container membership change of the primary item.
    pub fn stop(&mut self, items: &[Item]) -> Option<DragOutcome> {
        let drag = self.active.take()?;
        self.guides.clear();

        let mut outcome = DragOutcome::default();
        for (id, origin) in &drag.origins {
            if let Some(item) = find(items, id) {
                if item.position != *origin {
                    outcome.before.push(Snapshot::position(id.clone(), *origin));
                    outcome.after.push(Snapshot::position(id.clone(), item.position));
                }
            }
        }

        if let Some(primary) = find(items, &drag.primary) {
            if !primary.is_container() {
                let to = containment::container_of(primary, items.iter()).map(|c| c.id.clone());
                if to != drag.from_container {
                    log::debug!("{} moved from {:?} to {:?}", primary.id, drag.from_container, to);
                    outcome.membership = Some(MembershipChange {
                        item: primary.id.clone(),
                        from: drag.from_container.clone(),
                        to,
                    });
                }
            }
        }

        Some(outcome)
    }

    /// Abort the drag and put every moving item back.
    pub fn cancel(&mut self, items: &mut [Item]) {
        let Some(drag) = self.active.take() else {
            return;
        };
        for (id, origin) in drag.origins {
            if let Some(item) = find_mut(items, &id) {
                item.position = origin;
            }
        }
        self.guides.clear();
        log::debug!("Drag cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;
    use crate::snap::SnapMode;

    fn card(id: &str, x: f64, y: f64) -> Item {
        Item::new(id, ItemKind::Card, Point::new(x, y)).with_size(40.0, 40.0)
    }

    fn container(id: &str, x: f64, y: f64) -> Item {
        Item::new(id, ItemKind::Container, Point::new(x, y)).with_size(300.0, 200.0)
    }

    fn no_snap() -> EngineConfig {
        EngineConfig {
            snap_mode: SnapMode::None,
            ..Default::default()
        }
    }

    fn position(items: &[Item], id: &str) -> Point {
        find(items, &ItemId::from(id)).unwrap().position
    }

    #[test]
    fn test_drag_collapses_selection() {
        let mut items = vec![card("a", 0.0, 0.0), card("b", 100.0, 0.0)];
        items[1].selected = true;
        let mut drag = DragController::new();
        assert!(drag.start(&mut items, &ItemId::from("a"), Point::ZERO, Modifiers::NONE));
        assert!(items[0].selected);
        assert!(!items[1].selected);
        assert_eq!(drag.moving_ids().count(), 1);
    }

    #[test]
    fn test_multi_selection_moves_together() {
        let mut items = vec![card("a", 0.0, 0.0), card("b", 100.0, 0.0)];
        items[0].selected = true;
        items[1].selected = true;
        let mut drag = DragController::new();
        drag.start(&mut items, &ItemId::from("a"), Point::new(5.0, 5.0), Modifiers::NONE);
        drag.update(&mut items, Point::new(15.0, 35.0), &no_snap());
        assert_eq!(position(&items, "a"), Point::new(10.0, 30.0));
        assert_eq!(position(&items, "b"), Point::new(110.0, 30.0));

        let outcome = drag.stop(&items).unwrap();
        assert_eq!(outcome.after.len(), 2);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_container_carries_contents() {
        let mut items = vec![container("c", 0.0, 0.0), card("a", 100.0, 100.0), card("far", 900.0, 900.0)];
        let mut drag = DragController::new();
        drag.start(&mut items, &ItemId::from("c"), Point::ZERO, Modifiers::NONE);
        drag.update(&mut items, Point::new(50.0, 20.0), &no_snap());
        drag.update(&mut items, Point::new(50.0, 25.0), &no_snap());

        assert_eq!(position(&items, "c"), Point::new(50.0, 25.0));
        assert_eq!(position(&items, "a"), Point::new(150.0, 125.0));
        assert_eq!(position(&items, "far"), Point::new(900.0, 900.0));

        let outcome = drag.stop(&items).unwrap();
        assert_eq!(outcome.before.len(), 2);
        assert!(outcome.membership.is_none());
    }

    #[test]
    fn test_snaps_primary_and_reports_guides() {
        let mut items = vec![card("a", 0.0, 200.0), card("target", 100.0, 0.0)];
        let mut drag = DragController::new();
        drag.start(&mut items, &ItemId::from("a"), Point::ZERO, Modifiers::NONE);
        // Proposed left edge 95 is within 8 of target left 100
        drag.update(&mut items, Point::new(95.0, 0.0), &EngineConfig::default());
        assert_eq!(position(&items, "a").x, 100.0);
        assert_eq!(drag.guides().len(), 1);

        drag.stop(&items);
        assert!(drag.guides().is_empty());
    }

    #[test]
    fn test_cancel_restores_positions() {
        let mut items = vec![card("a", 10.0, 10.0)];
        let mut drag = DragController::new();
        drag.start(&mut items, &ItemId::from("a"), Point::ZERO, Modifiers::NONE);
        drag.update(&mut items, Point::new(300.0, 300.0), &no_snap());
        drag.cancel(&mut items);
        assert_eq!(position(&items, "a"), Point::new(10.0, 10.0));
        assert!(drag.stop(&items).is_none());
    }

    #[test]
    fn test_click_without_movement_is_empty() {
        let mut items = vec![card("a", 10.0, 10.0)];
        let mut drag = DragController::new();
        drag.start(&mut items, &ItemId::from("a"), Point::ZERO, Modifiers::NONE);
        assert!(drag.stop(&items).unwrap().is_empty());
    }

    #[test]
    fn test_membership_change() {
        let mut items = vec![container("c", 0.0, 0.0), card("a", 500.0, 500.0)];
        let mut drag = DragController::new();
        drag.start(&mut items, &ItemId::from("a"), Point::new(500.0, 500.0), Modifiers::NONE);
        drag.update(&mut items, Point::new(50.0, 50.0), &no_snap());
        let outcome = drag.stop(&items).unwrap();
        assert_eq!(
            outcome.membership,
            Some(MembershipChange {
                item: ItemId::from("a"),
                from: None,
                to: Some(ItemId::from("c")),
            })
        );
    }

    #[test]
    fn test_unknown_item() {
        let mut items = vec![card("a", 0.0, 0.0)];
        let mut drag = DragController::new();
        assert!(!drag.start(&mut items, &ItemId::from("zzz"), Point::ZERO, Modifiers::NONE));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_container_members_follow_snapped_delta() {
        let mut items = vec![
            container("c", 0.0, 0.0),
            card("a", 100.0, 100.0),
            card("t", 400.0, 500.0),
            // The child alone would snap to this one
            card("u", 490.0, 900.0),
        ];
        let mut drag = DragController::new();
        drag.start(&mut items, &ItemId::from("c"), Point::ZERO, Modifiers::NONE);
        let config = EngineConfig {
            snap_mode: SnapMode::Guides,
            ..Default::default()
        };
        // Proposed container left 395 snaps to the left edge of t at 400
        drag.update(&mut items, Point::new(395.0, 0.0), &config);

        assert_eq!(position(&items, "c"), Point::new(400.0, 0.0));
        assert_eq!(position(&items, "a") - position(&items, "c"), Vec2::new(100.0, 100.0));
        assert_eq!(drag.guides().len(), 1);
        assert_eq!(drag.guides()[0].position, 400.0);
    }
}
