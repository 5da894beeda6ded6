//! Synchronous canvas interaction engine.
//!
//! The engine owns the in-memory item list (with live positions and
//! selection), history, the drag and touch state machines and the local
//! clipboard slot. Every state-changing call applies its change in memory
//! first and returns the [`Mutation`]s the host must persist.

use crate::align::{self, AlignEdge, LayoutPlan};
use crate::clipboard::{self, ClipboardPayload, DuplicateRequest, LocalClipboard};
use crate::config::EngineConfig;
use crate::containment;
use crate::drag::{DragController, MembershipChange};
use crate::geometry;
use crate::gesture::{GestureEvent, GestureThresholds, TouchGestures};
use crate::history::{History, HistoryEntry, HistoryKind, Snapshot};
use crate::input::{Instant, Modifiers, MouseButton, TouchPoint};
use crate::item::{Item, ItemId, ItemKind};
use crate::snap::GuideLine;
use kurbo::{Point, Size, Vec2};
use std::collections::{HashMap, HashSet};

/// A committed change the persistence collaborator must apply.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Position { id: ItemId, position: Point },
    Size { id: ItemId, size: Size },
}

impl Mutation {
    pub fn id(&self) -> &ItemId {
        match self {
            Mutation::Position { id, .. } | Mutation::Size { id, .. } => id,
        }
    }
}

/// What a context menu was opened on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextTarget {
    Canvas,
    Item(ItemId),
}

/// Request for the host to show a context menu.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextMenuRequest {
    pub point: Point,
    pub target: ContextTarget,
}

/// Result of finishing a drag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DragStopped {
    pub mutations: Vec<Mutation>,
    pub membership: Option<MembershipChange>,
}

/// The canvas interaction engine.
pub struct CanvasEngine {
    config: EngineConfig,
    /// Items in insertion order; later items are on top.
    items: Vec<Item>,
    history: History,
    drag: DragController,
    gestures: TouchGestures,
    clipboard: LocalClipboard,
    /// World point of the last context menu, used as the paste target.
    last_context_point: Option<Point>,
}

impl Default for CanvasEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default(), LocalClipboard::new())
    }
}

impl CanvasEngine {
    pub fn new(config: EngineConfig, clipboard: LocalClipboard) -> Self {
        let config = config.sanitized();
        Self {
            history: History::with_capacity(config.history_capacity),
            gestures: TouchGestures::new(GestureThresholds::from_config(&config)),
            drag: DragController::new(),
            items: Vec::new(),
            clipboard,
            last_context_point: None,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Data inputs ---

    /// Replace every item. Selection survives for ids that are still present.
    pub fn load_items(&mut self, items: Vec<Item>) {
        let selected = self.selected_set();
        self.items = Self::sanitize(items, &selected);
        log::debug!("Loaded {} items", self.items.len());
    }

    /// Replace every item of one kind with a fresh list from the store.
    /// Surviving items keep their slot in the stacking order; new ones are
    /// appended.
    pub fn replace_kind(&mut self, kind: ItemKind, items: Vec<Item>) {
        let selected = self.selected_set();
        let others: HashSet<ItemId> = self
            .items
            .iter()
            .filter(|item| item.kind != kind)
            .map(|item| item.id.clone())
            .collect();
        let mut fresh: HashMap<ItemId, Item> = HashMap::new();
        let mut appended = Vec::new();
        for item in Self::sanitize(items.into_iter().filter(|item| item.kind == kind).collect(), &selected) {
            if others.contains(&item.id) {
                continue;
            }
            if self.item(&item.id).is_some() {
                fresh.insert(item.id.clone(), item);
            } else {
                appended.push(item);
            }
        }
        let old = std::mem::take(&mut self.items);
        for item in old {
            if item.kind != kind {
                self.items.push(item);
            } else if let Some(replacement) = fresh.remove(&item.id) {
                self.items.push(replacement);
            }
        }
        self.items.extend(appended);
        log::debug!("Resynced {} items", kind);
    }

    /// Add items created or duplicated by the store, selecting them.
    pub fn insert_items(&mut self, items: Vec<Item>) {
        let mut accepted: Vec<Item> = Vec::with_capacity(items.len());
        for mut item in items {
            if !item.is_finite() || self.item(&item.id).is_some() || accepted.iter().any(|a| a.id == item.id) {
                log::warn!("Ignoring inserted item {}", item.id);
                continue;
            }
            item.selected = true;
            accepted.push(item);
        }
        if accepted.is_empty() {
            return;
        }
        for item in self.items.iter_mut() {
            item.selected = false;
        }
        self.items.extend(accepted);
    }

    /// Drop items from the canvas.
    pub fn remove_items(&mut self, ids: &[ItemId]) {
        self.items.retain(|item| !ids.contains(&item.id));
    }

    /// Store the new text content of an item locally.
    pub fn set_text(&mut self, id: &ItemId, text: &str) -> bool {
        let Some(item) = self.item_mut(id) else {
            return false;
        };
        if !item.data.is_object() {
            item.data = serde_json::json!({});
        }
        item.data["text"] = serde_json::Value::String(text.to_string());
        true
    }

    fn sanitize(items: Vec<Item>, selected: &HashSet<ItemId>) -> Vec<Item> {
        let mut seen = HashSet::new();
        let mut result = Vec::with_capacity(items.len());
        for mut item in items {
            if !item.is_finite() {
                log::warn!("Dropping item {} with non-finite geometry", item.id);
                continue;
            }
            if !seen.insert(item.id.clone()) {
                log::warn!("Dropping duplicate item id {}", item.id);
                continue;
            }
            item.selected = selected.contains(&item.id);
            result.push(item);
        }
        result
    }

    // --- Queries ---

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }

    fn item_mut(&mut self, id: &ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| &item.id == id)
    }

    /// Items back to front: containers first, then everything else, each
    /// group in insertion order.
    pub fn render_order(&self) -> Vec<&Item> {
        let (containers, rest): (Vec<&Item>, Vec<&Item>) = self.items.iter().partition(|item| item.is_container());
        containers.into_iter().chain(rest).collect()
    }

    pub fn guides(&self) -> &[GuideLine] {
        self.drag.guides()
    }

    /// Topmost item under a world point.
    pub fn hit_test(&self, point: Point) -> Option<&Item> {
        containment::hit_test(point, &self.items)
    }

    pub fn last_context_point(&self) -> Option<Point> {
        self.last_context_point
    }

    // --- Selection ---

    pub fn selected_ids(&self) -> Vec<ItemId> {
        self.items.iter().filter(|item| item.selected).map(|item| item.id.clone()).collect()
    }

    pub fn selected_items(&self) -> Vec<&Item> {
        self.items.iter().filter(|item| item.selected).collect()
    }

    fn selected_set(&self) -> HashSet<ItemId> {
        self.items.iter().filter(|item| item.selected).map(|item| item.id.clone()).collect()
    }

    /// Click selection: a multi-select modifier toggles, otherwise the item
    /// becomes the only selection.
    pub fn select(&mut self, id: &ItemId, modifiers: Modifiers) {
        if modifiers.multi_select() {
            self.toggle_selection(id);
            return;
        }
        for item in self.items.iter_mut() {
            item.selected = &item.id == id;
        }
    }

    pub fn toggle_selection(&mut self, id: &ItemId) {
        if let Some(item) = self.item_mut(id) {
            item.selected = !item.selected;
        }
    }

    pub fn select_all(&mut self) {
        for item in self.items.iter_mut() {
            item.selected = true;
        }
    }

    pub fn clear_selection(&mut self) {
        for item in self.items.iter_mut() {
            item.selected = false;
        }
    }

    /// Select everything inside a container instead of the container itself.
    pub fn select_contents(&mut self, container: &ItemId) -> usize {
        let Some(c) = self.item(container) else {
            return 0;
        };
        let inside: HashSet<ItemId> = containment::contained_ids(c, &self.items).into_iter().collect();
        for item in self.items.iter_mut() {
            item.selected = inside.contains(&item.id);
        }
        inside.len()
    }

    // --- Pointer ---

    /// Pointer press in world coordinates. The secondary button opens a
    /// context menu; the primary button starts a drag on a hit item or
    /// clears the selection on empty canvas.
    pub fn pointer_down(&mut self, point: Point, button: MouseButton, modifiers: Modifiers) -> Option<ContextMenuRequest> {
        match button {
            MouseButton::Right => Some(self.context_menu_at(point)),
            MouseButton::Left => {
                match self.hit_test(point).map(|item| item.id.clone()) {
                    Some(id) => {
                        self.drag_start(&id, point, modifiers);
                    }
                    None if !modifiers.multi_select() => self.clear_selection(),
                    None => {}
                }
                None
            }
            MouseButton::Middle => None,
        }
    }

    pub fn pointer_move(&mut self, point: Point) {
        self.drag_update(point);
    }

    pub fn pointer_up(&mut self) -> DragStopped {
        self.drag_stop()
    }

    /// Pointer capture lost: abandon any drag.
    pub fn pointer_lost(&mut self) {
        self.drag_cancel();
    }

    fn context_menu_at(&mut self, point: Point) -> ContextMenuRequest {
        self.last_context_point = Some(point);
        let target = match self.hit_test(point) {
            Some(item) => ContextTarget::Item(item.id.clone()),
            None => ContextTarget::Canvas,
        };
        ContextMenuRequest { point, target }
    }

    // --- Drag ---

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Begin a drag. A drag still in progress (its release was never seen)
    /// is cancelled first so its items go back to their committed positions.
    pub fn drag_start(&mut self, id: &ItemId, pointer: Point, modifiers: Modifiers) -> bool {
        if self.drag.is_dragging() {
            log::debug!("Drag started while another was active, cancelling the earlier one");
            self.drag_cancel();
        }
        if !self.drag.start(&mut self.items, id, pointer, modifiers) {
            return false;
        }
        let ids: Vec<ItemId> = self.drag.moving_ids().cloned().collect();
        let before = self.position_snapshots(&ids);
        self.history.start_batch(HistoryKind::Move, "Move items", before);
        true
    }

    pub fn drag_update(&mut self, pointer: Point) {
        self.drag.update(&mut self.items, pointer, &self.config);
    }

    /// Finish the drag: one move entry for everything that moved plus a
    /// position mutation per moved item.
    pub fn drag_stop(&mut self) -> DragStopped {
        let ids: Vec<ItemId> = self.drag.moving_ids().cloned().collect();
        let Some(outcome) = self.drag.stop(&self.items) else {
            return DragStopped::default();
        };
        if let Some(change) = &outcome.membership {
            log::info!("{} moved from {:?} to {:?}", change.item, change.from, change.to);
        }
        // A drag that moved nothing is rejected as a no-op batch
        let after = self.position_snapshots(&ids);
        self.history.end_batch(after);
        DragStopped {
            mutations: position_mutations(&outcome.after),
            membership: outcome.membership,
        }
    }

    pub fn drag_cancel(&mut self) {
        if self.drag.is_dragging() {
            self.drag.cancel(&mut self.items);
            self.history.cancel_batch();
        }
    }

    fn position_snapshots(&self, ids: &[ItemId]) -> Vec<Snapshot> {
        ids.iter()
            .filter_map(|id| self.item(id).map(|item| Snapshot::position(id.clone(), item.position)))
            .collect()
    }

    // --- Layout ---

    pub fn align_selection(&mut self, edge: AlignEdge) -> Vec<Mutation> {
        let plan = align::align(&self.selected_items(), edge);
        self.apply_plan(edge.description(), plan)
    }

    pub fn tidy_up_selection(&mut self) -> Vec<Mutation> {
        let plan = align::tidy_up(&self.selected_items(), self.config.tidy_gap, self.config.tidy_row_bucket);
        self.apply_plan("Tidy up", plan)
    }

    fn apply_plan(&mut self, description: &str, plan: LayoutPlan) -> Vec<Mutation> {
        if plan.is_empty() {
            return Vec::new();
        }
        let mut before = Vec::with_capacity(plan.len());
        let mut after = Vec::with_capacity(plan.len());
        for (id, position) in plan {
            let Some(item) = self.item_mut(&id) else {
                continue;
            };
            before.push(Snapshot::position(id.clone(), item.position));
            item.position = position;
            after.push(Snapshot::position(id, position));
        }
        let mutations = position_mutations(&after);
        if self.history.push(HistoryEntry::new(HistoryKind::Move, description, before, after)) {
            log::info!("{} ({} items)", description, mutations.len());
        }
        mutations
    }

    /// Set an item's size, clamped to the minimum item size.
    pub fn resize(&mut self, id: &ItemId, size: Size) -> Vec<Mutation> {
        if !size.is_finite() {
            return Vec::new();
        }
        let min = self.config.min_item_size;
        let size = Size::new(size.width.max(min), size.height.max(min));
        let Some(item) = self.item_mut(id) else {
            return Vec::new();
        };
        let before = Snapshot::with_size(id.clone(), item.position, geometry::item_size(item));
        item.size = Some(size);
        let after = Snapshot::with_size(id.clone(), item.position, size);
        if !self.history.push(HistoryEntry::new(HistoryKind::Resize, "Resize", vec![before], vec![after])) {
            return Vec::new();
        }
        vec![Mutation::Size { id: id.clone(), size }]
    }

    // --- History ---

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn undo(&mut self) -> Vec<Mutation> {
        self.drag_cancel();
        let Some(entry) = self.history.undo() else {
            return Vec::new();
        };
        log::info!("Undo: {}", entry.description);
        self.apply_snapshots(&entry.before)
    }

    pub fn redo(&mut self) -> Vec<Mutation> {
        self.drag_cancel();
        let Some(entry) = self.history.redo() else {
            return Vec::new();
        };
        log::info!("Redo: {}", entry.description);
        self.apply_snapshots(&entry.after)
    }

    fn apply_snapshots(&mut self, snapshots: &[Snapshot]) -> Vec<Mutation> {
        let mut mutations = Vec::new();
        for snapshot in snapshots {
            let Some(item) = self.item_mut(&snapshot.id) else {
                log::debug!("Skipping history snapshot for missing item {}", snapshot.id);
                continue;
            };
            item.position = snapshot.position;
            mutations.push(Mutation::Position {
                id: snapshot.id.clone(),
                position: snapshot.position,
            });
            if let Some(size) = snapshot.size {
                item.size = Some(size);
                mutations.push(Mutation::Size {
                    id: snapshot.id.clone(),
                    size,
                });
            }
        }
        mutations
    }

    // --- Clipboard ---

    pub fn local_clipboard(&self) -> &LocalClipboard {
        &self.clipboard
    }

    pub fn local_clipboard_mut(&mut self) -> &mut LocalClipboard {
        &mut self.clipboard
    }

    /// Payload for the current selection, `None` when nothing is selected.
    pub fn copy_selection(&self) -> Option<ClipboardPayload> {
        ClipboardPayload::from_items(self.items.iter().filter(|item| item.selected))
    }

    /// Where a paste lands: the last context menu point, or the payload's own
    /// origin nudged by the duplicate offset.
    pub fn paste_target(&self, payload: &ClipboardPayload) -> Point {
        self.last_context_point
            .unwrap_or_else(|| payload.origin + Vec2::new(self.config.duplicate_offset, self.config.duplicate_offset))
    }

    pub fn plan_paste(&self, payload: &ClipboardPayload, target: Point) -> Vec<DuplicateRequest> {
        clipboard::plan_paste(payload, target)
    }

    /// Duplicate requests for the selection shifted by the duplicate offset.
    pub fn duplicate_selection(&self) -> Vec<DuplicateRequest> {
        let offset = Vec2::new(self.config.duplicate_offset, self.config.duplicate_offset);
        self.selected_items()
            .into_iter()
            .map(|item| DuplicateRequest {
                source: item.id.clone(),
                kind: item.kind,
                position: item.position + offset,
            })
            .collect()
    }

    /// Remove the selection locally and return the removed ids for the
    /// store. Kinds are returned too so a failed delete can be resynced.
    pub fn delete_selection(&mut self) -> (Vec<ItemId>, Vec<ItemKind>) {
        self.drag_cancel();
        let mut ids = Vec::new();
        let mut kinds = Vec::new();
        for item in self.items.iter().filter(|item| item.selected) {
            ids.push(item.id.clone());
            if !kinds.contains(&item.kind) {
                kinds.push(item.kind);
            }
        }
        self.remove_items(&ids);
        (ids, kinds)
    }

    // --- Touch ---

    pub fn touch_start(&mut self, touch: TouchPoint, now: Instant) {
        self.gestures.touch_start(touch, now);
    }

    pub fn touch_move(&mut self, touch: TouchPoint) {
        self.gestures.touch_move(touch);
    }

    pub fn touch_end(&mut self, id: u64, now: Instant) -> Option<ContextMenuRequest> {
        let event = self.gestures.touch_end(id, now)?;
        Some(self.handle_gesture(event))
    }

    pub fn touch_cancel(&mut self) {
        self.gestures.cancel();
    }

    /// Fire a due long press.
    pub fn poll(&mut self, now: Instant) -> Option<ContextMenuRequest> {
        let event = self.gestures.poll(now)?;
        Some(self.handle_gesture(event))
    }

    pub fn long_press_deadline(&self) -> Option<Instant> {
        self.gestures.long_press_deadline()
    }

    pub fn take_click_suppression(&mut self) -> bool {
        self.gestures.take_click_suppression()
    }

    fn handle_gesture(&mut self, event: GestureEvent) -> ContextMenuRequest {
        match event {
            GestureEvent::ContextMenu { point } => self.context_menu_at(point),
        }
    }
}

fn position_mutations(snapshots: &[Snapshot]) -> Vec<Mutation> {
    snapshots
        .iter()
        .map(|s| Mutation::Position {
            id: s.id.clone(),
            position: s.position,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snap::SnapMode;
    use std::time::Duration;

    fn card(id: &str, x: f64, y: f64) -> Item {
        Item::new(id, ItemKind::Card, Point::new(x, y)).with_size(100.0, 100.0)
    }

    fn container(id: &str, x: f64, y: f64) -> Item {
        Item::new(id, ItemKind::Container, Point::new(x, y)).with_size(400.0, 300.0)
    }

    fn engine_with(items: Vec<Item>) -> CanvasEngine {
        let config = EngineConfig {
            snap_mode: SnapMode::None,
            ..Default::default()
        };
        let mut engine = CanvasEngine::new(config, LocalClipboard::new());
        engine.load_items(items);
        engine
    }

    fn position(engine: &CanvasEngine, id: &str) -> Point {
        engine.item(&ItemId::from(id)).unwrap().position
    }

    #[test]
    fn test_load_drops_invalid_items() {
        let engine = engine_with(vec![
            card("a", 0.0, 0.0),
            card("bad", f64::NAN, 0.0),
            card("a", 50.0, 50.0),
        ]);
        assert_eq!(engine.items().len(), 1);
        assert_eq!(position(&engine, "a"), Point::ZERO);
    }

    #[test]
    fn test_render_order_puts_containers_first() {
        let engine = engine_with(vec![card("a", 0.0, 0.0), container("c", 0.0, 0.0), card("b", 0.0, 0.0)]);
        let order: Vec<&str> = engine.render_order().iter().map(|item| item.id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_drag_commits_one_entry_and_undo_restores() {
        let mut engine = engine_with(vec![card("a", 0.0, 0.0), card("b", 500.0, 0.0)]);
        engine.pointer_down(Point::new(10.0, 10.0), MouseButton::Left, Modifiers::NONE);
        engine.pointer_move(Point::new(60.0, 30.0));
        let stopped = engine.pointer_up();
        assert_eq!(
            stopped.mutations,
            vec![Mutation::Position {
                id: ItemId::from("a"),
                position: Point::new(50.0, 20.0),
            }]
        );
        assert_eq!(engine.history().undo_count(), 1);

        let undone = engine.undo();
        assert_eq!(position(&engine, "a"), Point::ZERO);
        assert_eq!(undone.len(), 1);
        assert!(engine.can_redo());

        engine.redo();
        assert_eq!(position(&engine, "a"), Point::new(50.0, 20.0));
    }

    #[test]
    fn test_container_drag_moves_contents_and_undoes_together() {
        let mut engine = engine_with(vec![container("c", 0.0, 0.0), card("a", 50.0, 50.0)]);
        // Empty part of the container
        engine.pointer_down(Point::new(300.0, 250.0), MouseButton::Left, Modifiers::NONE);
        engine.pointer_move(Point::new(400.0, 250.0));
        let stopped = engine.pointer_up();
        assert_eq!(stopped.mutations.len(), 2);
        assert_eq!(position(&engine, "a"), Point::new(150.0, 50.0));

        engine.undo();
        assert_eq!(position(&engine, "c"), Point::ZERO);
        assert_eq!(position(&engine, "a"), Point::new(50.0, 50.0));
    }

    #[test]
    fn test_pointer_lost_cancels_drag() {
        let mut engine = engine_with(vec![card("a", 0.0, 0.0)]);
        engine.pointer_down(Point::new(10.0, 10.0), MouseButton::Left, Modifiers::NONE);
        engine.pointer_move(Point::new(200.0, 200.0));
        engine.pointer_lost();
        assert_eq!(position(&engine, "a"), Point::ZERO);
        assert!(engine.pointer_up().mutations.is_empty());
        assert!(!engine.can_undo());
    }

    #[test]
    fn test_click_without_move_records_nothing() {
        let mut engine = engine_with(vec![card("a", 0.0, 0.0)]);
        engine.pointer_down(Point::new(10.0, 10.0), MouseButton::Left, Modifiers::NONE);
        assert!(engine.pointer_up().mutations.is_empty());
        assert!(!engine.can_undo());
        assert!(!engine.history().in_batch());
    }

    #[test]
    fn test_click_on_empty_canvas_clears_selection() {
        let mut engine = engine_with(vec![card("a", 0.0, 0.0)]);
        engine.select_all();
        engine.pointer_down(Point::new(900.0, 900.0), MouseButton::Left, Modifiers::NONE);
        assert!(engine.selected_ids().is_empty());
    }

    #[test]
    fn test_align_is_one_history_entry() {
        let mut engine = engine_with(vec![card("a", 10.0, 0.0), card("b", 40.0, 200.0), card("c", 0.0, 400.0)]);
        engine.select_all();
        let mutations = engine.align_selection(AlignEdge::Left);
        assert_eq!(mutations.len(), 2);
        assert_eq!(engine.history().undo_count(), 1);
        assert_eq!(position(&engine, "b"), Point::new(0.0, 200.0));

        engine.undo();
        assert_eq!(position(&engine, "a"), Point::new(10.0, 0.0));
        assert_eq!(position(&engine, "b"), Point::new(40.0, 200.0));
    }

    #[test]
    fn test_align_single_item_is_noop() {
        let mut engine = engine_with(vec![card("a", 10.0, 0.0)]);
        engine.select_all();
        assert!(engine.align_selection(AlignEdge::Left).is_empty());
        assert!(engine.tidy_up_selection().is_empty());
        assert!(!engine.can_undo());
    }

    #[test]
    fn test_resize_clamps_and_undoes() {
        let mut engine = engine_with(vec![card("a", 0.0, 0.0)]);
        let mutations = engine.resize(&ItemId::from("a"), Size::new(5.0, 300.0));
        assert_eq!(
            mutations,
            vec![Mutation::Size {
                id: ItemId::from("a"),
                size: Size::new(20.0, 300.0),
            }]
        );
        let undone = engine.undo();
        assert_eq!(engine.item(&ItemId::from("a")).unwrap().size, Some(Size::new(100.0, 100.0)));
        assert_eq!(undone.len(), 2);
    }

    #[test]
    fn test_undo_skips_missing_items() {
        let mut engine = engine_with(vec![card("a", 0.0, 0.0), card("b", 300.0, 50.0)]);
        engine.select_all();
        // Both move to x = 150
        assert_eq!(engine.align_selection(AlignEdge::CenterHorizontal).len(), 2);
        engine.remove_items(&[ItemId::from("a")]);
        let undone = engine.undo();
        assert_eq!(undone.len(), 1);
        assert_eq!(undone[0].id().as_str(), "b");
        assert_eq!(position(&engine, "b"), Point::new(300.0, 50.0));
    }

    #[test]
    fn test_select_contents() {
        let mut engine = engine_with(vec![container("c", 0.0, 0.0), card("a", 10.0, 10.0), card("out", 900.0, 0.0)]);
        engine.select(&ItemId::from("c"), Modifiers::NONE);
        assert_eq!(engine.select_contents(&ItemId::from("c")), 1);
        assert_eq!(engine.selected_ids(), vec![ItemId::from("a")]);
    }

    #[test]
    fn test_select_with_modifier_toggles() {
        let mut engine = engine_with(vec![card("a", 0.0, 0.0), card("b", 200.0, 0.0)]);
        let shift = Modifiers {
            shift: true,
            ..Default::default()
        };
        engine.select(&ItemId::from("a"), Modifiers::NONE);
        engine.select(&ItemId::from("b"), shift);
        assert_eq!(engine.selected_ids().len(), 2);
        engine.select(&ItemId::from("a"), shift);
        assert_eq!(engine.selected_ids(), vec![ItemId::from("b")]);
        engine.clear_selection();
        assert!(engine.selected_ids().is_empty());
    }

    #[test]
    fn test_right_click_context_menu() {
        let mut engine = engine_with(vec![card("a", 0.0, 0.0)]);
        let on_item = engine.pointer_down(Point::new(50.0, 50.0), MouseButton::Right, Modifiers::NONE);
        assert_eq!(on_item.unwrap().target, ContextTarget::Item(ItemId::from("a")));
        let on_canvas = engine
            .pointer_down(Point::new(500.0, 500.0), MouseButton::Right, Modifiers::NONE)
            .unwrap();
        assert_eq!(on_canvas.target, ContextTarget::Canvas);
        assert_eq!(engine.last_context_point(), Some(Point::new(500.0, 500.0)));
    }

    #[test]
    fn test_long_press_opens_context_menu() {
        let mut engine = engine_with(vec![card("a", 0.0, 0.0)]);
        let t0 = Instant::now();
        engine.touch_start(TouchPoint::new(1, 20.0, 20.0), t0);
        let request = engine.poll(t0 + Duration::from_millis(500)).unwrap();
        assert_eq!(request.target, ContextTarget::Item(ItemId::from("a")));
        assert!(engine.take_click_suppression());
    }

    #[test]
    fn test_copy_and_paste_plan() {
        let mut engine = engine_with(vec![card("a", 10.0, 10.0), card("b", 50.0, 20.0)]);
        assert!(engine.copy_selection().is_none());
        engine.select_all();
        let payload = engine.copy_selection().unwrap();
        let requests = engine.plan_paste(&payload, Point::new(110.0, 60.0));
        assert_eq!(requests[1].position, Point::new(150.0, 70.0));
        assert_eq!(engine.paste_target(&payload), Point::new(30.0, 30.0));
    }

    #[test]
    fn test_duplicate_and_delete_selection() {
        let mut engine = engine_with(vec![card("a", 10.0, 10.0), container("c", 500.0, 0.0)]);
        engine.select_all();
        let requests = engine.duplicate_selection();
        assert_eq!(requests[0].position, Point::new(30.0, 30.0));

        let (ids, kinds) = engine.delete_selection();
        assert_eq!(ids.len(), 2);
        assert_eq!(kinds, vec![ItemKind::Card, ItemKind::Container]);
        assert!(engine.items().is_empty());
    }

    #[test]
    fn test_replace_kind_keeps_selection() {
        let mut engine = engine_with(vec![card("a", 0.0, 0.0), container("c", 0.0, 0.0)]);
        engine.select_all();
        engine.replace_kind(ItemKind::Card, vec![card("a", 5.0, 5.0), card("n", 0.0, 0.0)]);
        assert_eq!(engine.items().len(), 3);
        assert!(engine.item(&ItemId::from("a")).unwrap().selected);
        assert!(!engine.item(&ItemId::from("n")).unwrap().selected);
        assert_eq!(position(&engine, "a"), Point::new(5.0, 5.0));
    }

    #[test]
    fn test_insert_items_selects_them() {
        let mut engine = engine_with(vec![card("a", 0.0, 0.0)]);
        engine.select_all();
        engine.insert_items(vec![card("new", 10.0, 10.0)]);
        assert_eq!(engine.selected_ids(), vec![ItemId::from("new")]);
    }

    #[test]
    fn test_second_press_cancels_unfinished_drag() {
        let mut engine = engine_with(vec![card("a", 0.0, 0.0), card("b", 500.0, 0.0)]);
        engine.pointer_down(Point::new(10.0, 10.0), MouseButton::Left, Modifiers::NONE);
        engine.pointer_move(Point::new(210.0, 10.0));
        assert_eq!(position(&engine, "a"), Point::new(200.0, 0.0));

        // The release of the first drag never arrived
        engine.pointer_down(Point::new(510.0, 10.0), MouseButton::Left, Modifiers::NONE);
        assert_eq!(position(&engine, "a"), Point::ZERO);
        assert!(engine.pointer_up().mutations.is_empty());
        assert!(!engine.can_undo());
        assert!(!engine.history().in_batch());

        engine.pointer_down(Point::new(510.0, 10.0), MouseButton::Left, Modifiers::NONE);
        engine.pointer_move(Point::new(530.0, 10.0));
        assert_eq!(engine.pointer_up().mutations.len(), 1);
        assert_eq!(engine.history().undo_count(), 1);
    }

    #[test]
    fn test_replace_kind_keeps_stacking_order() {
        let mut engine = engine_with(vec![card("a", 0.0, 0.0), container("c", 0.0, 0.0), card("b", 0.0, 0.0)]);
        engine.replace_kind(ItemKind::Card, vec![card("b", 1.0, 1.0), card("n", 2.0, 2.0), card("a", 3.0, 3.0)]);
        let order: Vec<&str> = engine.items().iter().map(|item| item.id.as_str()).collect();
        assert_eq!(order, vec!["a", "c", "b", "n"]);
        assert_eq!(position(&engine, "a"), Point::new(3.0, 3.0));

        // Cards missing from the fresh list are gone
        engine.replace_kind(ItemKind::Card, vec![card("b", 1.0, 1.0)]);
        let order: Vec<&str> = engine.items().iter().map(|item| item.id.as_str()).collect();
        assert_eq!(order, vec!["c", "b"]);
    }

    #[test]
    fn test_rejected_insert_keeps_selection() {
        let mut engine = engine_with(vec![card("a", 0.0, 0.0)]);
        engine.select_all();
        engine.insert_items(vec![card("a", 10.0, 10.0), card("nan", f64::NAN, 0.0)]);
        assert_eq!(engine.selected_ids(), vec![ItemId::from("a")]);
        assert_eq!(engine.items().len(), 1);
    }

    #[test]
    fn test_zero_grid_size_never_produces_nan() {
        let config = EngineConfig {
            snap_mode: SnapMode::Grid,
            grid_size: 0.0,
            ..Default::default()
        };
        let mut engine = CanvasEngine::new(config, LocalClipboard::new());
        engine.load_items(vec![card("a", 0.0, 0.0)]);
        engine.pointer_down(Point::new(10.0, 10.0), MouseButton::Left, Modifiers::NONE);
        engine.pointer_move(Point::new(37.0, 13.0));
        let stopped = engine.pointer_up();
        assert!(position(&engine, "a").is_finite());
        for mutation in &stopped.mutations {
            if let Mutation::Position { position, .. } = mutation {
                assert!(position.is_finite());
            }
        }
    }
}
