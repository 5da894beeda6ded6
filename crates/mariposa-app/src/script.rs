//! Scripted interaction replay.
//!
//! A script is a JSON array of steps, each tagged by `"op"`. Steps drive a
//! [`CanvasSession`] the way a host UI would. Time is virtual: every step
//! advances the clock by its own duration so long presses and text
//! debounce behave deterministically.

use kurbo::Point;
use mariposa_core::{
    AlignEdge, CanvasSession, ContextMenuRequest, ContextTarget, Item, ItemId, ItemStore, Modifiers, MouseButton,
    SystemClipboard, TouchPoint,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of pointer moves per drag step.
const DRAG_STEPS: u32 = 8;
/// Virtual time between pointer moves.
const FRAME: Duration = Duration::from_millis(16);

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Select {
        ids: Vec<ItemId>,
        #[serde(default)]
        modifiers: Modifiers,
    },
    SelectAll,
    ClearSelection,
    SelectContents {
        container: ItemId,
    },
    /// Press at `from`, move to `to` in `steps` increments, release.
    Drag {
        from: Point,
        to: Point,
        #[serde(default)]
        steps: Option<u32>,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Align {
        edge: AlignEdge,
    },
    Tidy,
    Resize {
        id: ItemId,
        width: f64,
        height: f64,
    },
    Undo,
    Redo,
    Copy,
    Paste {
        #[serde(default)]
        at: Option<Point>,
    },
    Duplicate,
    Delete,
    SetText {
        id: ItemId,
        text: String,
    },
    /// Secondary-button press.
    ContextMenu {
        at: Point,
    },
    LongPress {
        at: Point,
    },
    TwoFingerTap {
        a: Point,
        b: Point,
    },
    /// Let virtual time pass (flushes due text edits).
    Wait {
        ms: u64,
    },
}

/// A context menu the script caused to open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuOpened {
    pub point: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemId>,
}

impl From<ContextMenuRequest> for MenuOpened {
    fn from(request: ContextMenuRequest) -> Self {
        let item = match request.target {
            ContextTarget::Canvas => None,
            ContextTarget::Item(id) => Some(id),
        };
        Self {
            point: request.point,
            item,
        }
    }
}

/// Final state after a replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub items: Vec<Item>,
    pub selected: Vec<ItemId>,
    pub menus: Vec<MenuOpened>,
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Run every step against the session, starting the virtual clock at `start`.
pub async fn run_script<S: ItemStore, C: SystemClipboard>(
    session: &mut CanvasSession<S, C>,
    steps: &[Step],
    start: mariposa_core::Instant,
) -> ReplayReport {
    let mut now = start;
    let mut menus = Vec::new();

    for (index, step) in steps.iter().enumerate() {
        log::debug!("Step {}: {:?}", index, step);
        match step {
            Step::Select { ids, modifiers } => {
                let engine = session.engine_mut();
                if !modifiers.multi_select() {
                    engine.clear_selection();
                }
                for id in ids {
                    engine.toggle_selection(id);
                }
            }
            Step::SelectAll => session.engine_mut().select_all(),
            Step::ClearSelection => session.engine_mut().clear_selection(),
            Step::SelectContents { container } => {
                session.engine_mut().select_contents(container);
            }
            Step::Drag {
                from,
                to,
                steps,
                modifiers,
            } => {
                let count = steps.unwrap_or(DRAG_STEPS).max(1);
                let engine = session.engine_mut();
                engine.pointer_down(*from, MouseButton::Left, *modifiers);
                for i in 1..=count {
                    let t = f64::from(i) / f64::from(count);
                    engine.pointer_move(from.lerp(*to, t));
                    now += FRAME;
                }
                if let Some(change) = session.pointer_up().await {
                    log::info!("{} changed container: {:?} -> {:?}", change.item, change.from, change.to);
                }
            }
            Step::Align { edge } => {
                session.align(*edge).await;
            }
            Step::Tidy => {
                session.tidy_up().await;
            }
            Step::Resize { id, width, height } => {
                session.resize(id, kurbo::Size::new(*width, *height)).await;
            }
            Step::Undo => {
                session.undo().await;
            }
            Step::Redo => {
                session.redo().await;
            }
            Step::Copy => {
                session.copy().await;
            }
            Step::Paste { at } => {
                session.paste(*at).await;
            }
            Step::Duplicate => {
                session.duplicate_selection().await;
            }
            Step::Delete => {
                session.delete_selection().await;
            }
            Step::SetText { id, text } => session.set_text(id, text, now),
            Step::ContextMenu { at } => {
                if let Some(request) = session
                    .engine_mut()
                    .pointer_down(*at, MouseButton::Right, Modifiers::NONE)
                {
                    menus.push(request.into());
                }
            }
            Step::LongPress { at } => {
                let engine = session.engine_mut();
                engine.touch_start(TouchPoint { id: 0, position: *at }, now);
                if let Some(deadline) = engine.long_press_deadline() {
                    now = deadline;
                }
                if let Some(request) = engine.poll(now) {
                    menus.push(request.into());
                }
                engine.touch_end(0, now);
                engine.take_click_suppression();
            }
            Step::TwoFingerTap { a, b } => {
                let engine = session.engine_mut();
                engine.touch_start(TouchPoint { id: 0, position: *a }, now);
                engine.touch_start(TouchPoint { id: 1, position: *b }, now);
                now += FRAME;
                engine.touch_end(0, now);
                if let Some(request) = engine.touch_end(1, now) {
                    menus.push(request.into());
                }
            }
            Step::Wait { ms } => {
                now += Duration::from_millis(*ms);
            }
        }
        session.flush_due(now).await;
    }

    session.flush_all().await;

    let engine = session.engine();
    ReplayReport {
        items: engine.items().to_vec(),
        selected: engine.selected_ids(),
        menus,
        can_undo: engine.can_undo(),
        can_redo: engine.can_redo(),
    }
}
