//! Touch gesture disambiguation: long press and two-finger tap both open the
//! context menu, while drags and pinches are left alone.
//!
//! Time is passed in by the caller, so the machine never reads a clock.
//! Hosts call [`TouchGestures::poll`] from their frame or timer callback to
//! fire a pending long press.

use crate::config::EngineConfig;
use crate::input::{Instant, TouchPoint};
use kurbo::Point;
use std::time::Duration;

/// Something the touch stream resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    ContextMenu { point: Point },
}

/// Timing and distance limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureThresholds {
    pub long_press: Duration,
    /// Movement on either axis that cancels a long press.
    pub long_press_tolerance: f64,
    /// Change in finger distance that turns a two-finger tap into a pinch.
    pub pinch_threshold: f64,
    pub two_finger_tap: Duration,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl GestureThresholds {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            long_press: config.long_press(),
            long_press_tolerance: config.long_press_tolerance,
            pinch_threshold: config.pinch_threshold,
            two_finger_tap: config.two_finger_tap(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GestureState {
    Idle,
    PendingLongPress {
        origin: Point,
        started: Instant,
    },
    /// The long press fired; waiting for the finger to lift.
    LongPressFired,
    PendingTwoFingerTap {
        midpoint: Point,
        initial_distance: f64,
        started: Instant,
    },
    /// Nothing more will be emitted until every finger lifts.
    Ignoring,
}

/// Touch gesture state machine.
#[derive(Debug, Clone)]
pub struct TouchGestures {
    thresholds: GestureThresholds,
    state: GestureState,
    touches: Vec<TouchPoint>,
    suppress_click: bool,
}

impl Default for TouchGestures {
    fn default() -> Self {
        Self::new(GestureThresholds::default())
    }
}

fn distance(a: Point, b: Point) -> f64 {
    (b - a).hypot()
}

impl TouchGestures {
    pub fn new(thresholds: GestureThresholds) -> Self {
        Self {
            thresholds,
            state: GestureState::Idle,
            touches: Vec::new(),
            suppress_click: false,
        }
    }

    /// Number of fingers currently down.
    pub fn touch_count(&self) -> usize {
        self.touches.len()
    }

    pub fn is_idle(&self) -> bool {
        self.state == GestureState::Idle
    }

    /// Whether a long press is armed and waiting for `poll`.
    pub fn long_press_pending(&self) -> bool {
        matches!(self.state, GestureState::PendingLongPress { .. })
    }

    /// When the armed long press will fire, if any.
    pub fn long_press_deadline(&self) -> Option<Instant> {
        match self.state {
            GestureState::PendingLongPress { started, .. } => Some(started + self.thresholds.long_press),
            _ => None,
        }
    }

    pub fn touch_start(&mut self, touch: TouchPoint, now: Instant) {
        self.touches.retain(|t| t.id != touch.id);
        self.touches.push(touch);

        self.state = match (self.state, self.touches.len()) {
            (GestureState::Idle, 1) => {
                log::debug!("Long press armed at {:?}", touch.position);
                GestureState::PendingLongPress {
                    origin: touch.position,
                    started: now,
                }
            }
            (GestureState::Idle | GestureState::PendingLongPress { .. }, 2) => {
                let (a, b) = (self.touches[0].position, self.touches[1].position);
                log::debug!("Two-finger tap tracking started");
                GestureState::PendingTwoFingerTap {
                    midpoint: a.midpoint(b),
                    initial_distance: distance(a, b),
                    started: now,
                }
            }
            _ => GestureState::Ignoring,
        };
    }

    pub fn touch_move(&mut self, touch: TouchPoint) {
        let Some(slot) = self.touches.iter_mut().find(|t| t.id == touch.id) else {
            return;
        };
        slot.position = touch.position;

        match self.state {
            GestureState::PendingLongPress { origin, .. } => {
                let delta = touch.position - origin;
                let tolerance = self.thresholds.long_press_tolerance;
                if delta.x.abs() > tolerance || delta.y.abs() > tolerance {
                    log::debug!("Long press cancelled by movement");
                    self.state = GestureState::Ignoring;
                }
            }
            GestureState::PendingTwoFingerTap { initial_distance, .. } if self.touches.len() == 2 => {
                let current = distance(self.touches[0].position, self.touches[1].position);
                if (current - initial_distance).abs() > self.thresholds.pinch_threshold {
                    log::debug!("Two-finger gesture is a pinch");
                    self.state = GestureState::Ignoring;
                }
            }
            _ => {}
        }
    }

    pub fn touch_end(&mut self, id: u64, now: Instant) -> Option<GestureEvent> {
        self.touches.retain(|t| t.id != id);
        if !self.touches.is_empty() {
            return None;
        }

        let state = std::mem::replace(&mut self.state, GestureState::Idle);
        match state {
            GestureState::PendingTwoFingerTap { midpoint, started, .. } => {
                if now.duration_since(started) <= self.thresholds.two_finger_tap {
                    log::debug!("Two-finger tap at {:?}", midpoint);
                    Some(GestureEvent::ContextMenu { point: midpoint })
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Fire the long press if its timer has elapsed. Emits at most once per
    /// press.
    pub fn poll(&mut self, now: Instant) -> Option<GestureEvent> {
        let GestureState::PendingLongPress { origin, started } = self.state else {
            return None;
        };
        if now.duration_since(started) < self.thresholds.long_press {
            return None;
        }
        log::debug!("Long press fired at {:?}", origin);
        self.state = GestureState::LongPressFired;
        self.suppress_click = true;
        Some(GestureEvent::ContextMenu { point: origin })
    }

    /// Returns true once after a long press fired, so the host can swallow
    /// the synthetic click that follows the finger lifting.
    pub fn take_click_suppression(&mut self) -> bool {
        std::mem::take(&mut self.suppress_click)
    }

    /// Touch cancel from the platform: forget everything.
    pub fn cancel(&mut self) {
        self.touches.clear();
        self.state = GestureState::Idle;
    }
}
