//! Gesture interpreter: classifies raw pointer/touch input into taps and
//! pinches.
//!
//! Classification is pure — the interpreter only reports intents and never
//! touches session state. Events landing inside a reserved control region
//! are discarded before they are considered at all.

use crate::controls::ControlRegions;
use kurbo::Point;
use std::collections::HashMap;
use std::time::Duration;

// Use web_time for WASM compatibility
#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Tuning constants for gesture classification.
///
/// These were tuned empirically on real devices; treat them as
/// configuration, not contract.
#[derive(Debug, Clone, Copy)]
pub struct GestureConfig {
    /// A touch sequence longer than this is not a tap.
    pub tap_max_duration: Duration,
    /// Snap tolerance for touch taps (fingers are imprecise).
    pub touch_snap_tolerance: f64,
    /// Snap tolerance for mouse clicks.
    pub mouse_snap_tolerance: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            tap_max_duration: Duration::from_millis(300),
            touch_snap_tolerance: 20.0,
            mouse_snap_tolerance: 15.0,
        }
    }
}

/// An interpreted pointer intent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    /// A short single-contact touch, or a mouse click. Carries the snap
    /// tolerance appropriate to the input device.
    Tap { position: Point, tolerance: f64 },
    /// Live pinch scale relative to the inter-finger distance at pinch
    /// start.
    PinchUpdate { scale: f64 },
    /// All pinch contacts lifted; the last reported scale is final.
    PinchEnd,
}

/// What the current touch sequence has been classified as so far.
#[derive(Debug, Clone)]
enum Sequence {
    Idle,
    /// One finger down, still a tap candidate.
    Single { id: u64, started: Instant },
    /// Two contacts were reached; tap logic is suppressed for the rest of
    /// the sequence.
    Pinch { start_distance: f64 },
    /// Pinch fingers are lifting, or the tap candidate was disqualified.
    /// Remaining contacts are ignored until the sequence drains.
    Draining,
}

/// Stateful classifier for one pointer surface.
#[derive(Debug, Clone)]
pub struct GestureInterpreter {
    config: GestureConfig,
    touches: HashMap<u64, Point>,
    sequence: Sequence,
}

impl Default for GestureInterpreter {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl GestureInterpreter {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            touches: HashMap::new(),
            sequence: Sequence::Idle,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// A mouse click is a tap with the desktop tolerance; there is no
    /// mouse pinch equivalent.
    pub fn mouse_click(&self, position: Point, regions: &ControlRegions) -> Option<GestureEvent> {
        if regions.contains(position) {
            return None;
        }
        Some(GestureEvent::Tap {
            position,
            tolerance: self.config.mouse_snap_tolerance,
        })
    }

    /// Register a new touch contact.
    pub fn touch_start(
        &mut self,
        id: u64,
        position: Point,
        regions: &ControlRegions,
    ) -> Option<GestureEvent> {
        if regions.contains(position) {
            // Reserved region: the contact never enters classification.
            return None;
        }
        self.touches.insert(id, position);

        match (&self.sequence, self.touches.len()) {
            (Sequence::Idle, 1) => {
                self.sequence = Sequence::Single {
                    id,
                    started: Instant::now(),
                };
                None
            }
            (Sequence::Single { .. }, 2) => {
                // Second simultaneous contact: the whole sequence becomes a
                // pinch, the pending tap is dropped.
                let start_distance = self.contact_distance().max(1.0);
                self.sequence = Sequence::Pinch { start_distance };
                None
            }
            _ => None,
        }
    }

    /// Update a moving contact. Emits live scale updates while pinching.
    pub fn touch_move(&mut self, id: u64, position: Point) -> Option<GestureEvent> {
        if let Some(p) = self.touches.get_mut(&id) {
            *p = position;
        }
        if let Sequence::Pinch { start_distance } = self.sequence {
            if self.touches.len() >= 2 {
                let scale = self.contact_distance() / start_distance;
                return Some(GestureEvent::PinchUpdate { scale });
            }
        }
        None
    }

    /// Lift a contact. A short lone contact outside the control regions
    /// becomes a tap; the first finger leaving a pinch ends it.
    pub fn touch_end(
        &mut self,
        id: u64,
        position: Point,
        regions: &ControlRegions,
    ) -> Option<GestureEvent> {
        let duration = match self.sequence {
            Sequence::Single { id: sid, started } if sid == id => Some(started.elapsed()),
            _ => None,
        };
        self.finish_touch(id, position, duration, regions)
    }

    /// Shared tail of `touch_end`, with the measured duration passed in.
    fn finish_touch(
        &mut self,
        id: u64,
        position: Point,
        duration: Option<Duration>,
        regions: &ControlRegions,
    ) -> Option<GestureEvent> {
        self.touches.remove(&id);

        match self.sequence {
            Sequence::Single { id: sid, .. } if sid == id => {
                self.sequence = Sequence::Idle;
                let duration = duration?;
                if duration <= self.config.tap_max_duration && !regions.contains(position) {
                    Some(GestureEvent::Tap {
                        position,
                        tolerance: self.config.touch_snap_tolerance,
                    })
                } else {
                    None
                }
            }
            Sequence::Pinch { .. } => {
                // Pinch ends on the first lift; any remaining contact must
                // not turn into a tap.
                self.sequence = if self.touches.is_empty() {
                    Sequence::Idle
                } else {
                    Sequence::Draining
                };
                Some(GestureEvent::PinchEnd)
            }
            _ => {
                if self.touches.is_empty() {
                    self.sequence = Sequence::Idle;
                }
                None
            }
        }
    }

    /// Abort the current sequence (e.g. a platform touch-cancel).
    pub fn cancel(&mut self) {
        self.touches.clear();
        self.sequence = Sequence::Idle;
    }

    /// Distance between the first two tracked contacts.
    fn contact_distance(&self) -> f64 {
        let mut it = self.touches.values();
        match (it.next(), it.next()) {
            (Some(a), Some(b)) => a.distance(*b),
            _ => 0.0,
        }
    }
}
