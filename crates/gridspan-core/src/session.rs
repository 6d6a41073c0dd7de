//! Top-level measurement session.
//!
//! `MeasureSession` owns all interaction state explicitly — grid spacing,
//! the snap index, the selected marks, the gesture interpreter and the
//! reserved control regions — and sequences every mutation itself. There is
//! no module-level state and no behavior passed around as callbacks.

use crate::controls::{ControlRegions, ControlVisibility};
use crate::gesture::{GestureConfig, GestureEvent, GestureInterpreter};
use crate::grid::{GridIndex, GridPoint, GridSpacing};
use crate::marks::{Dimensions, MarkState, Stage, ToggleOutcome};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

/// Serializable view of the session used by the capture fallback renderer
/// to re-render the overlay deterministically, without touching the live
/// session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub spacing: GridSpacing,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub points: Vec<GridPoint>,
    pub dimensions: Option<Dimensions>,
    pub triangle: bool,
}

/// The application controller for the measurement page.
#[derive(Debug, Clone)]
pub struct MeasureSession {
    spacing: GridSpacing,
    index: GridIndex,
    marks: MarkState,
    gestures: GestureInterpreter,
    regions: ControlRegions,
    viewport: Size,
    /// Spacing at the start of the pinch currently in progress.
    pinch_base: Option<GridSpacing>,
    /// Last measured dimensions, kept for the readout and the capture
    /// fallback. Cleared with the marks.
    dimensions: Option<Dimensions>,
}

impl MeasureSession {
    pub fn new(viewport: Size) -> Self {
        Self::with_config(viewport, GestureConfig::default())
    }

    pub fn with_config(viewport: Size, config: GestureConfig) -> Self {
        let spacing = GridSpacing::default();
        Self {
            spacing,
            index: GridIndex::new(spacing, viewport),
            marks: MarkState::new(),
            gestures: GestureInterpreter::new(config),
            regions: ControlRegions::new(),
            viewport,
            pinch_base: None,
            dimensions: None,
        }
    }

    pub fn spacing(&self) -> GridSpacing {
        self.spacing
    }

    pub fn index(&self) -> &GridIndex {
        &self.index
    }

    pub fn marks(&self) -> &MarkState {
        &self.marks
    }

    pub fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }

    pub fn stage(&self) -> Stage {
        self.marks.stage()
    }

    pub fn visibility(&self) -> ControlVisibility {
        ControlVisibility::for_stage(self.stage())
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Mutable access for the UI layer to re-register button/panel rects
    /// each frame.
    pub fn regions_mut(&mut self) -> &mut ControlRegions {
        &mut self.regions
    }

    // -- raw input entry points -------------------------------------------

    pub fn on_mouse_click(&mut self, position: Point) {
        if let Some(event) = self.gestures.mouse_click(position, &self.regions) {
            self.apply(event);
        }
    }

    pub fn on_touch_start(&mut self, id: u64, position: Point) {
        if let Some(event) = self.gestures.touch_start(id, position, &self.regions) {
            self.apply(event);
        }
    }

    pub fn on_touch_move(&mut self, id: u64, position: Point) {
        if let Some(event) = self.gestures.touch_move(id, position) {
            self.apply(event);
        }
    }

    pub fn on_touch_end(&mut self, id: u64, position: Point) {
        if let Some(event) = self.gestures.touch_end(id, position, &self.regions) {
            self.apply(event);
        }
    }

    pub fn on_touch_cancel(&mut self) {
        self.gestures.cancel();
        self.pinch_base = None;
    }

    // -- interpreted intents ----------------------------------------------

    /// Act on a classified gesture.
    pub fn apply(&mut self, event: GestureEvent) {
        match event {
            GestureEvent::Tap {
                position,
                tolerance,
            } => self.tap(position, tolerance),
            GestureEvent::PinchUpdate { scale } => {
                let base = *self.pinch_base.get_or_insert(self.spacing);
                let candidate = base.pinched(scale);
                if candidate != self.spacing {
                    self.set_spacing(candidate);
                }
            }
            GestureEvent::PinchEnd => {
                self.pinch_base = None;
            }
        }
    }

    /// Snap a tap to the nearest lattice point within tolerance and toggle
    /// it. Taps outside tolerance are silently ignored.
    fn tap(&mut self, position: Point, tolerance: f64) {
        let Some(snapped) = self.index.nearest_within(position, tolerance) else {
            log::debug!("tap at {position:?} outside snap tolerance {tolerance}");
            return;
        };
        match self.marks.toggle(snapped) {
            ToggleOutcome::Added => log::debug!("mark added at {snapped:?}"),
            ToggleOutcome::Removed => {
                log::debug!("mark removed at {snapped:?}");
                self.dimensions = None;
            }
            ToggleOutcome::Ignored => {}
        }
    }

    // -- stage actions -----------------------------------------------------

    /// "Measure length" button: TwoPoints -> DimensionsShown.
    pub fn measure(&mut self) -> Option<Dimensions> {
        let dims = self.marks.measure(self.spacing)?;
        self.dimensions = Some(dims);
        Some(dims)
    }

    /// "Make triangle" button: DimensionsShown -> TriangleShown.
    pub fn make_triangle(&mut self) -> bool {
        self.marks.make_triangle()
    }

    /// Clear all marks and derived visuals.
    pub fn reset(&mut self) {
        self.marks.reset();
        self.dimensions = None;
    }

    // -- grid spacing ------------------------------------------------------

    /// Grow the grid by one step. Implicit reset happens even when the
    /// spacing is already at its bound.
    pub fn increase_spacing(&mut self) {
        self.reset();
        let (next, changed) = self.spacing.increased();
        if changed {
            self.set_spacing_only(next);
        }
    }

    /// Shrink the grid by one step, with the same implicit reset.
    pub fn decrease_spacing(&mut self) {
        self.reset();
        let (next, changed) = self.spacing.decreased();
        if changed {
            self.set_spacing_only(next);
        }
    }

    /// Spacing change from a pinch: reset first, then rebuild the index.
    fn set_spacing(&mut self, spacing: GridSpacing) {
        self.reset();
        self.set_spacing_only(spacing);
    }

    fn set_spacing_only(&mut self, spacing: GridSpacing) {
        self.spacing = spacing;
        self.index = GridIndex::new(spacing, self.viewport);
        log::debug!("grid spacing now {}px", spacing.px());
    }

    /// Rebuild the snap index for a new viewport. Marks stay lattice-valid
    /// because the lattice is anchored at the origin; only points that fell
    /// off the visible area are dropped.
    pub fn resize(&mut self, viewport: Size) {
        self.viewport = viewport;
        self.index = GridIndex::new(self.spacing, viewport);

        let out_of_bounds: Vec<GridPoint> = self
            .marks
            .points()
            .iter()
            .copied()
            .filter(|p| p.x > viewport.width || p.y > viewport.height)
            .collect();
        for p in out_of_bounds {
            self.marks.toggle(p);
            self.dimensions = None;
        }
    }

    /// State needed to re-render the overlay off-screen.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            spacing: self.spacing,
            viewport_width: self.viewport.width,
            viewport_height: self.viewport.height,
            points: self.marks.points().to_vec(),
            dimensions: self.dimensions,
            triangle: self.marks.triangle_shown(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::ControlId;
    use kurbo::Rect;

    fn session() -> MeasureSession {
        MeasureSession::new(Size::new(400.0, 800.0))
    }

    fn tap(s: &mut MeasureSession, x: f64, y: f64) {
        s.apply(GestureEvent::Tap {
            position: Point::new(x, y),
            tolerance: 15.0,
        });
    }

    #[test]
    fn test_tap_snaps_and_toggles() {
        let mut s = session();
        tap(&mut s, 104.0, 96.0);
        assert_eq!(s.marks().points(), &[GridPoint::new(100.0, 100.0)]);

        tap(&mut s, 104.0, 96.0);
        assert!(s.marks().points().is_empty());
    }

    #[test]
    fn test_tap_outside_tolerance_ignored() {
        let mut s = session();
        tap(&mut s, 120.0, 125.0); // 50px grid, >15px from any lattice point
        assert!(s.marks().points().is_empty());
    }

    #[test]
    fn test_measure_scenario() {
        let mut s = session();
        tap(&mut s, 100.0, 100.0);
        tap(&mut s, 200.0, 300.0);
        assert_eq!(s.stage(), Stage::TwoPoints);

        let dims = s.measure().unwrap();
        assert_eq!(dims.horizontal, 2.0);
        assert_eq!(dims.vertical, 4.0);
        assert_eq!(s.stage(), Stage::DimensionsShown);

        assert!(s.make_triangle());
        assert_eq!(s.stage(), Stage::TriangleShown);
    }

    #[test]
    fn test_pinch_commits_through_base_spacing() {
        let mut s = session();
        s.apply(GestureEvent::PinchUpdate { scale: 1.5 });
        assert_eq!(s.spacing().px(), 75);
        // Subsequent updates scale from the pinch-start spacing, not the
        // intermediate one.
        s.apply(GestureEvent::PinchUpdate { scale: 2.0 });
        assert_eq!(s.spacing().px(), 100);
        s.apply(GestureEvent::PinchEnd);

        // A new pinch starts from the committed spacing.
        s.apply(GestureEvent::PinchUpdate { scale: 0.5 });
        assert_eq!(s.spacing().px(), 50);
    }

    #[test]
    fn test_spacing_change_clears_marks_any_stage() {
        let mut s = session();
        tap(&mut s, 100.0, 100.0);
        tap(&mut s, 200.0, 300.0);
        s.measure().unwrap();
        s.make_triangle();

        s.increase_spacing();
        assert_eq!(s.stage(), Stage::Empty);
        assert_eq!(s.spacing().px(), 55);
        assert_eq!(s.dimensions(), None);
    }

    #[test]
    fn test_spacing_buttons_clamp() {
        let mut s = session();
        for _ in 0..20 {
            s.increase_spacing();
        }
        assert_eq!(s.spacing().px(), 100);
        for _ in 0..30 {
            s.decrease_spacing();
        }
        assert_eq!(s.spacing().px(), 20);
    }

    #[test]
    fn test_pinch_clears_marks() {
        let mut s = session();
        tap(&mut s, 100.0, 100.0);
        s.apply(GestureEvent::PinchUpdate { scale: 1.2 });
        assert!(s.marks().points().is_empty());
    }

    #[test]
    fn test_click_inside_button_never_toggles() {
        let mut s = session();
        // Button over the lattice point (100, 100).
        s.regions_mut()
            .register_button(ControlId::Reset, Rect::new(90.0, 90.0, 110.0, 110.0));
        s.on_mouse_click(Point::new(100.0, 100.0));
        assert!(s.marks().points().is_empty());

        // Just outside the button, the same lattice point snaps.
        s.on_mouse_click(Point::new(112.0, 88.0));
        assert_eq!(s.marks().points(), &[GridPoint::new(100.0, 100.0)]);
    }

    #[test]
    fn test_resize_drops_out_of_bounds_marks() {
        let mut s = session();
        tap(&mut s, 100.0, 100.0);
        tap(&mut s, 350.0, 700.0);
        s.resize(Size::new(300.0, 600.0));
        assert_eq!(s.marks().points(), &[GridPoint::new(100.0, 100.0)]);
        // Index was rebuilt for the smaller viewport.
        assert_eq!(s.index().cols(), 7);
    }

    #[test]
    fn test_snapshot_round_trips_as_json() {
        let mut s = session();
        tap(&mut s, 100.0, 100.0);
        tap(&mut s, 200.0, 300.0);
        s.measure().unwrap();

        let snap = s.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let back: SessionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.points.len(), 2);
        assert_eq!(back.spacing.px(), 50);
        assert!(!back.triangle);
    }
}
