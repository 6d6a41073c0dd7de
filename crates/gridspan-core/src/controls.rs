//! Reserved control regions and per-stage control visibility.

use crate::marks::Stage;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// The interactive controls of the measurement page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlId {
    Reset,
    MeasureLength,
    MakeTriangle,
    Capture,
    GridIncrease,
    GridDecrease,
}

/// A screen rectangle that must never be interpreted as a snap tap.
#[derive(Debug, Clone, Copy)]
pub enum ControlRegion {
    /// An individual button's bounding box.
    Button(ControlId, Rect),
    /// The control panel or info panel as a whole.
    Panel(Rect),
}

impl ControlRegion {
    fn rect(&self) -> Rect {
        match self {
            ControlRegion::Button(_, r) | ControlRegion::Panel(r) => *r,
        }
    }
}

/// Per-frame registry of reserved screen regions.
///
/// The UI layer re-registers every visible button and panel rectangle each
/// frame; the gesture interpreter discards pointer events that land inside
/// any of them before classification.
#[derive(Debug, Clone, Default)]
pub struct ControlRegions {
    regions: Vec<ControlRegion>,
}

impl ControlRegions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all regions; called at the start of each UI frame.
    pub fn clear(&mut self) {
        self.regions.clear();
    }

    pub fn register_button(&mut self, id: ControlId, rect: Rect) {
        self.regions.push(ControlRegion::Button(id, rect));
    }

    pub fn register_panel(&mut self, rect: Rect) {
        self.regions.push(ControlRegion::Panel(rect));
    }

    /// Whether a pointer coordinate falls inside any reserved region.
    pub fn contains(&self, p: Point) -> bool {
        self.regions.iter().any(|r| r.rect().contains(p))
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Which controls are visible in a given interaction stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlVisibility {
    pub reset: bool,
    pub measure_length: bool,
    pub make_triangle: bool,
    pub capture: bool,
    pub grid_adjust: bool,
}

impl ControlVisibility {
    /// The visibility table for the two-point-to-triangle workflow.
    ///
    /// Reset and Capture are always available; the measure and triangle
    /// buttons appear only at the step that consumes them; grid sizing is
    /// locked once two points are placed.
    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Empty | Stage::OnePoint => Self {
                reset: true,
                measure_length: false,
                make_triangle: false,
                capture: true,
                grid_adjust: true,
            },
            Stage::TwoPoints => Self {
                reset: true,
                measure_length: true,
                make_triangle: false,
                capture: true,
                grid_adjust: false,
            },
            Stage::DimensionsShown => Self {
                reset: true,
                measure_length: false,
                make_triangle: true,
                capture: true,
                grid_adjust: false,
            },
            Stage::TriangleShown => Self {
                reset: true,
                measure_length: false,
                make_triangle: false,
                capture: true,
                grid_adjust: false,
            },
        }
    }

    /// Whether a particular control is shown.
    pub fn shows(&self, id: ControlId) -> bool {
        match id {
            ControlId::Reset => self.reset,
            ControlId::MeasureLength => self.measure_length,
            ControlId::MakeTriangle => self.make_triangle,
            ControlId::Capture => self.capture,
            ControlId::GridIncrease | ControlId::GridDecrease => self.grid_adjust,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_button_and_panel() {
        let mut regions = ControlRegions::new();
        regions.register_button(ControlId::Reset, Rect::new(10.0, 10.0, 60.0, 40.0));
        regions.register_panel(Rect::new(0.0, 700.0, 390.0, 844.0));

        assert!(regions.contains(Point::new(20.0, 20.0)));
        assert!(regions.contains(Point::new(100.0, 800.0)));
        assert!(!regions.contains(Point::new(200.0, 200.0)));

        regions.clear();
        assert!(!regions.contains(Point::new(20.0, 20.0)));
    }

    #[test]
    fn test_visibility_table() {
        for stage in [Stage::Empty, Stage::OnePoint] {
            let v = ControlVisibility::for_stage(stage);
            assert!(v.reset && v.capture && v.grid_adjust);
            assert!(!v.measure_length && !v.make_triangle);
        }

        let v = ControlVisibility::for_stage(Stage::TwoPoints);
        assert!(v.reset && v.capture && v.measure_length);
        assert!(!v.make_triangle && !v.grid_adjust);

        let v = ControlVisibility::for_stage(Stage::DimensionsShown);
        assert!(v.reset && v.capture && v.make_triangle);
        assert!(!v.measure_length && !v.grid_adjust);

        let v = ControlVisibility::for_stage(Stage::TriangleShown);
        assert!(v.reset && v.capture);
        assert!(!v.measure_length && !v.make_triangle && !v.grid_adjust);
    }

    #[test]
    fn test_shows_maps_ids() {
        let v = ControlVisibility::for_stage(Stage::Empty);
        assert!(v.shows(ControlId::GridIncrease));
        assert!(v.shows(ControlId::GridDecrease));
        assert!(!v.shows(ControlId::MeasureLength));
    }
}
