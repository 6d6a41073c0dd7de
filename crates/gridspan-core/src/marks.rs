//! Selected points, the derived triangle, and the interaction stage.
//!
//! `MarkState` is the single source of truth for what the user has placed;
//! the renderer is a pure projection of it and is never queried back.

use crate::grid::{GridPoint, GridSpacing};
use serde::{Deserialize, Serialize};

/// Phase of the two-point-to-triangle workflow. Exactly one holds at any
/// time; it is derived from point count and the two flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Empty,
    OnePoint,
    TwoPoints,
    DimensionsShown,
    TriangleShown,
}

/// Horizontal and vertical distances in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub horizontal: f64,
    pub vertical: f64,
}

/// Which corner of the two points' bounding box carries the right angle.
///
/// Chosen by the sign of `dx*dy`. A same-sign pair occupies the top-left
/// and bottom-right corners, leaving bottom-left free for the right angle;
/// an opposite-sign pair leaves bottom-right free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RightAngleCorner {
    BottomRight,
    BottomLeft,
}

/// Outcome of a toggle, so the caller can log or redraw selectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// Two points already selected and the tapped point was a new one.
    Ignored,
}

/// The 0–2 selected grid points plus derived flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkState {
    points: Vec<GridPoint>,
    dimensions_shown: bool,
    triangle: bool,
}

impl MarkState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[GridPoint] {
        &self.points
    }

    /// The two endpoints, once both are placed.
    pub fn pair(&self) -> Option<(GridPoint, GridPoint)> {
        match self.points.as_slice() {
            [a, b] => Some((*a, *b)),
            _ => None,
        }
    }

    pub fn triangle_shown(&self) -> bool {
        self.triangle
    }

    pub fn dimensions_shown(&self) -> bool {
        self.dimensions_shown
    }

    /// Derive the current stage.
    pub fn stage(&self) -> Stage {
        match (self.points.len(), self.dimensions_shown, self.triangle) {
            (0, _, _) => Stage::Empty,
            (1, _, _) => Stage::OnePoint,
            (_, _, true) => Stage::TriangleShown,
            (_, true, _) => Stage::DimensionsShown,
            _ => Stage::TwoPoints,
        }
    }

    /// Select `point` if it is new and fewer than two are held; deselect it
    /// if it is already held. Removing a point drops every derived visual
    /// and reverts the stage to match the remaining count.
    pub fn toggle(&mut self, point: GridPoint) -> ToggleOutcome {
        if let Some(idx) = self.points.iter().position(|p| *p == point) {
            self.points.remove(idx);
            self.dimensions_shown = false;
            self.triangle = false;
            return ToggleOutcome::Removed;
        }
        if self.points.len() >= 2 {
            return ToggleOutcome::Ignored;
        }
        self.points.push(point);
        ToggleOutcome::Added
    }

    /// Measure the horizontal/vertical distances in grid units.
    ///
    /// Valid only with exactly two points and no derived visuals yet;
    /// otherwise a no-op returning `None`. Transitions to
    /// `DimensionsShown`.
    pub fn measure(&mut self, spacing: GridSpacing) -> Option<Dimensions> {
        if self.stage() != Stage::TwoPoints {
            return None;
        }
        let (a, b) = self.pair()?;
        let s = spacing.as_f64();
        self.dimensions_shown = true;
        Some(Dimensions {
            horizontal: (b.x - a.x).abs() / s,
            vertical: (b.y - a.y).abs() / s,
        })
    }

    /// Derive the right triangle from the measured pair. Derive-once: a
    /// second call (or any call outside `DimensionsShown`) is silently
    /// ignored.
    pub fn make_triangle(&mut self) -> bool {
        if self.stage() != Stage::DimensionsShown {
            return false;
        }
        self.triangle = true;
        true
    }

    /// Leg orientation of the derived triangle.
    pub fn right_angle_corner(&self) -> Option<RightAngleCorner> {
        let (a, b) = self.pair()?;
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        Some(if dx * dy >= 0.0 {
            RightAngleCorner::BottomLeft
        } else {
            RightAngleCorner::BottomRight
        })
    }

    /// Unconditionally back to `Empty`.
    pub fn reset(&mut self) {
        self.points.clear();
        self.dimensions_shown = false;
        self.triangle = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> GridPoint {
        GridPoint::new(x, y)
    }

    #[test]
    fn test_stage_progression() {
        let mut marks = MarkState::new();
        assert_eq!(marks.stage(), Stage::Empty);

        assert_eq!(marks.toggle(p(100.0, 100.0)), ToggleOutcome::Added);
        assert_eq!(marks.stage(), Stage::OnePoint);

        assert_eq!(marks.toggle(p(200.0, 300.0)), ToggleOutcome::Added);
        assert_eq!(marks.stage(), Stage::TwoPoints);

        marks.measure(GridSpacing::new(50)).unwrap();
        assert_eq!(marks.stage(), Stage::DimensionsShown);

        assert!(marks.make_triangle());
        assert_eq!(marks.stage(), Stage::TriangleShown);
    }

    #[test]
    fn test_double_toggle_restores_membership() {
        let mut marks = MarkState::new();
        marks.toggle(p(50.0, 50.0));
        marks.toggle(p(100.0, 100.0));
        marks.measure(GridSpacing::new(50)).unwrap();
        marks.make_triangle();

        assert_eq!(marks.toggle(p(100.0, 100.0)), ToggleOutcome::Removed);
        assert_eq!(marks.stage(), Stage::OnePoint);
        assert!(!marks.triangle_shown());
        assert!(!marks.dimensions_shown());

        assert_eq!(marks.toggle(p(100.0, 100.0)), ToggleOutcome::Added);
        assert_eq!(marks.points().len(), 2);
        assert_eq!(marks.stage(), Stage::TwoPoints);
    }

    #[test]
    fn test_third_point_ignored() {
        let mut marks = MarkState::new();
        marks.toggle(p(0.0, 0.0));
        marks.toggle(p(50.0, 0.0));
        assert_eq!(marks.toggle(p(100.0, 0.0)), ToggleOutcome::Ignored);
        assert_eq!(marks.points().len(), 2);
    }

    #[test]
    fn test_measure_reports_grid_units() {
        let mut marks = MarkState::new();
        marks.toggle(p(100.0, 100.0));
        marks.toggle(p(200.0, 300.0));

        let dims = marks.measure(GridSpacing::new(50)).unwrap();
        assert_eq!(dims.horizontal, 2.0);
        assert_eq!(dims.vertical, 4.0);
    }

    #[test]
    fn test_measure_requires_two_points() {
        let mut marks = MarkState::new();
        assert_eq!(marks.measure(GridSpacing::new(50)), None);
        marks.toggle(p(0.0, 0.0));
        assert_eq!(marks.measure(GridSpacing::new(50)), None);
    }

    #[test]
    fn test_make_triangle_is_derive_once() {
        let mut marks = MarkState::new();
        marks.toggle(p(0.0, 0.0));
        marks.toggle(p(50.0, 50.0));
        assert!(!marks.make_triangle()); // measure not yet requested
        marks.measure(GridSpacing::new(50)).unwrap();
        assert!(marks.make_triangle());
        assert!(!marks.make_triangle()); // second call silently ignored
        assert_eq!(marks.stage(), Stage::TriangleShown);
    }

    #[test]
    fn test_right_angle_corner_by_quadrant() {
        let mut marks = MarkState::new();
        marks.toggle(p(0.0, 0.0));
        marks.toggle(p(100.0, 100.0)); // dx*dy > 0, free bottom corner is left
        assert_eq!(
            marks.right_angle_corner(),
            Some(RightAngleCorner::BottomLeft)
        );

        marks.reset();
        marks.toggle(p(0.0, 100.0));
        marks.toggle(p(100.0, 0.0)); // dx*dy < 0, free bottom corner is right
        assert_eq!(
            marks.right_angle_corner(),
            Some(RightAngleCorner::BottomRight)
        );
    }

    #[test]
    fn test_reset_from_any_stage() {
        let mut marks = MarkState::new();
        marks.toggle(p(0.0, 0.0));
        marks.toggle(p(50.0, 50.0));
        marks.measure(GridSpacing::new(50)).unwrap();
        marks.make_triangle();

        marks.reset();
        assert_eq!(marks.stage(), Stage::Empty);
        assert!(marks.points().is_empty());
        assert!(!marks.triangle_shown());
    }
}
