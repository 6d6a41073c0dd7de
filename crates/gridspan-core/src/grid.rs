//! Snap grid: lattice enumeration, spacing control and nearest-point queries.

use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

/// Smallest allowed grid spacing in pixels.
pub const MIN_SPACING: u32 = 20;
/// Largest allowed grid spacing in pixels.
pub const MAX_SPACING: u32 = 100;
/// Button increment/decrement step; pinch results also snap to this.
pub const SPACING_STEP: u32 = 5;
/// Spacing used on startup.
pub const DEFAULT_SPACING: u32 = 50;

/// Grid spacing in pixels, always a multiple of 5 within `[20, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpacing(u32);

impl Default for GridSpacing {
    fn default() -> Self {
        Self(DEFAULT_SPACING)
    }
}

impl GridSpacing {
    /// Create a spacing, snapping to the nearest step and clamping to range.
    pub fn new(px: u32) -> Self {
        let stepped = ((px + SPACING_STEP / 2) / SPACING_STEP) * SPACING_STEP;
        Self(stepped.clamp(MIN_SPACING, MAX_SPACING))
    }

    /// Spacing in pixels.
    pub fn px(self) -> u32 {
        self.0
    }

    /// Spacing as `f64`, convenient for coordinate math.
    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }

    /// Grow by one step. Returns the new spacing and whether it changed
    /// (no-op at the upper bound).
    pub fn increased(self) -> (Self, bool) {
        if self.0 >= MAX_SPACING {
            (self, false)
        } else {
            (Self(self.0 + SPACING_STEP), true)
        }
    }

    /// Shrink by one step. No-op at the lower bound.
    pub fn decreased(self) -> (Self, bool) {
        if self.0 <= MIN_SPACING {
            (self, false)
        } else {
            (Self(self.0 - SPACING_STEP), true)
        }
    }

    /// Spacing resulting from a pinch gesture that started at `self`.
    ///
    /// `scale` is the ratio of the current inter-finger distance to the
    /// distance at pinch start. The result snaps to the 5 px step and
    /// clamps to the allowed range.
    pub fn pinched(self, scale: f64) -> Self {
        let step = f64::from(SPACING_STEP);
        let raw = (self.as_f64() * scale / step).round() * step;
        Self((raw as u32).clamp(MIN_SPACING, MAX_SPACING))
    }
}

/// A candidate snap location on the lattice, in viewport pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: f64,
    pub y: f64,
}

impl GridPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_point(self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Euclidean distance to an arbitrary coordinate.
    pub fn distance_to(self, p: Point) -> f64 {
        let dx = self.x - p.x;
        let dy = self.y - p.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Set of candidate snap points for the current viewport and spacing.
///
/// The lattice is anchored at (0, 0) and covers the whole viewport; it is
/// rebuilt whenever the spacing or the viewport size changes. Queries use a
/// true nearest-neighbor scan rather than modulo rounding: the two policies
/// disagree near cell boundaries, and nearest-neighbor is the one the rest
/// of the interaction logic assumes.
#[derive(Debug, Clone)]
pub struct GridIndex {
    spacing: GridSpacing,
    viewport: Size,
    points: Vec<GridPoint>,
    cols: usize,
    rows: usize,
}

impl GridIndex {
    /// Enumerate all lattice points `(i*s, j*s)` within the viewport,
    /// row-major from the origin.
    pub fn new(spacing: GridSpacing, viewport: Size) -> Self {
        let s = spacing.as_f64();
        let cols = (viewport.width / s).floor() as usize + 1;
        let rows = (viewport.height / s).floor() as usize + 1;

        let mut points = Vec::with_capacity(cols * rows);
        for j in 0..rows {
            for i in 0..cols {
                points.push(GridPoint::new(i as f64 * s, j as f64 * s));
            }
        }

        Self {
            spacing,
            viewport,
            points,
            cols,
            rows,
        }
    }

    pub fn spacing(&self) -> GridSpacing {
        self.spacing
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// All lattice points in enumeration (row-major) order.
    pub fn points(&self) -> &[GridPoint] {
        &self.points
    }

    /// Number of lattice columns (`⌊w/s⌋ + 1`).
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of lattice rows (`⌊h/s⌋ + 1`).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// The lattice point minimizing Euclidean distance to `p`.
    ///
    /// Ties break to the first point in enumeration order. Returns `None`
    /// only for a degenerate empty viewport.
    pub fn nearest(&self, p: Point) -> Option<GridPoint> {
        let mut best: Option<(GridPoint, f64)> = None;
        for &gp in &self.points {
            let d = gp.distance_to(p);
            match best {
                Some((_, bd)) if d >= bd => {}
                _ => best = Some((gp, d)),
            }
        }
        best.map(|(gp, _)| gp)
    }

    /// Nearest lattice point, but only if it lies within `tolerance`
    /// pixels of `p`. Out-of-tolerance queries are how stray taps get
    /// silently ignored.
    pub fn nearest_within(&self, p: Point, tolerance: f64) -> Option<GridPoint> {
        self.nearest(p).filter(|gp| gp.distance_to(p) <= tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spacing_default() {
        assert_eq!(GridSpacing::default().px(), 50);
    }

    #[test]
    fn test_spacing_new_snaps_and_clamps() {
        assert_eq!(GridSpacing::new(52).px(), 50);
        assert_eq!(GridSpacing::new(53).px(), 55);
        assert_eq!(GridSpacing::new(0).px(), MIN_SPACING);
        assert_eq!(GridSpacing::new(500).px(), MAX_SPACING);
    }

    #[test]
    fn test_spacing_step_clamped() {
        let (s, changed) = GridSpacing::new(100).increased();
        assert_eq!(s.px(), 100);
        assert!(!changed);

        let (s, changed) = GridSpacing::new(20).decreased();
        assert_eq!(s.px(), 20);
        assert!(!changed);

        let (s, changed) = GridSpacing::new(50).increased();
        assert_eq!(s.px(), 55);
        assert!(changed);
    }

    #[test]
    fn test_spacing_pinched() {
        // Inter-finger distance 100 -> 150 starting at 50px spacing.
        assert_eq!(GridSpacing::new(50).pinched(1.5).px(), 75);
        // Extreme pinches clamp.
        assert_eq!(GridSpacing::new(50).pinched(10.0).px(), MAX_SPACING);
        assert_eq!(GridSpacing::new(50).pinched(0.01).px(), MIN_SPACING);
    }

    #[test]
    fn test_lattice_cardinality() {
        for s in (MIN_SPACING..=MAX_SPACING).step_by(SPACING_STEP as usize) {
            let spacing = GridSpacing::new(s);
            let index = GridIndex::new(spacing, Size::new(390.0, 844.0));
            let expect_cols = (390.0 / f64::from(s)).floor() as usize + 1;
            let expect_rows = (844.0 / f64::from(s)).floor() as usize + 1;
            assert_eq!(index.cols(), expect_cols);
            assert_eq!(index.rows(), expect_rows);
            assert_eq!(index.points().len(), expect_cols * expect_rows);
        }
    }

    #[test]
    fn test_lattice_membership() {
        let index = GridIndex::new(GridSpacing::new(25), Size::new(200.0, 100.0));
        for gp in index.points() {
            assert_eq!(gp.x % 25.0, 0.0);
            assert_eq!(gp.y % 25.0, 0.0);
            assert!(gp.x <= 200.0 && gp.y <= 100.0);
        }
    }

    #[test]
    fn test_nearest_on_lattice_point() {
        let index = GridIndex::new(GridSpacing::new(50), Size::new(400.0, 400.0));
        let gp = index.nearest(Point::new(100.0, 150.0)).unwrap();
        assert_eq!(gp, GridPoint::new(100.0, 150.0));
        assert_eq!(gp.distance_to(Point::new(100.0, 150.0)), 0.0);
    }

    #[test]
    fn test_nearest_minimizes_distance() {
        let index = GridIndex::new(GridSpacing::new(50), Size::new(400.0, 400.0));
        let query = Point::new(112.0, 163.0);
        let gp = index.nearest(query).unwrap();
        let best = index
            .points()
            .iter()
            .map(|p| p.distance_to(query))
            .fold(f64::INFINITY, f64::min);
        assert_eq!(gp.distance_to(query), best);
        assert_eq!(gp, GridPoint::new(100.0, 150.0));
    }

    #[test]
    fn test_nearest_tie_breaks_row_major() {
        let index = GridIndex::new(GridSpacing::new(50), Size::new(400.0, 400.0));
        // Exactly between four lattice points; the first in row-major
        // order wins.
        let gp = index.nearest(Point::new(75.0, 75.0)).unwrap();
        assert_eq!(gp, GridPoint::new(50.0, 50.0));
    }

    #[test]
    fn test_nearest_within_tolerance() {
        let index = GridIndex::new(GridSpacing::new(50), Size::new(400.0, 400.0));
        assert_eq!(
            index.nearest_within(Point::new(110.0, 150.0), 15.0),
            Some(GridPoint::new(100.0, 150.0))
        );
        assert_eq!(index.nearest_within(Point::new(120.0, 170.0), 15.0), None);
    }
}
