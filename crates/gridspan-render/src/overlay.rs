//! Pure projection from mark state to overlay primitives.
//!
//! The display list is a function of `MarkState` alone; both the live
//! Vello renderer and the CPU capture fallback consume it, which is what
//! keeps the fallback a faithful re-render rather than a screen copy.

use gridspan_core::marks::{MarkState, RightAngleCorner, Stage};
use kurbo::Point;

/// Colors and sizes shared by the live overlay and the capture fallback,
/// as RGBA bytes.
pub mod style {
    /// Grid lines: 40% black.
    pub const GRID_LINE: [u8; 4] = [0, 0, 0, 102];
    pub const GRID_LINE_WIDTH: f64 = 1.0;

    /// Mark dots: strong red with a white ring.
    pub const MARK_FILL: [u8; 4] = [255, 0, 0, 230];
    pub const MARK_RING: [u8; 4] = [255, 255, 255, 255];
    pub const MARK_RADIUS: f64 = 6.0;
    pub const MARK_RING_WIDTH: f64 = 2.0;

    /// Connecting segment: 80% blue.
    pub const SEGMENT: [u8; 4] = [0, 0, 255, 204];
    /// Triangle base leg.
    pub const BASE_LINE: [u8; 4] = [255, 255, 0, 255];
    /// Triangle height leg.
    pub const HEIGHT_LINE: [u8; 4] = [255, 0, 0, 255];
    pub const LINE_WIDTH: f64 = 3.0;

    /// Translucent green triangle fill.
    pub const TRIANGLE_FILL: [u8; 4] = [0, 255, 0, 128];
}

/// One visible overlay element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayPrimitive {
    MarkDot { center: Point },
    Segment { from: Point, to: Point },
    BaseLine { from: Point, to: Point },
    HeightLine { from: Point, to: Point },
    /// Closed fill hull: the two marks plus both bottom corners of their
    /// bounding box. One mark coincides with a bottom corner, so the hull
    /// degenerates to the right triangle under the hypotenuse.
    TriangleFill { hull: [Point; 4] },
}

/// Project the current marks into drawing order (fill below lines below
/// dots).
pub fn project(marks: &MarkState) -> Vec<OverlayPrimitive> {
    let mut out = Vec::new();

    if let Some((a, b)) = marks.pair() {
        let (a, b) = (a.to_point(), b.to_point());
        let min_x = a.x.min(b.x);
        let max_x = a.x.max(b.x);
        let min_y = a.y.min(b.y);
        let max_y = a.y.max(b.y);

        if marks.stage() == Stage::TriangleShown {
            out.push(OverlayPrimitive::TriangleFill {
                hull: [
                    a,
                    b,
                    Point::new(min_x, max_y),
                    Point::new(max_x, max_y),
                ],
            });
            out.push(OverlayPrimitive::BaseLine {
                from: Point::new(min_x, max_y),
                to: Point::new(max_x, max_y),
            });
            // The height leg stands at the right-angle corner.
            let corner_x = match marks.right_angle_corner() {
                Some(RightAngleCorner::BottomRight) => max_x,
                _ => min_x,
            };
            out.push(OverlayPrimitive::HeightLine {
                from: Point::new(corner_x, min_y),
                to: Point::new(corner_x, max_y),
            });
        }

        out.push(OverlayPrimitive::Segment { from: a, to: b });
    }

    for p in marks.points() {
        out.push(OverlayPrimitive::MarkDot {
            center: p.to_point(),
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridspan_core::grid::{GridPoint, GridSpacing};

    fn marks_with(points: &[(f64, f64)]) -> MarkState {
        let mut marks = MarkState::new();
        for &(x, y) in points {
            marks.toggle(GridPoint::new(x, y));
        }
        marks
    }

    #[test]
    fn test_empty_projects_nothing() {
        assert!(project(&MarkState::new()).is_empty());
    }

    #[test]
    fn test_one_point_is_a_single_dot() {
        let prims = project(&marks_with(&[(100.0, 100.0)]));
        assert_eq!(
            prims,
            vec![OverlayPrimitive::MarkDot {
                center: Point::new(100.0, 100.0)
            }]
        );
    }

    #[test]
    fn test_two_points_add_segment_under_dots() {
        let prims = project(&marks_with(&[(100.0, 100.0), (200.0, 300.0)]));
        assert_eq!(prims.len(), 3);
        assert_eq!(
            prims[0],
            OverlayPrimitive::Segment {
                from: Point::new(100.0, 100.0),
                to: Point::new(200.0, 300.0)
            }
        );
        assert!(matches!(prims[1], OverlayPrimitive::MarkDot { .. }));
        assert!(matches!(prims[2], OverlayPrimitive::MarkDot { .. }));
    }

    #[test]
    fn test_triangle_stage_projects_legs_and_fill() {
        let mut marks = marks_with(&[(100.0, 100.0), (200.0, 300.0)]);
        marks.measure(GridSpacing::new(50)).unwrap();
        assert!(marks.make_triangle());

        let prims = project(&marks);
        assert_eq!(prims.len(), 6);
        assert!(matches!(prims[0], OverlayPrimitive::TriangleFill { .. }));
        assert_eq!(
            prims[1],
            OverlayPrimitive::BaseLine {
                from: Point::new(100.0, 300.0),
                to: Point::new(200.0, 300.0)
            }
        );
        // dx*dy > 0: right angle bottom-left, height leg at min_x.
        assert_eq!(
            prims[2],
            OverlayPrimitive::HeightLine {
                from: Point::new(100.0, 100.0),
                to: Point::new(100.0, 300.0)
            }
        );
    }

    #[test]
    fn test_height_leg_follows_right_angle_corner() {
        // dx*dy < 0: right angle bottom-right.
        let mut marks = marks_with(&[(100.0, 300.0), (200.0, 100.0)]);
        marks.measure(GridSpacing::new(50)).unwrap();
        marks.make_triangle();

        let height = project(&marks)
            .into_iter()
            .find_map(|p| match p {
                OverlayPrimitive::HeightLine { from, to } => Some((from, to)),
                _ => None,
            })
            .unwrap();
        assert_eq!(height.0.x, 200.0);
        assert_eq!(height.1.x, 200.0);
    }
}
