//! State for the AR companion view.
//!
//! The companion view takes a measured base and height, validates them,
//! and keeps the resulting prism wireframe around for the render loop to
//! stroke. Projection to screen space is a plain fixed-angle isometric
//! preview; marker tracking proper is an external collaborator.

use glam::Vec3;
use gridspan_core::ar::{self, Edge, TriangleDims};
use kurbo::Point;

/// Companion view state, owned by the application shell.
#[derive(Default)]
pub struct ArViewState {
    /// Whether the companion view is showing instead of the measure page.
    pub active: bool,
    /// Raw text of the base input field, in grid units.
    pub base_input: String,
    /// Raw text of the height input field, in grid units.
    pub height_input: String,
    /// Validation message for the current inputs, if any.
    pub error: Option<String>,
    wireframe: Option<(TriangleDims, Vec<Edge>)>,
}

impl ArViewState {
    /// Prefill the inputs from a finished measurement.
    pub fn prefill(&mut self, base: f64, height: f64) {
        self.base_input = format!("{base}");
        self.height_input = format!("{height}");
    }

    /// Parse and validate the inputs, rebuilding the wireframe on success.
    pub fn submit(&mut self) {
        let parse = |field: &str, name: &str| -> Result<f32, String> {
            field
                .trim()
                .parse::<f32>()
                .map_err(|_| format!("{name} is not a number"))
        };
        let dims = parse(&self.base_input, "Base")
            .and_then(|b| Ok((b, parse(&self.height_input, "Height")?)))
            .and_then(|(b, h)| TriangleDims::new(b, h).map_err(|e| e.to_string()));
        match dims {
            Ok(dims) => {
                self.error = None;
                self.wireframe = Some((dims, ar::wireframe(dims)));
            }
            Err(msg) => {
                self.error = Some(msg);
                self.wireframe = None;
            }
        }
    }

    pub fn dims(&self) -> Option<TriangleDims> {
        self.wireframe.as_ref().map(|(dims, _)| *dims)
    }

    pub fn edges(&self) -> Option<&[Edge]> {
        self.wireframe.as_ref().map(|(_, edges)| edges.as_slice())
    }

    pub fn clear(&mut self) {
        self.error = None;
        self.wireframe = None;
    }
}

/// Project marker-space edges into screen space with a fixed isometric
/// tilt, centered on `center` and scaled by `scale` pixels per marker
/// unit.
pub fn project_edges(edges: &[Edge], center: Point, scale: f64) -> Vec<(Point, Point)> {
    // 30 degree tilt so the prism depth reads as depth on screen.
    const TILT_X: f64 = 0.5;
    const TILT_Y: f64 = 0.25;
    let project = |v: Vec3| -> Point {
        let x = f64::from(v.x) + f64::from(v.z) * TILT_X;
        let y = -f64::from(v.y) - f64::from(v.z) * TILT_Y;
        Point::new(center.x + x * scale, center.y + y * scale)
    };
    edges.iter().map(|[a, b]| (project(*a), project(*b))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_validates_and_builds_wireframe() {
        let mut view = ArViewState::default();
        view.base_input = "15".into();
        view.height_input = "20".into();
        view.submit();
        assert!(view.error.is_none());
        assert_eq!(view.edges().unwrap().len(), 9);
        let dims = view.dims().unwrap();
        assert!((dims.hypotenuse() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_submit_rejects_bad_input() {
        let mut view = ArViewState::default();
        view.base_input = "abc".into();
        view.height_input = "20".into();
        view.submit();
        assert!(view.error.is_some());
        assert!(view.edges().is_none());

        view.base_input = "-3".into();
        view.submit();
        assert!(view.error.is_some());
    }

    #[test]
    fn test_projection_is_centered_and_scaled() {
        let edges = vec![[Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)]];
        let projected = project_edges(&edges, Point::new(100.0, 200.0), 50.0);
        assert_eq!(projected[0].0, Point::new(100.0, 200.0));
        assert_eq!(projected[0].1, Point::new(150.0, 200.0));
    }
}
