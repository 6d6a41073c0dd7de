//! Geometry for the AR companion page.
//!
//! The companion page takes a measured base and height, derives the
//! hypotenuse and builds a right-triangle prism wireframe to hand to the
//! marker-tracking renderer. Tracking and rendering are external
//! collaborators; this module only produces geometry.

use glam::Vec3;
use thiserror::Error;

/// Marker units per grid unit; measured lengths are scaled down by this
/// before being placed on the marker.
pub const MARKER_SCALE: f32 = 5.0;

/// Thickness of the extruded prism along the marker normal.
const PRISM_DEPTH: f32 = 1.0;

#[derive(Debug, Error, PartialEq)]
pub enum ArInputError {
    #[error("base and height must both be positive")]
    NonPositive,
    #[error("base and height must be finite numbers")]
    NotFinite,
}

/// Validated triangle dimensions in marker units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleDims {
    base: f32,
    height: f32,
}

impl TriangleDims {
    /// Validate raw user input (in grid units) and scale to marker units.
    pub fn new(base: f32, height: f32) -> Result<Self, ArInputError> {
        if !base.is_finite() || !height.is_finite() {
            return Err(ArInputError::NotFinite);
        }
        if base <= 0.0 || height <= 0.0 {
            return Err(ArInputError::NonPositive);
        }
        Ok(Self {
            base: base / MARKER_SCALE,
            height: height / MARKER_SCALE,
        })
    }

    pub fn base(self) -> f32 {
        self.base
    }

    pub fn height(self) -> f32 {
        self.height
    }

    pub fn hypotenuse(self) -> f32 {
        (self.base * self.base + self.height * self.height).sqrt()
    }
}

/// A straight wireframe edge between two marker-space vertices.
pub type Edge = [Vec3; 2];

/// Build the wireframe of a right-triangle prism standing on the marker.
///
/// The triangle lies in the marker plane with the right angle at
/// `(base, 0)`; the prism extrudes `PRISM_DEPTH` along the marker normal,
/// mirroring the original page's twin triangle faces.
pub fn wireframe(dims: TriangleDims) -> Vec<Edge> {
    let b = dims.base;
    let h = dims.height;
    let half = PRISM_DEPTH / 2.0;

    let face = |z: f32| -> [Vec3; 3] {
        [
            Vec3::new(0.0, 0.0, z),
            Vec3::new(b, 0.0, z),
            Vec3::new(b, h, z),
        ]
    };
    let near = face(-half);
    let far = face(half);

    let mut edges = Vec::with_capacity(9);
    // Both triangle faces.
    for f in [near, far] {
        edges.push([f[0], f[1]]); // base
        edges.push([f[1], f[2]]); // height
        edges.push([f[2], f[0]]); // hypotenuse
    }
    // Connecting rails between the faces.
    for i in 0..3 {
        edges.push([near[i], far[i]]);
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_validation() {
        assert_eq!(TriangleDims::new(0.0, 5.0), Err(ArInputError::NonPositive));
        assert_eq!(TriangleDims::new(3.0, -1.0), Err(ArInputError::NonPositive));
        assert_eq!(
            TriangleDims::new(f32::NAN, 1.0),
            Err(ArInputError::NotFinite)
        );
        assert!(TriangleDims::new(3.0, 4.0).is_ok());
    }

    #[test]
    fn test_marker_scaling_and_hypotenuse() {
        let dims = TriangleDims::new(15.0, 20.0).unwrap();
        assert_eq!(dims.base(), 3.0);
        assert_eq!(dims.height(), 4.0);
        assert!((dims.hypotenuse() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_wireframe_edge_count_and_right_angle() {
        let dims = TriangleDims::new(15.0, 20.0).unwrap();
        let edges = wireframe(dims);
        assert_eq!(edges.len(), 9);

        // The base and height edges of the near face meet at the right
        // angle corner and are perpendicular.
        let base = edges[0][1] - edges[0][0];
        let height = edges[1][1] - edges[1][0];
        assert_eq!(base.dot(height), 0.0);

        // Hypotenuse edge has the derived length.
        let hyp = edges[2][1] - edges[2][0];
        assert!((hyp.length() - dims.hypotenuse()).abs() < 1e-6);
    }
}
