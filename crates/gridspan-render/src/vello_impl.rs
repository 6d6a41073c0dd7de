//! Vello-based overlay renderer.

use crate::capture::VideoFrame;
use crate::overlay::{self, style, OverlayPrimitive};
use crate::renderer::{OverlayContext, Renderer};
use kurbo::{Affine, BezPath, Circle, Point, Size, Stroke};
use peniko::{Color, Fill};
use std::sync::Arc;
use vello::Scene;

fn color(rgba: [u8; 4]) -> Color {
    Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3])
}

/// GPU overlay renderer. Builds a [`Scene`] from the camera frame, the
/// grid and the projected mark primitives each frame.
#[derive(Default)]
pub struct VelloOverlayRenderer {
    scene: Scene,
}

impl VelloOverlayRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the scene at the start of a frame, before the camera frame
    /// and overlay are drawn into it.
    pub fn begin_frame(&mut self) {
        self.scene.reset();
    }

    /// The scene built by the last `build_scene` call.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Take ownership of the built scene (for offscreen capture).
    pub fn take_scene(&mut self) -> Scene {
        std::mem::take(&mut self.scene)
    }

    /// Draw the latest camera frame stretched to the viewport, beneath the
    /// overlay. Must be called before `build_scene` composites on top.
    pub fn draw_camera_frame(&mut self, frame: &VideoFrame, viewport: Size) {
        let image_data = peniko::ImageData {
            data: peniko::Blob::new(Arc::new(frame.rgba.clone())),
            format: peniko::ImageFormat::Rgba8,
            width: frame.width,
            height: frame.height,
            alpha_type: peniko::ImageAlphaType::Alpha,
        };

        let scale_x = viewport.width / f64::from(frame.width);
        let scale_y = viewport.height / f64::from(frame.height);
        let transform = Affine::scale_non_uniform(scale_x, scale_y);
        self.scene.draw_image(&image_data, transform);
    }

    fn render_grid_lines(&mut self, viewport: Size, transform: Affine, spacing: f64) {
        let grid_color = color(style::GRID_LINE);
        let stroke = Stroke::new(style::GRID_LINE_WIDTH);

        let mut path = BezPath::new();
        let mut x = 0.0;
        while x <= viewport.width {
            path.move_to(Point::new(x, 0.0));
            path.line_to(Point::new(x, viewport.height));
            x += spacing;
        }
        let mut y = 0.0;
        while y <= viewport.height {
            path.move_to(Point::new(0.0, y));
            path.line_to(Point::new(viewport.width, y));
            y += spacing;
        }
        self.scene.stroke(&stroke, transform, grid_color, None, &path);
    }

    fn render_primitive(&mut self, prim: &OverlayPrimitive, transform: Affine) {
        let line = Stroke::new(style::LINE_WIDTH);
        match prim {
            OverlayPrimitive::MarkDot { center } => {
                let dot = Circle::new(*center, style::MARK_RADIUS);
                self.scene
                    .fill(Fill::NonZero, transform, color(style::MARK_FILL), None, &dot);
                self.scene.stroke(
                    &Stroke::new(style::MARK_RING_WIDTH),
                    transform,
                    color(style::MARK_RING),
                    None,
                    &dot,
                );
            }
            OverlayPrimitive::Segment { from, to } => {
                let mut path = BezPath::new();
                path.move_to(*from);
                path.line_to(*to);
                self.scene
                    .stroke(&line, transform, color(style::SEGMENT), None, &path);
            }
            OverlayPrimitive::BaseLine { from, to } => {
                let mut path = BezPath::new();
                path.move_to(*from);
                path.line_to(*to);
                self.scene
                    .stroke(&line, transform, color(style::BASE_LINE), None, &path);
            }
            OverlayPrimitive::HeightLine { from, to } => {
                let mut path = BezPath::new();
                path.move_to(*from);
                path.line_to(*to);
                self.scene
                    .stroke(&line, transform, color(style::HEIGHT_LINE), None, &path);
            }
            OverlayPrimitive::TriangleFill { hull } => {
                let mut path = BezPath::new();
                path.move_to(hull[0]);
                for p in &hull[1..] {
                    path.line_to(*p);
                }
                path.close_path();
                self.scene.fill(
                    Fill::NonZero,
                    transform,
                    color(style::TRIANGLE_FILL),
                    None,
                    &path,
                );
            }
        }
    }
}

impl Renderer for VelloOverlayRenderer {
    fn build_scene(&mut self, ctx: &OverlayContext) {
        let transform = Affine::scale(ctx.scale_factor);

        if ctx.show_grid {
            self.render_grid_lines(ctx.viewport, transform, ctx.spacing.as_f64());
        }
        for prim in overlay::project(ctx.marks) {
            self.render_primitive(&prim, transform);
        }
    }
}
