//! Capture exporter.
//!
//! The primary path rasterizes the composited scene (camera frame plus
//! overlay) on the GPU; when that fails the exporter falls back to a
//! deterministic CPU re-render of the session snapshot onto the video
//! frame. The fallback reproduces the live overlay's grid spacing, marker
//! radius, line colors and triangle fill from state — it is a re-render,
//! not a screen copy. With no video frame at all the export aborts and no
//! bytes are produced.

use crate::overlay::{self, style, OverlayPrimitive};
use gridspan_core::marks::MarkState;
use gridspan_core::session::SessionSnapshot;
use image::imageops::FilterType;
use image::RgbaImage;
use kurbo::Point;
use thiserror::Error;

/// Capture/export errors.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no video frame is available to capture")]
    NoFrame,
    #[error("frame buffer is malformed")]
    BadFrame,
    #[error("GPU rasterization failed: {0}")]
    Gpu(String),
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),
}

/// One decoded camera frame, tightly packed RGBA.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// A finished capture: raw pixels plus dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureImage {
    pub rgba_data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl CaptureImage {
    /// Encode as PNG bytes.
    pub fn encode_png(&self) -> Result<Vec<u8>, CaptureError> {
        let mut bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut bytes, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.rgba_data)?;
        }
        Ok(bytes)
    }
}

/// Whole-scene GPU rasterization, implemented by the app shell over
/// `vello::Renderer::render_to_texture`.
pub trait SceneRasterizer {
    fn rasterize(
        &mut self,
        snapshot: &SessionSnapshot,
        frame: &VideoFrame,
    ) -> Result<CaptureImage, CaptureError>;
}

/// Run a capture: primary GPU path first, CPU fallback on its failure.
pub fn capture(
    rasterizer: Option<&mut dyn SceneRasterizer>,
    frame: Option<&VideoFrame>,
    snapshot: &SessionSnapshot,
) -> Result<CaptureImage, CaptureError> {
    let frame = frame.ok_or(CaptureError::NoFrame)?;

    if let Some(rasterizer) = rasterizer {
        match rasterizer.rasterize(snapshot, frame) {
            Ok(image) => return Ok(image),
            Err(e) => log::warn!("primary capture path failed, using fallback: {e}"),
        }
    }

    fallback_capture(frame, snapshot)
}

/// Deterministic CPU re-render of the snapshot over the video frame.
pub fn fallback_capture(
    frame: &VideoFrame,
    snapshot: &SessionSnapshot,
) -> Result<CaptureImage, CaptureError> {
    let out_w = snapshot.viewport_width.round() as u32;
    let out_h = snapshot.viewport_height.round() as u32;
    if out_w == 0 || out_h == 0 {
        return Err(CaptureError::BadFrame);
    }

    let source = RgbaImage::from_raw(frame.width, frame.height, frame.rgba.clone())
        .ok_or(CaptureError::BadFrame)?;
    let mut canvas = image::imageops::resize(&source, out_w, out_h, FilterType::Triangle);

    draw_grid(&mut canvas, snapshot.spacing.as_f64());

    // Re-derive the display list from the snapshot so the fallback and the
    // live overlay agree by construction.
    let marks = marks_from_snapshot(snapshot);
    for prim in overlay::project(&marks) {
        draw_primitive(&mut canvas, &prim);
    }

    Ok(CaptureImage {
        rgba_data: canvas.into_raw(),
        width: out_w,
        height: out_h,
    })
}

/// Reconstruct a `MarkState` matching the snapshot by replaying its
/// operations. Used by both capture paths so an exported image always
/// agrees with the live overlay.
pub fn marks_from_snapshot(snapshot: &SessionSnapshot) -> MarkState {
    let mut marks = MarkState::new();
    for p in &snapshot.points {
        marks.toggle(*p);
    }
    if snapshot.dimensions.is_some() || snapshot.triangle {
        marks.measure(snapshot.spacing);
    }
    if snapshot.triangle {
        marks.make_triangle();
    }
    marks
}

// -- CPU raster helpers ---------------------------------------------------

fn blend(canvas: &mut RgbaImage, x: i64, y: i64, color: [u8; 4]) {
    if x < 0 || y < 0 || x >= i64::from(canvas.width()) || y >= i64::from(canvas.height()) {
        return;
    }
    let dst = canvas.get_pixel_mut(x as u32, y as u32);
    let alpha = f64::from(color[3]) / 255.0;
    for c in 0..3 {
        let src = f64::from(color[c]);
        let d = f64::from(dst.0[c]);
        dst.0[c] = (src * alpha + d * (1.0 - alpha)).round() as u8;
    }
    dst.0[3] = 255;
}

fn draw_grid(canvas: &mut RgbaImage, spacing: f64) {
    let (w, h) = (canvas.width(), canvas.height());
    let mut x = 0.0;
    while x < f64::from(w) {
        for y in 0..h {
            blend(canvas, x as i64, i64::from(y), style::GRID_LINE);
        }
        x += spacing;
    }
    let mut y = 0.0;
    while y < f64::from(h) {
        for x in 0..w {
            blend(canvas, i64::from(x), y as i64, style::GRID_LINE);
        }
        y += spacing;
    }
}

fn fill_disc(canvas: &mut RgbaImage, center: Point, radius: f64, color: [u8; 4]) {
    let r = radius.ceil() as i64;
    let (cx, cy) = (center.x.round() as i64, center.y.round() as i64);
    for dy in -r..=r {
        for dx in -r..=r {
            let d = ((dx * dx + dy * dy) as f64).sqrt();
            if d <= radius {
                blend(canvas, cx + dx, cy + dy, color);
            }
        }
    }
}

fn stroke_ring(canvas: &mut RgbaImage, center: Point, radius: f64, width: f64, color: [u8; 4]) {
    let outer = radius + width / 2.0;
    let inner = radius - width / 2.0;
    let r = outer.ceil() as i64;
    let (cx, cy) = (center.x.round() as i64, center.y.round() as i64);
    for dy in -r..=r {
        for dx in -r..=r {
            let d = ((dx * dx + dy * dy) as f64).sqrt();
            if d >= inner && d <= outer {
                blend(canvas, cx + dx, cy + dy, color);
            }
        }
    }
}

/// Stamp a thick segment by stepping discs along it. Half-pixel steps keep
/// the stroke solid at any angle.
fn draw_segment(canvas: &mut RgbaImage, from: Point, to: Point, width: f64, color: [u8; 4]) {
    let length = from.distance(to);
    let steps = (length * 2.0).ceil() as usize;
    let radius = width / 2.0;
    // Stamping overlapping translucent discs would over-darken; collect
    // covered pixels first, then blend each once.
    let mut covered = std::collections::BTreeSet::new();
    let r = radius.ceil() as i64;
    for i in 0..=steps.max(1) {
        let t = i as f64 / steps.max(1) as f64;
        let p = Point::new(
            from.x + (to.x - from.x) * t,
            from.y + (to.y - from.y) * t,
        );
        let (cx, cy) = (p.x.round() as i64, p.y.round() as i64);
        for dy in -r..=r {
            for dx in -r..=r {
                if ((dx * dx + dy * dy) as f64).sqrt() <= radius {
                    covered.insert((cx + dx, cy + dy));
                }
            }
        }
    }
    for (x, y) in covered {
        blend(canvas, x, y, color);
    }
}

fn fill_triangle(canvas: &mut RgbaImage, hull: &[Point; 4], color: [u8; 4]) {
    // The hull carries the two marks plus both bottom corners; one mark
    // duplicates a corner, so the distinct vertices form the triangle.
    let mut verts: Vec<Point> = Vec::with_capacity(3);
    for p in hull {
        if !verts.iter().any(|v| v.distance(*p) < 0.5) {
            verts.push(*p);
        }
    }
    let [a, b, c] = match verts.as_slice() {
        [a, b, c, ..] => [*a, *b, *c],
        _ => return, // degenerate (points share a row/column)
    };

    let edge = |p: Point, q: Point, r: Point| (q.x - p.x) * (r.y - p.y) - (q.y - p.y) * (r.x - p.x);

    let min_x = a.x.min(b.x).min(c.x).floor() as i64;
    let max_x = a.x.max(b.x).max(c.x).ceil() as i64;
    let min_y = a.y.min(b.y).min(c.y).floor() as i64;
    let max_y = a.y.max(b.y).max(c.y).ceil() as i64;

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = Point::new(x as f64, y as f64);
            let d0 = edge(a, b, p);
            let d1 = edge(b, c, p);
            let d2 = edge(c, a, p);
            let has_neg = d0 < 0.0 || d1 < 0.0 || d2 < 0.0;
            let has_pos = d0 > 0.0 || d1 > 0.0 || d2 > 0.0;
            if !(has_neg && has_pos) {
                blend(canvas, x, y, color);
            }
        }
    }
}

fn draw_primitive(canvas: &mut RgbaImage, prim: &OverlayPrimitive) {
    match prim {
        OverlayPrimitive::MarkDot { center } => {
            fill_disc(canvas, *center, style::MARK_RADIUS, style::MARK_FILL);
            stroke_ring(
                canvas,
                *center,
                style::MARK_RADIUS,
                style::MARK_RING_WIDTH,
                style::MARK_RING,
            );
        }
        OverlayPrimitive::Segment { from, to } => {
            draw_segment(canvas, *from, *to, style::LINE_WIDTH, style::SEGMENT);
        }
        OverlayPrimitive::BaseLine { from, to } => {
            draw_segment(canvas, *from, *to, style::LINE_WIDTH, style::BASE_LINE);
        }
        OverlayPrimitive::HeightLine { from, to } => {
            draw_segment(canvas, *from, *to, style::LINE_WIDTH, style::HEIGHT_LINE);
        }
        OverlayPrimitive::TriangleFill { hull } => {
            fill_triangle(canvas, hull, style::TRIANGLE_FILL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridspan_core::grid::{GridPoint, GridSpacing};
    use gridspan_core::marks::Dimensions;

    fn gray_frame(w: u32, h: u32) -> VideoFrame {
        VideoFrame {
            rgba: vec![128; (w * h * 4) as usize],
            width: w,
            height: h,
        }
    }

    fn snapshot(points: &[(f64, f64)], triangle: bool) -> SessionSnapshot {
        SessionSnapshot {
            spacing: GridSpacing::new(50),
            viewport_width: 400.0,
            viewport_height: 400.0,
            points: points.iter().map(|&(x, y)| GridPoint::new(x, y)).collect(),
            dimensions: triangle.then_some(Dimensions {
                horizontal: 2.0,
                vertical: 2.0,
            }),
            triangle,
        }
    }

    struct FailingRasterizer;
    impl SceneRasterizer for FailingRasterizer {
        fn rasterize(
            &mut self,
            _snapshot: &SessionSnapshot,
            _frame: &VideoFrame,
        ) -> Result<CaptureImage, CaptureError> {
            Err(CaptureError::Gpu("device lost".into()))
        }
    }

    #[test]
    fn test_no_frame_aborts_without_output() {
        let snap = snapshot(&[], false);
        let result = capture(None, None, &snap);
        assert!(matches!(result, Err(CaptureError::NoFrame)));
    }

    #[test]
    fn test_primary_failure_falls_back() {
        let frame = gray_frame(200, 200);
        let snap = snapshot(&[(100.0, 100.0)], false);
        let mut primary = FailingRasterizer;
        let image = capture(Some(&mut primary), Some(&frame), &snap).unwrap();
        assert_eq!(image.width, 400);
        assert_eq!(image.height, 400);
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let frame = gray_frame(200, 200);
        let snap = snapshot(&[(100.0, 100.0), (200.0, 300.0)], true);
        let a = fallback_capture(&frame, &snap).unwrap();
        let b = fallback_capture(&frame, &snap).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fallback_draws_mark_and_grid() {
        let frame = gray_frame(200, 200);
        let snap = snapshot(&[(100.0, 100.0)], false);
        let image = fallback_capture(&frame, &snap).unwrap();
        let px = |x: u32, y: u32| {
            let i = ((y * image.width + x) * 4) as usize;
            [
                image.rgba_data[i],
                image.rgba_data[i + 1],
                image.rgba_data[i + 2],
            ]
        };

        // Mark center is strongly red.
        let center = px(100, 100);
        assert!(center[0] > 200 && center[1] < 60 && center[2] < 60);
        // A grid line pixel away from the mark is darkened gray.
        let grid = px(150, 10);
        assert!(grid[0] < 128 && grid[0] == grid[1] && grid[1] == grid[2]);
        // Off-grid background keeps the frame color.
        assert_eq!(px(130, 10), [128, 128, 128]);
    }

    #[test]
    fn test_fallback_fills_triangle_interior() {
        let frame = gray_frame(200, 200);
        let snap = snapshot(&[(100.0, 100.0), (200.0, 300.0)], true);
        let image = fallback_capture(&frame, &snap).unwrap();
        // Interior of the right triangle (right angle bottom-left at
        // (100, 300)): pick a point well inside.
        let i = ((280 * image.width + 120) * 4) as usize;
        let g = image.rgba_data[i + 1];
        let r = image.rgba_data[i];
        assert!(g > r, "triangle interior should be green-shifted");
    }

    #[test]
    fn test_png_encoding_round_trip_header() {
        let frame = gray_frame(100, 100);
        let snap = SessionSnapshot {
            viewport_width: 100.0,
            viewport_height: 100.0,
            ..snapshot(&[], false)
        };
        let image = fallback_capture(&frame, &snap).unwrap();
        let bytes = image.encode_png().unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_bad_frame_rejected() {
        let frame = VideoFrame {
            rgba: vec![0; 8], // wrong length
            width: 100,
            height: 100,
        };
        let snap = snapshot(&[], false);
        assert!(matches!(
            fallback_capture(&frame, &snap),
            Err(CaptureError::BadFrame)
        ));
    }
}
