//! Renderer trait abstraction.

use gridspan_core::grid::GridSpacing;
use gridspan_core::marks::MarkState;
use kurbo::Size;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Initialization failed: {0}")]
    InitFailed(String),
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Surface error: {0}")]
    Surface(String),
}

/// Context for a single overlay frame.
pub struct OverlayContext<'a> {
    /// The marks to project.
    pub marks: &'a MarkState,
    /// Current grid spacing; drives the grid tile size.
    pub spacing: GridSpacing,
    /// Viewport size in logical pixels.
    pub viewport: Size,
    /// Device pixel ratio (for HiDPI).
    pub scale_factor: f64,
    /// Whether to draw the grid itself (off while the AR view is active).
    pub show_grid: bool,
}

impl<'a> OverlayContext<'a> {
    pub fn new(marks: &'a MarkState, spacing: GridSpacing, viewport: Size) -> Self {
        Self {
            marks,
            spacing,
            viewport,
            scale_factor: 1.0,
            show_grid: true,
        }
    }

    /// Set the scale factor for HiDPI.
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Toggle grid drawing.
    pub fn with_grid(mut self, show_grid: bool) -> Self {
        self.show_grid = show_grid;
        self
    }
}

/// Trait for overlay rendering backends.
pub trait Renderer {
    /// Build the frame's drawing commands from the context.
    fn build_scene(&mut self, ctx: &OverlayContext);
}
