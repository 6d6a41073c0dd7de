//! GridSpan Render Library
//!
//! Overlay renderer abstraction, capture exporter, and the default Vello
//! GPU implementation.

pub mod capture;
pub mod overlay;
mod renderer;

#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use capture::{
    capture, marks_from_snapshot, CaptureError, CaptureImage, SceneRasterizer, VideoFrame,
};
pub use overlay::{project, OverlayPrimitive};
pub use renderer::{OverlayContext, Renderer, RendererError};

#[cfg(feature = "vello-renderer")]
pub use vello_impl::VelloOverlayRenderer;
