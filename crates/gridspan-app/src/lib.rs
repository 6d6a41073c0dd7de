//! GridSpan Application
//!
//! The application shell: windowing, input routing, camera feed wiring,
//! control panels and capture export for the measurement page, plus the
//! AR companion view.

mod app;
mod ar_view;
mod feed;
mod ui;

pub use app::{App, AppConfig};
pub use ar_view::ArViewState;
pub use feed::FrameSource;
pub use ui::{render_ui, UiAction, UiState};

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::run_wasm;
