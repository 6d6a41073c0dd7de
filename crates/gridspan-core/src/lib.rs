//! GridSpan Core Library
//!
//! Platform-agnostic measurement and interaction logic for the GridSpan
//! AR measurement overlay.

pub mod ar;
pub mod controls;
pub mod gesture;
pub mod grid;
pub mod marks;
pub mod session;
pub mod video;

pub use controls::{ControlId, ControlRegions, ControlVisibility};
pub use gesture::{GestureConfig, GestureEvent, GestureInterpreter};
pub use grid::{GridIndex, GridPoint, GridSpacing};
pub use marks::{Dimensions, MarkState, RightAngleCorner, Stage, ToggleOutcome};
pub use session::{MeasureSession, SessionSnapshot};
pub use video::{CameraConstraint, CameraError, VideoDevice};
