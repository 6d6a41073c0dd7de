//! egui panels for the measurement page and the AR companion view.
//!
//! Every visible button and panel rectangle is re-registered with the
//! session's control regions each frame, in physical pixels, so pointer
//! events over the chrome are never classified as snap taps.

use egui::{Align2, Color32, Context, CornerRadius, Frame, Margin, RichText, Stroke, Vec2};
use gridspan_core::{ControlId, Dimensions, MeasureSession, Stage};

use crate::ar_view::ArViewState;

/// An action triggered from the UI this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    Reset,
    MeasureLength,
    MakeTriangle,
    Capture,
    GridIncrease,
    GridDecrease,
    OpenArView,
    CloseArView,
    ArSubmit,
}

/// Transient UI state that is not part of the measurement session.
#[derive(Default)]
pub struct UiState {
    /// User-facing notice shown until dismissed (capture failures, camera
    /// problems, autoplay prompts).
    pub alert: Option<String>,
}

fn panel_frame() -> Frame {
    Frame::new()
        .fill(Color32::from_rgba_unmultiplied(250, 250, 252, 235))
        .corner_radius(CornerRadius::same(8))
        .stroke(Stroke::new(1.0, Color32::from_gray(220)))
        .inner_margin(Margin::symmetric(12, 8))
}

/// Convert an egui rect (logical points) to session coordinates
/// (physical pixels).
fn physical_rect(rect: egui::Rect, pixels_per_point: f32) -> kurbo::Rect {
    let s = f64::from(pixels_per_point);
    kurbo::Rect::new(
        f64::from(rect.min.x) * s,
        f64::from(rect.min.y) * s,
        f64::from(rect.max.x) * s,
        f64::from(rect.max.y) * s,
    )
}

/// Render all UI and return any triggered action.
pub fn render_ui(
    ctx: &Context,
    session: &mut MeasureSession,
    ui_state: &mut UiState,
    ar_view: &mut ArViewState,
) -> Option<UiAction> {
    session.regions_mut().clear();

    let action = if ar_view.active {
        render_ar_panel(ctx, ar_view)
    } else {
        let controls = render_control_panel(ctx, session);
        let grid = render_grid_panel(ctx, session);
        let info = render_info_panel(ctx, session);
        controls.or(grid).or(info)
    };
    let alert_action = render_alert(ctx, ui_state);

    action.or(alert_action)
}

/// Right-side column of stage action buttons.
fn render_control_panel(ctx: &Context, session: &mut MeasureSession) -> Option<UiAction> {
    let mut action = None;
    let visibility = session.visibility();
    let ppp = ctx.pixels_per_point();

    let response = egui::Area::new(egui::Id::new("control_panel"))
        .anchor(Align2::RIGHT_TOP, Vec2::new(-12.0, 12.0))
        .show(ctx, |ui| {
            panel_frame().show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.spacing_mut().item_spacing = Vec2::new(0.0, 6.0);

                    let button = |ui: &mut egui::Ui, id: ControlId, label: &str| {
                        visibility.shows(id) && ui.button(RichText::new(label).size(14.0)).clicked()
                    };

                    if button(ui, ControlId::Reset, "Reset") {
                        action = Some(UiAction::Reset);
                    }
                    if button(ui, ControlId::MeasureLength, "Measure length") {
                        action = Some(UiAction::MeasureLength);
                    }
                    if button(ui, ControlId::MakeTriangle, "Make triangle") {
                        action = Some(UiAction::MakeTriangle);
                    }
                    if button(ui, ControlId::Capture, "Capture") {
                        action = Some(UiAction::Capture);
                    }
                    if ui.button(RichText::new("AR view").size(14.0)).clicked() {
                        action = Some(UiAction::OpenArView);
                    }
                });
            });
        })
        .response;

    session
        .regions_mut()
        .register_panel(physical_rect(response.rect, ppp));
    action
}

/// Bottom-left grid spacing controls.
fn render_grid_panel(ctx: &Context, session: &mut MeasureSession) -> Option<UiAction> {
    let mut action = None;
    let visibility = session.visibility();
    let spacing = session.spacing();
    let ppp = ctx.pixels_per_point();

    let response = egui::Area::new(egui::Id::new("grid_panel"))
        .anchor(Align2::LEFT_BOTTOM, Vec2::new(12.0, -12.0))
        .show(ctx, |ui| {
            panel_frame().show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.spacing_mut().item_spacing = Vec2::new(6.0, 0.0);

                    if visibility.grid_adjust {
                        if ui.button(RichText::new("\u{2212}").size(16.0)).clicked() {
                            action = Some(UiAction::GridDecrease);
                        }
                    }
                    ui.label(
                        RichText::new(format!("{}px", spacing.px()))
                            .size(13.0)
                            .color(Color32::from_gray(80)),
                    );
                    if visibility.grid_adjust {
                        if ui.button(RichText::new("+").size(16.0)).clicked() {
                            action = Some(UiAction::GridIncrease);
                        }
                    }
                });
            });
        })
        .response;

    session
        .regions_mut()
        .register_panel(physical_rect(response.rect, ppp));
    action
}

/// Bottom-center dimension readout, shown once measured.
fn render_info_panel(ctx: &Context, session: &mut MeasureSession) -> Option<UiAction> {
    let Some(dims) = session.dimensions() else {
        return None;
    };
    if !matches!(session.stage(), Stage::DimensionsShown | Stage::TriangleShown) {
        return None;
    }
    let ppp = ctx.pixels_per_point();

    let response = egui::Area::new(egui::Id::new("info_panel"))
        .anchor(Align2::CENTER_BOTTOM, Vec2::new(0.0, -12.0))
        .show(ctx, |ui| {
            panel_frame().show(ui, |ui| {
                ui.label(
                    RichText::new(readout_text(dims))
                        .size(14.0)
                        .color(Color32::from_gray(40)),
                );
            });
        })
        .response;

    session
        .regions_mut()
        .register_panel(physical_rect(response.rect, ppp));
    None
}

fn readout_text(dims: Dimensions) -> String {
    format!(
        "Horizontal: {} units   Vertical: {} units",
        dims.horizontal, dims.vertical
    )
}

/// The AR companion form: base and height inputs plus the derived
/// hypotenuse once a wireframe is built.
fn render_ar_panel(ctx: &Context, ar_view: &mut ArViewState) -> Option<UiAction> {
    let mut action = None;

    egui::Area::new(egui::Id::new("ar_panel"))
        .anchor(Align2::CENTER_TOP, Vec2::new(0.0, 24.0))
        .show(ctx, |ui| {
            panel_frame().show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.spacing_mut().item_spacing = Vec2::new(0.0, 6.0);
                    ui.label(RichText::new("Triangle prism").size(16.0).strong());

                    ui.horizontal(|ui| {
                        ui.label("Base");
                        ui.text_edit_singleline(&mut ar_view.base_input);
                    });
                    ui.horizontal(|ui| {
                        ui.label("Height");
                        ui.text_edit_singleline(&mut ar_view.height_input);
                    });

                    if ui.button("Show prism").clicked() {
                        action = Some(UiAction::ArSubmit);
                    }

                    if let Some(error) = &ar_view.error {
                        ui.label(RichText::new(error).size(13.0).color(Color32::RED));
                    }
                    if let Some(dims) = ar_view.dims() {
                        ui.label(
                            RichText::new(format!("Hypotenuse: {:.2}", dims.hypotenuse()))
                                .size(13.0)
                                .color(Color32::from_gray(80)),
                        );
                    }

                    if ui.button("Back to measuring").clicked() {
                        action = Some(UiAction::CloseArView);
                    }
                });
            });
        });

    action
}

/// Dismissable notice banner.
fn render_alert(ctx: &Context, ui_state: &mut UiState) -> Option<UiAction> {
    let Some(message) = ui_state.alert.clone() else {
        return None;
    };

    let mut dismissed = false;
    egui::Area::new(egui::Id::new("alert"))
        .anchor(Align2::CENTER_TOP, Vec2::new(0.0, 72.0))
        .order(egui::Order::Foreground)
        .show(ctx, |ui| {
            Frame::new()
                .fill(Color32::from_rgba_unmultiplied(255, 240, 200, 245))
                .corner_radius(CornerRadius::same(8))
                .stroke(Stroke::new(1.0, Color32::from_gray(180)))
                .inner_margin(Margin::symmetric(12, 8))
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(&message).size(13.0));
                        if ui.button("\u{00d7}").clicked() {
                            dismissed = true;
                        }
                    });
                });
        });

    if dismissed {
        ui_state.alert = None;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readout_formats_grid_units() {
        let dims = Dimensions {
            horizontal: 2.0,
            vertical: 4.0,
        };
        assert_eq!(
            readout_text(dims),
            "Horizontal: 2 units   Vertical: 4 units"
        );
    }

    #[test]
    fn test_physical_rect_scales_by_dpi() {
        let rect = egui::Rect::from_min_max(egui::pos2(10.0, 20.0), egui::pos2(30.0, 40.0));
        let physical = physical_rect(rect, 2.0);
        assert_eq!(physical, kurbo::Rect::new(20.0, 40.0, 60.0, 80.0));
    }
}
