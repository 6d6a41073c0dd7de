//! Core application state and lifecycle.

use gridspan_core::MeasureSession;
use gridspan_render::{OverlayContext, Renderer, VelloOverlayRenderer, VideoFrame};
use kurbo::{Affine, BezPath, Point, Size, Stroke};
use peniko::Color;
use std::sync::Arc;
use vello::util::RenderSurface;
use vello::wgpu::PresentMode;
use vello::{AaConfig, RenderParams, RendererOptions};
use winit::application::ApplicationHandler;
#[cfg(not(target_arch = "wasm32"))]
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseButton, TouchPhase, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

use crate::ar_view::{project_edges, ArViewState};
use crate::feed::FrameSource;
use crate::ui::{render_ui, UiAction, UiState};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "GridSpan".to_string(),
            width: 420,
            height: 860,
        }
    }
}

/// Runtime state for the application.
struct AppState {
    // Windowing
    window: Arc<Window>,
    surface: RenderSurface<'static>,

    // Rendering
    vello_renderer: vello::Renderer,
    overlay_renderer: VelloOverlayRenderer,
    /// Texture blitter for RGBA->surface format conversion (needed for WebGPU/WASM)
    texture_blitter: vello::wgpu::util::TextureBlitter,

    // egui
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
    ui_state: UiState,

    // State
    session: MeasureSession,
    ar_view: ArViewState,
    frame_source: Box<dyn FrameSource>,
    /// Most recent camera frame, kept for compositing and capture.
    last_frame: Option<VideoFrame>,
    /// Last cursor position in physical pixels.
    cursor: Point,
}

/// Main application struct.
pub struct App {
    config: AppConfig,
    state: Option<AppState>,
    render_cx: Option<vello::util::RenderContext>,
    /// Window waiting for async surface creation (WASM only)
    pending_window: Option<Arc<Window>>,
    #[cfg(target_arch = "wasm32")]
    init_in_progress: std::cell::Cell<bool>,
}

impl App {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            config,
            state: None,
            render_cx: None,
            pending_window: None,
            #[cfg(target_arch = "wasm32")]
            init_in_progress: std::cell::Cell::new(false),
        }
    }

    /// Run the application.
    pub async fn run() {
        let event_loop = EventLoop::new().expect("Failed to create event loop");
        let app = App::new();

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::EventLoopExtWebSys;
            event_loop.spawn_app(app);
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let mut app = app;
            event_loop.run_app(&mut app).expect("Event loop error");
        }
    }

    /// Finish initialization after surface is created.
    fn finish_init(&mut self, window: Arc<Window>, surface: RenderSurface<'static>) {
        let render_cx = self.render_cx.as_ref().expect("RenderContext not initialized");
        let device = &render_cx.devices[surface.dev_id].device;

        let vello_renderer = vello::Renderer::new(device, RendererOptions::default())
            .expect("Failed to create Vello renderer");

        // Vello renders to Rgba8Unorm for compute shader compatibility; the
        // surface format on WebGPU is typically Bgra8Unorm.
        let texture_blitter =
            vello::wgpu::util::TextureBlitter::new(device, surface.config.format);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(
            device,
            surface.config.format,
            egui_wgpu::RendererOptions::default(),
        );

        // Session coordinates are physical pixels, same space the surface
        // and touch events use.
        let viewport = Size::new(
            f64::from(surface.config.width),
            f64::from(surface.config.height),
        );
        let session = MeasureSession::new(viewport);

        #[cfg(not(target_arch = "wasm32"))]
        let mut frame_source: Box<dyn FrameSource> = Box::new(crate::feed::TestPatternSource::new(
            surface.config.width,
            surface.config.height,
        ));
        #[cfg(target_arch = "wasm32")]
        let mut frame_source: Box<dyn FrameSource> = Box::new(crate::feed::WebCameraSource::new());

        let mut ui_state = UiState::default();
        if let Err(e) = frame_source.start() {
            log::error!("camera start failed: {e}");
            ui_state.alert = Some(format!(
                "Camera unavailable: {e}. Measuring still works over a blank backdrop."
            ));
        }

        log::info!(
            "GridSpan initialized - {}x{}",
            surface.config.width,
            surface.config.height
        );

        self.state = Some(AppState {
            window: window.clone(),
            surface,
            vello_renderer,
            overlay_renderer: VelloOverlayRenderer::new(),
            texture_blitter,
            egui_ctx,
            egui_state,
            egui_renderer,
            ui_state,
            session,
            ar_view: ArViewState::default(),
            frame_source,
            last_frame: None,
            cursor: Point::ZERO,
        });

        self.pending_window = None;
        window.request_redraw();
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() || self.pending_window.is_some() {
            return;
        }

        log::info!("Creating window...");

        #[cfg(not(target_arch = "wasm32"))]
        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height));

        // On WASM, attach canvas to DOM and use full viewport
        #[cfg(target_arch = "wasm32")]
        let window_attrs = {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            let web_window = web_sys::window().expect("No window");
            let document = web_window.document().expect("No document");

            let viewport_width = web_window
                .inner_width()
                .ok()
                .and_then(|v| v.as_f64())
                .unwrap_or(f64::from(self.config.width));
            let viewport_height = web_window
                .inner_height()
                .ok()
                .and_then(|v| v.as_f64())
                .unwrap_or(f64::from(self.config.height));

            if let Some(loading) = document.get_element_by_id("loading") {
                let _ = loading.remove();
            }

            let canvas = document
                .get_element_by_id("gridspan-canvas")
                .and_then(|e| e.dyn_into::<web_sys::HtmlCanvasElement>().ok())
                .or_else(|| {
                    let app_div = document.get_element_by_id("app")?;
                    let canvas = document.create_element("canvas").ok()?;
                    canvas.set_id("gridspan-canvas");
                    app_div.append_child(&canvas).ok()?;
                    canvas.dyn_into::<web_sys::HtmlCanvasElement>().ok()
                })
                .expect("Failed to create canvas");

            // Fill the viewport at device pixel resolution for sharp lines.
            let dpr = web_window.device_pixel_ratio();
            canvas.set_width((viewport_width * dpr) as u32);
            canvas.set_height((viewport_height * dpr) as u32);
            let style = canvas.style();
            let _ = style.set_property("width", "100%");
            let _ = style.set_property("height", "100%");
            let _ = style.set_property("display", "block");
            let _ = style.set_property("position", "fixed");
            let _ = style.set_property("top", "0");
            let _ = style.set_property("left", "0");

            Window::default_attributes()
                .with_title(&self.config.title)
                .with_canvas(Some(canvas))
        };

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .expect("Failed to create window"),
        );

        let size = window.inner_size();
        let (width, height) = if size.width == 0 || size.height == 0 {
            (self.config.width, self.config.height)
        } else {
            (size.width, size.height)
        };

        log::info!("Surface size: {}x{}", width, height);

        #[cfg(not(target_arch = "wasm32"))]
        {
            let render_cx = self
                .render_cx
                .get_or_insert_with(vello::util::RenderContext::new);

            let surface = pollster::block_on(render_cx.create_surface(
                window.clone(),
                width,
                height,
                PresentMode::AutoVsync,
            ))
            .expect("Failed to create surface");

            // Transmute lifetime to 'static - safe because App owns everything
            let surface: RenderSurface<'static> = unsafe { std::mem::transmute(surface) };
            self.finish_init(window, surface);
        }

        #[cfg(target_arch = "wasm32")]
        {
            self.pending_window = Some(window);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // On WASM, handle async surface creation
        #[cfg(target_arch = "wasm32")]
        if self.state.is_none() {
            if let Some(window) = self.pending_window.clone() {
                if !self.init_in_progress.get() {
                    self.init_in_progress.set(true);

                    let web_window = web_sys::window().expect("No window");
                    let dpr = web_window.device_pixel_ratio();
                    let viewport_width = web_window
                        .inner_width()
                        .ok()
                        .and_then(|v| v.as_f64())
                        .unwrap_or(f64::from(self.config.width));
                    let viewport_height = web_window
                        .inner_height()
                        .ok()
                        .and_then(|v| v.as_f64())
                        .unwrap_or(f64::from(self.config.height));

                    let width = (viewport_width * dpr) as u32;
                    let height = (viewport_height * dpr) as u32;

                    let self_ptr = self as *mut Self;
                    let window_clone = window.clone();

                    wasm_bindgen_futures::spawn_local(async move {
                        log::info!("Creating surface asynchronously...");
                        let mut render_cx = vello::util::RenderContext::new();

                        match render_cx
                            .create_surface(
                                window_clone.clone(),
                                width,
                                height,
                                PresentMode::AutoVsync,
                            )
                            .await
                        {
                            Ok(surface) => {
                                let surface: RenderSurface<'static> =
                                    unsafe { std::mem::transmute(surface) };

                                // SAFETY: WASM is single-threaded and the App
                                // is kept alive by the event loop.
                                let app = unsafe { &mut *self_ptr };
                                app.render_cx = Some(render_cx);
                                app.finish_init(window_clone, surface);
                            }
                            Err(e) => {
                                log::error!("Failed to create surface: {e:?}");
                                let app = unsafe { &mut *self_ptr };
                                app.init_in_progress.set(false);
                            }
                        }
                    });
                }

                window.request_redraw();
            }
            return;
        }

        let Some(state) = &mut self.state else {
            return;
        };

        // Let egui process the event first
        let egui_response = state.egui_state.on_window_event(&state.window, &event);
        let egui_wants_input = egui_response.consumed
            || state.egui_ctx.is_pointer_over_area()
            || state.egui_ctx.wants_pointer_input()
            || state.egui_ctx.wants_keyboard_input();

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if size.width == 0 || size.height == 0 {
                    return;
                }

                state
                    .session
                    .resize(Size::new(f64::from(size.width), f64::from(size.height)));

                if let Some(render_cx) = self.render_cx.as_mut() {
                    render_cx.resize_surface(&mut state.surface, size.width, size.height);
                }

                state.window.request_redraw();
            }

            WindowEvent::CursorMoved { position, .. } => {
                state.cursor = Point::new(position.x, position.y);
            }

            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                if state.frame_source.needs_user_gesture() {
                    state.frame_source.retry_after_gesture();
                    state.ui_state.alert = None;
                }
                if egui_wants_input || state.ar_view.active {
                    return;
                }
                state.session.on_mouse_click(state.cursor);
                state.window.request_redraw();
            }

            WindowEvent::Touch(touch) => {
                if touch.phase == TouchPhase::Started && state.frame_source.needs_user_gesture() {
                    state.frame_source.retry_after_gesture();
                    state.ui_state.alert = None;
                }
                if egui_wants_input || state.ar_view.active {
                    return;
                }
                let position = Point::new(touch.location.x, touch.location.y);
                match touch.phase {
                    TouchPhase::Started => state.session.on_touch_start(touch.id, position),
                    TouchPhase::Moved => state.session.on_touch_move(touch.id, position),
                    TouchPhase::Ended => state.session.on_touch_end(touch.id, position),
                    TouchPhase::Cancelled => state.session.on_touch_cancel(),
                }
                state.window.request_redraw();
            }

            WindowEvent::RedrawRequested => {
                if state.frame_source.needs_user_gesture() && state.ui_state.alert.is_none() {
                    state.ui_state.alert =
                        Some("Tap anywhere to start the camera preview".to_string());
                }

                // Run egui and collect any triggered action
                let egui_input = state.egui_state.take_egui_input(&state.window);
                let mut deferred_action: Option<UiAction> = None;
                let egui_output = state.egui_ctx.run(egui_input, |ctx| {
                    deferred_action = render_ui(
                        ctx,
                        &mut state.session,
                        &mut state.ui_state,
                        &mut state.ar_view,
                    );
                });

                match deferred_action {
                    Some(UiAction::Reset) => state.session.reset(),
                    Some(UiAction::MeasureLength) => {
                        if state.session.measure().is_none() {
                            log::debug!("measure requested outside TwoPoints stage");
                        }
                    }
                    Some(UiAction::MakeTriangle) => {
                        state.session.make_triangle();
                    }
                    Some(UiAction::GridIncrease) => state.session.increase_spacing(),
                    Some(UiAction::GridDecrease) => state.session.decrease_spacing(),
                    Some(UiAction::Capture) => {
                        let snapshot = state.session.snapshot();
                        let frame = state.last_frame.clone();

                        #[cfg(not(target_arch = "wasm32"))]
                        let result = {
                            let render_cx =
                                self.render_cx.as_ref().expect("RenderContext not initialized");
                            let device_handle = &render_cx.devices[state.surface.dev_id];
                            let mut rasterizer = GpuSceneRasterizer {
                                device: &device_handle.device,
                                queue: &device_handle.queue,
                                vello_renderer: &mut state.vello_renderer,
                                overlay: &mut state.overlay_renderer,
                            };
                            gridspan_render::capture(
                                Some(&mut rasterizer),
                                frame.as_ref(),
                                &snapshot,
                            )
                        };
                        // Blocking GPU readback is unavailable in the
                        // browser; the deterministic CPU path renders the
                        // same primitives.
                        #[cfg(target_arch = "wasm32")]
                        let result =
                            gridspan_render::capture(None, frame.as_ref(), &snapshot);

                        match result.and_then(|image| image.encode_png()) {
                            Ok(png) => save_png(&png, &mut state.ui_state),
                            Err(e) => {
                                log::error!("capture failed: {e}");
                                state.ui_state.alert = Some(format!("Capture failed: {e}"));
                            }
                        }
                    }
                    Some(UiAction::OpenArView) => {
                        if let Some(dims) = state.session.dimensions() {
                            state.ar_view.prefill(dims.horizontal, dims.vertical);
                        }
                        state.ar_view.active = true;
                    }
                    Some(UiAction::CloseArView) => {
                        state.ar_view.active = false;
                    }
                    Some(UiAction::ArSubmit) => state.ar_view.submit(),
                    None => {}
                }

                // Compose the frame: camera, grid, marks, then AR wireframe
                let viewport = state.session.viewport();
                if let Some(frame) = state.frame_source.latest_frame() {
                    state.last_frame = Some(frame);
                }

                state.overlay_renderer.begin_frame();
                if !state.ar_view.active {
                    if let Some(frame) = &state.last_frame {
                        state.overlay_renderer.draw_camera_frame(frame, viewport);
                    }
                }
                let overlay_ctx = OverlayContext::new(
                    state.session.marks(),
                    state.session.spacing(),
                    viewport,
                )
                .with_grid(!state.ar_view.active);
                state.overlay_renderer.build_scene(&overlay_ctx);

                let mut scene = state.overlay_renderer.take_scene();
                if state.ar_view.active {
                    if let Some(edges) = state.ar_view.edges() {
                        draw_wireframe(&mut scene, edges, viewport);
                    }
                }

                state.egui_state.handle_platform_output(
                    &state.window,
                    egui_output.platform_output,
                );
                let egui_primitives = state
                    .egui_ctx
                    .tessellate(egui_output.shapes, egui_output.pixels_per_point);

                // Render
                let Some(render_cx) = self.render_cx.as_ref() else {
                    return;
                };
                let device_handle = &render_cx.devices[state.surface.dev_id];
                let device = &device_handle.device;
                let queue = &device_handle.queue;

                let surface_texture = match state.surface.surface.get_current_texture() {
                    Ok(t) => t,
                    Err(e) => {
                        log::warn!("Failed to get surface texture: {e:?}");
                        return;
                    }
                };

                let width = state.surface.config.width;
                let height = state.surface.config.height;

                let params = RenderParams {
                    base_color: Color::from_rgba8(18, 18, 22, 255),
                    width,
                    height,
                    antialiasing_method: AaConfig::Area,
                };

                // Vello requires StorageBinding, which WebGPU only supports
                // for Rgba8Unorm; render there and blit to the surface.
                let render_texture = device.create_texture(&vello::wgpu::TextureDescriptor {
                    label: Some("vello render texture"),
                    size: vello::wgpu::Extent3d {
                        width,
                        height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: vello::wgpu::TextureDimension::D2,
                    format: vello::wgpu::TextureFormat::Rgba8Unorm,
                    usage: vello::wgpu::TextureUsages::STORAGE_BINDING
                        | vello::wgpu::TextureUsages::COPY_SRC
                        | vello::wgpu::TextureUsages::TEXTURE_BINDING,
                    view_formats: &[],
                });
                let render_texture_view =
                    render_texture.create_view(&vello::wgpu::TextureViewDescriptor::default());

                if let Err(e) = state.vello_renderer.render_to_texture(
                    device,
                    queue,
                    &scene,
                    &render_texture_view,
                    &params,
                ) {
                    log::error!("Failed to render: {e:?}");
                    return;
                }

                let surface_view = surface_texture
                    .texture
                    .create_view(&vello::wgpu::TextureViewDescriptor::default());

                {
                    let mut blit_encoder =
                        device.create_command_encoder(&vello::wgpu::CommandEncoderDescriptor {
                            label: Some("blit encoder"),
                        });
                    state.texture_blitter.copy(
                        device,
                        &mut blit_encoder,
                        &render_texture_view,
                        &surface_view,
                    );
                    queue.submit(std::iter::once(blit_encoder.finish()));
                }

                // egui chrome on top
                for (id, image_delta) in &egui_output.textures_delta.set {
                    state
                        .egui_renderer
                        .update_texture(device, queue, *id, image_delta);
                }

                let screen_descriptor = egui_wgpu::ScreenDescriptor {
                    size_in_pixels: [width, height],
                    pixels_per_point: egui_output.pixels_per_point,
                };

                {
                    let mut egui_encoder =
                        device.create_command_encoder(&vello::wgpu::CommandEncoderDescriptor {
                            label: Some("egui encoder"),
                        });
                    state.egui_renderer.update_buffers(
                        device,
                        queue,
                        &mut egui_encoder,
                        &egui_primitives,
                        &screen_descriptor,
                    );

                    let render_pass =
                        egui_encoder.begin_render_pass(&vello::wgpu::RenderPassDescriptor {
                            label: Some("egui render pass"),
                            color_attachments: &[Some(vello::wgpu::RenderPassColorAttachment {
                                view: &surface_view,
                                resolve_target: None,
                                ops: vello::wgpu::Operations {
                                    load: vello::wgpu::LoadOp::Load, // Keep Vello content
                                    store: vello::wgpu::StoreOp::Store,
                                },
                                depth_slice: None,
                            })],
                            depth_stencil_attachment: None,
                            timestamp_writes: None,
                            occlusion_query_set: None,
                        });

                    // forget_lifetime satisfies egui-wgpu's 'static requirement
                    let mut render_pass = render_pass.forget_lifetime();
                    state
                        .egui_renderer
                        .render(&mut render_pass, &egui_primitives, &screen_descriptor);
                    drop(render_pass);

                    queue.submit(std::iter::once(egui_encoder.finish()));
                }

                for id in &egui_output.textures_delta.free {
                    state.egui_renderer.free_texture(id);
                }
                surface_texture.present();
                state.window.request_redraw();
            }

            _ => {}
        }
    }
}

/// Stroke the AR prism wireframe centered in the viewport.
fn draw_wireframe(scene: &mut vello::Scene, edges: &[gridspan_core::ar::Edge], viewport: Size) {
    let center = Point::new(viewport.width / 2.0, viewport.height / 2.0);
    let scale = (viewport.width.min(viewport.height)) / 8.0;

    let mut path = BezPath::new();
    for (from, to) in project_edges(edges, center, scale) {
        path.move_to(from);
        path.line_to(to);
    }
    scene.stroke(
        &Stroke::new(3.0),
        Affine::IDENTITY,
        Color::from_rgba8(0, 255, 140, 255),
        None,
        &path,
    );
}

/// GPU capture path: renders the snapshot offscreen and reads it back.
#[cfg(not(target_arch = "wasm32"))]
struct GpuSceneRasterizer<'a> {
    device: &'a vello::wgpu::Device,
    queue: &'a vello::wgpu::Queue,
    vello_renderer: &'a mut vello::Renderer,
    overlay: &'a mut VelloOverlayRenderer,
}

#[cfg(not(target_arch = "wasm32"))]
impl gridspan_render::SceneRasterizer for GpuSceneRasterizer<'_> {
    fn rasterize(
        &mut self,
        snapshot: &gridspan_core::SessionSnapshot,
        frame: &VideoFrame,
    ) -> Result<gridspan_render::CaptureImage, gridspan_render::CaptureError> {
        use gridspan_render::CaptureError;

        let width = snapshot.viewport_width.round() as u32;
        let height = snapshot.viewport_height.round() as u32;
        if width == 0 || height == 0 {
            return Err(CaptureError::BadFrame);
        }
        let viewport = Size::new(snapshot.viewport_width, snapshot.viewport_height);

        // Rebuild the display list the same way the live overlay draws it.
        self.overlay.begin_frame();
        self.overlay.draw_camera_frame(frame, viewport);
        let marks = gridspan_render::marks_from_snapshot(snapshot);
        let ctx = OverlayContext::new(&marks, snapshot.spacing, viewport);
        self.overlay.build_scene(&ctx);
        let scene = self.overlay.take_scene();

        let texture = self.device.create_texture(&vello::wgpu::TextureDescriptor {
            label: Some("capture texture"),
            size: vello::wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: vello::wgpu::TextureDimension::D2,
            format: vello::wgpu::TextureFormat::Rgba8Unorm,
            usage: vello::wgpu::TextureUsages::STORAGE_BINDING
                | vello::wgpu::TextureUsages::COPY_SRC
                | vello::wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let texture_view = texture.create_view(&vello::wgpu::TextureViewDescriptor::default());

        let params = RenderParams {
            base_color: Color::from_rgba8(18, 18, 22, 255),
            width,
            height,
            antialiasing_method: AaConfig::Area,
        };

        self.vello_renderer
            .render_to_texture(self.device, self.queue, &scene, &texture_view, &params)
            .map_err(|e| CaptureError::Gpu(format!("{e:?}")))?;

        // wgpu requires 256-byte row alignment for readback
        let bytes_per_row = (width * 4).next_multiple_of(256);
        let buffer_size = u64::from(bytes_per_row) * u64::from(height);

        let readback_buffer = self.device.create_buffer(&vello::wgpu::BufferDescriptor {
            label: Some("capture readback buffer"),
            size: buffer_size,
            usage: vello::wgpu::BufferUsages::COPY_DST | vello::wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&vello::wgpu::CommandEncoderDescriptor {
                label: Some("capture copy encoder"),
            });
        encoder.copy_texture_to_buffer(
            vello::wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: vello::wgpu::Origin3d::ZERO,
                aspect: vello::wgpu::TextureAspect::All,
            },
            vello::wgpu::TexelCopyBufferInfo {
                buffer: &readback_buffer,
                layout: vello::wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            vello::wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = readback_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(vello::wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        let _ = self.device.poll(vello::wgpu::PollType::wait_indefinitely());

        rx.recv()
            .map_err(|e| CaptureError::Gpu(e.to_string()))?
            .map_err(|e| CaptureError::Gpu(e.to_string()))?;

        let data = buffer_slice.get_mapped_range();
        let mut rgba_data = Vec::with_capacity((width * height * 4) as usize);
        for row in 0..height {
            let row_start = (row * bytes_per_row) as usize;
            rgba_data.extend_from_slice(&data[row_start..row_start + (width * 4) as usize]);
        }
        drop(data);
        readback_buffer.unmap();

        Ok(gridspan_render::CaptureImage {
            rgba_data,
            width,
            height,
        })
    }
}

/// Hand the encoded PNG to the platform's save mechanism.
#[cfg(not(target_arch = "wasm32"))]
fn save_png(png: &[u8], ui_state: &mut UiState) {
    let dialog = rfd::FileDialog::new()
        .set_title("Save capture")
        .set_file_name("gridspan-capture.png")
        .add_filter("PNG image", &["png"]);

    if let Some(path) = dialog.save_file() {
        match std::fs::write(&path, png) {
            Ok(()) => log::info!("Saved capture to {path:?}"),
            Err(e) => {
                log::error!("Failed to write capture: {e}");
                ui_state.alert = Some(format!("Could not save capture: {e}"));
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn save_png(png: &[u8], ui_state: &mut UiState) {
    if let Err(e) = crate::web::download_png(png, "gridspan-capture.png") {
        log::error!("Failed to trigger download: {e}");
        ui_state.alert = Some("Could not download capture".to_string());
    }
}
